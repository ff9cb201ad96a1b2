// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for the `understory_model` set path.

use std::sync::LazyLock;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use understory_model::prelude::*;
use understory_observable::ObservableCollection;

static COUNT: LazyLock<Property<i64>> = LazyLock::new(|| Property::register("Count", 0));
static LABEL: LazyLock<Property<String>> =
    LazyLock::new(|| Property::register("Label", String::new()));
static ITEMS: LazyLock<Property<Option<ObservableCollection<i64>>>> =
    LazyLock::new(|| Property::register("Items", None));

struct Counter;

impl ModelType for Counter {
    fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
        reg.register(&COUNT)?.register(&LABEL)?.register(&ITEMS)?;
        Ok(())
    }
}

fn bench_model(c: &mut Criterion) {
    let mut group = c.benchmark_group("model/set");

    group.bench_function("construct", |b| {
        b.iter(|| black_box(Model::new(Counter).unwrap()));
    });

    let model = Model::new(Counter).unwrap();
    group.bench_function("unchanged", |b| {
        b.iter(|| black_box(model.set(&COUNT, 0).unwrap()));
    });

    group.bench_function("changed/no_handlers", |b| {
        let mut next = 0_i64;
        b.iter(|| {
            next += 1;
            black_box(model.set(&COUNT, next).unwrap())
        });
    });

    group.bench_function("changed/one_handler", |b| {
        let _sub = model.property_changed().subscribe(|_| {}).unwrap();
        let mut next = 0_i64;
        b.iter(|| {
            next += 1;
            black_box(model.set(&COUNT, next).unwrap())
        });
    });

    group.bench_function("suspended_batch", |b| {
        b.iter_batched(
            || Model::new(Counter).unwrap(),
            |model| {
                let token = model.suspend_change_notifications(true);
                for i in 1..=16 {
                    model.set(&COUNT, i).unwrap();
                }
                token.release();
                black_box(model);
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("child_collection_push", |b| {
        let items = ObservableCollection::new();
        model.set(&ITEMS, Some(items.clone())).unwrap();
        b.iter(|| items.push(black_box(1)));
    });
    group.finish();

    let mut group = c.benchmark_group("model/edit");
    group.bench_function("begin_cancel", |b| {
        model.set(&LABEL, "label".to_owned()).unwrap();
        b.iter(|| {
            model.begin_edit();
            model.set(&LABEL, "changed".to_owned()).unwrap();
            model.cancel_edit();
        });
    });
    group.finish();
}

criterion_group!(benches, bench_model);
criterion_main!(benches);
