// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for `understory_property` bags and registry lookups.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use understory_observable::Value;
use understory_property::{
    Property, PropertyBag, PropertyBagExt, PropertyBagStore, PropertyDataManager, TypeKey,
};

struct Widget;

fn bench_property(c: &mut Criterion) {
    let names: Vec<String> = (0..32).map(|i| format!("P{i}")).collect();
    let properties: Vec<Property<i64>> = names
        .iter()
        .map(|name| Property::register(name.as_str(), 0_i64))
        .collect();

    let manager = PropertyDataManager::new();
    let info = manager
        .register_properties(TypeKey::of::<Widget>(), |reg| {
            for property in &properties {
                reg.register(property)?;
            }
            Ok(())
        })
        .unwrap();

    let mut group = c.benchmark_group("property/registry");
    group.bench_function("get_property_data", |b| {
        b.iter(|| black_box(info.get_property_data(black_box("P17")).is_ok()));
    });
    group.bench_function("get_properties", |b| {
        b.iter(|| black_box(info.get_properties().len()));
    });
    group.finish();

    let filled = PropertyBag::new();
    for data in info.get_properties() {
        filled.set_if_absent(data.name(), data.default_value()).unwrap();
    }

    let mut group = c.benchmark_group("property/bag");
    group.bench_function("get_value", |b| {
        b.iter(|| black_box(filled.get_value(black_box("P17"))));
    });
    group.bench_function("get_typed", |b| {
        b.iter(|| black_box(filled.get::<i64>(black_box("P17"))));
    });
    group.bench_function("set_unchanged", |b| {
        b.iter(|| black_box(filled.set_value("P3", Value::Int(0)).unwrap().changed));
    });
    group.bench_function("set_changed", |b| {
        let mut next = 0_i64;
        b.iter(|| {
            next += 1;
            black_box(filled.set_value("P3", Value::Int(next)).unwrap().changed)
        });
    });
    group.bench_function("fill_defaults", |b| {
        b.iter_batched(
            PropertyBag::new,
            |bag| {
                for data in info.get_properties() {
                    bag.set_if_absent(data.name(), data.default_value()).unwrap();
                }
                black_box(bag);
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_property);
criterion_main!(benches);
