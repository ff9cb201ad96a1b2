// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for `ChangeNotificationWrapper` collection tracking.
//!
//! These drive a wrapper through collection mutations and check that the
//! tracked item set always mirrors the collection without holding items alive.

use std::sync::{Arc, Weak};

use proptest::prelude::*;
use understory_observable::{
    ChangeNotificationWrapper, ObjectRef, ObservableCollection, ObservableObject,
};

fn items(n: usize) -> Vec<Arc<ObservableObject>> {
    (0..n).map(|_| Arc::new(ObservableObject::new())).collect()
}

fn refs(items: &[Arc<ObservableObject>]) -> Vec<ObjectRef> {
    items.iter().map(|i| ObjectRef::new(i.clone())).collect()
}

fn ids(objects: &[ObjectRef]) -> Vec<usize> {
    objects.iter().map(ObjectRef::id).collect()
}

#[test]
fn reset_resynchronizes_tracked_items() {
    let old = items(3);
    let list = ObservableCollection::from_vec(refs(&old));
    let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
    assert_eq!(wrapper.tracked_items(&list.to_object_ref()).len(), 3);

    let new = items(3);
    let new_refs = refs(&new);
    list.reset_with(new_refs.clone());

    let tracked = wrapper.tracked_items(&list.to_object_ref());
    assert_eq!(ids(&tracked), ids(&new_refs));
    for item in &old {
        assert!(!item.property_changed().has_handlers());
    }
    for item in &new {
        assert_eq!(item.property_changed().handler_count(), 1);
    }

    // Nothing in the wrapper keeps the removed items alive.
    let weak: Vec<Weak<ObservableObject>> = old.iter().map(Arc::downgrade).collect();
    drop(old);
    assert!(weak.iter().all(|w| w.upgrade().is_none()));
}

#[test]
fn reset_keeps_subscriptions_of_surviving_items() {
    let all = items(3);
    let list = ObservableCollection::from_vec(refs(&all));
    let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());

    list.reset_with(refs(&all[1..]));
    assert_eq!(wrapper.tracked_items(&list.to_object_ref()).len(), 2);
    assert!(!all[0].property_changed().has_handlers());
    assert_eq!(all[1].property_changed().handler_count(), 1);
    assert_eq!(all[2].property_changed().handler_count(), 1);
}

#[test]
fn dropping_wrapper_detaches_from_collection() {
    let list = ObservableCollection::from_vec(refs(&items(2)));
    let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
    assert!(list.collection_changed().has_handlers());
    drop(wrapper);
    assert!(!list.collection_changed().has_handlers());
}

#[derive(Clone, Debug)]
enum Op {
    Push,
    Insert(usize),
    Remove(usize),
    Replace(usize),
    Move(usize, usize),
    Reset(usize),
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Push),
        (0_usize..8).prop_map(Op::Insert),
        (0_usize..8).prop_map(Op::Remove),
        (0_usize..8).prop_map(Op::Replace),
        (0_usize..8, 0_usize..8).prop_map(|(a, b)| Op::Move(a, b)),
        (0_usize..5).prop_map(Op::Reset),
        Just(Op::Clear),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn tracked_items_mirror_the_collection(ops in prop::collection::vec(op(), 1..24)) {
        let list = ObservableCollection::<ObjectRef>::new();
        let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
        let mut keep = Vec::new();
        let mut fresh = || {
            let item = Arc::new(ObservableObject::new());
            keep.push(item.clone());
            ObjectRef::new(item)
        };

        for op in ops {
            match op {
                Op::Push => list.push(fresh()),
                Op::Insert(i) => list.insert(i, fresh()),
                Op::Remove(i) => {
                    let _ = list.remove_at(i);
                }
                Op::Replace(i) => {
                    let _ = list.set(i, fresh());
                }
                Op::Move(a, b) => {
                    let _ = list.move_item(a, b);
                }
                Op::Reset(n) => list.reset_with((0..n).map(|_| fresh()).collect()),
                Op::Clear => list.clear(),
            }
            let tracked = wrapper.tracked_items(&list.to_object_ref());
            prop_assert_eq!(ids(&tracked), ids(&list.to_vec()));
        }
    }
}
