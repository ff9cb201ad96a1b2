// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform, leak-free change subscription for a watched value.
//!
//! A [`ChangeNotificationWrapper`] watches one object. If the object raises
//! property changes they are re-raised on [`ChangeNotificationWrapper::property_changed`].
//! If it is a collection, the wrapper also tracks the collection's items:
//!
//! - added items are subscribed, removed items are unsubscribed;
//! - an item that is itself a collection is tracked recursively;
//! - a [`Reset`](crate::CollectionChangeAction::Reset) resynchronizes the
//!   tracked items against the collection's current contents;
//! - a property change raised by any tracked item is re-raised on the separate
//!   [`ChangeNotificationWrapper::collection_item_property_changed`] event.
//!
//! The wrapper holds the watched object and every tracked item weakly, and its
//! handlers only capture weak references back to the wrapper. Nothing in the
//! subscription graph extends the lifetime of a model or item.
//!
//! Events that refuse subscriptions are logged and skipped; the wrapper keeps
//! working for the capabilities it could subscribe to.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::args::{
    CollectionChangeAction, CollectionChangedArgs, ItemPropertyChangedArgs, PropertyChangedArgs,
};
use crate::event::{Event, SubscribeError, Subscription, lock};
use crate::value::{ObjectRef, Value, WeakObjectRef};

/// Watches one object (and, for collections, its items) for changes.
pub struct ChangeNotificationWrapper {
    shared: Arc<Shared>,
}

struct Shared {
    target: WeakObjectRef,
    state: Mutex<State>,
    property_changed: Event<PropertyChangedArgs>,
    collection_changed: Event<CollectionChangedArgs>,
    collection_item_property_changed: Event<ItemPropertyChangedArgs>,
}

#[derive(Default)]
struct State {
    subscriptions: SmallVec<[Subscription; 2]>,
    collections: HashMap<usize, TrackedCollection>,
    disposed: bool,
}

struct TrackedCollection {
    collection: WeakObjectRef,
    subscription: Option<Subscription>,
    items: Vec<TrackedItem>,
}

struct TrackedItem {
    item: WeakObjectRef,
    subscription: Option<Subscription>,
}

type Garbage = Vec<Subscription>;

impl ChangeNotificationWrapper {
    /// Returns `true` if `value` raises property or collection changes.
    #[must_use]
    pub fn is_useful_for_object(value: &Value) -> bool {
        value.as_object().is_some_and(ObjectRef::is_observable)
    }

    /// Starts watching `target`.
    #[must_use]
    pub fn new(target: &ObjectRef) -> Self {
        let shared = Arc::new(Shared {
            target: target.downgrade(),
            state: Mutex::new(State::default()),
            property_changed: Event::new("PropertyChanged"),
            collection_changed: Event::new("CollectionChanged"),
            collection_item_property_changed: Event::new("CollectionItemPropertyChanged"),
        });
        let weak = Arc::downgrade(&shared);

        {
            let mut state = lock(&shared.state);
            if let Some(event) = target.get().property_changed() {
                let w = weak.clone();
                let subscribed = event.subscribe(move |args| {
                    if let Some(shared) = w.upgrade() {
                        shared.property_changed.raise(args);
                    }
                });
                match subscribed {
                    Ok(subscription) => state.subscriptions.push(subscription),
                    Err(err) => warn_hidden(target, &err),
                }
            }
            if target.is_collection() {
                track_collection(&weak, &mut state, target);
            }
        }

        tracing::trace!(target_type = target.get().type_name(), "watching object");
        Self { shared }
    }

    /// The watched object, if it is still alive.
    #[must_use]
    pub fn target(&self) -> Option<ObjectRef> {
        self.shared.target.upgrade()
    }

    /// Raised when the watched object raises a property change.
    #[must_use]
    pub fn property_changed(&self) -> &Event<PropertyChangedArgs> {
        &self.shared.property_changed
    }

    /// Raised when the watched collection, or a nested one, changes.
    #[must_use]
    pub fn collection_changed(&self) -> &Event<CollectionChangedArgs> {
        &self.shared.collection_changed
    }

    /// Raised when an item inside a tracked collection raises a property change.
    #[must_use]
    pub fn collection_item_property_changed(&self) -> &Event<ItemPropertyChangedArgs> {
        &self.shared.collection_item_property_changed
    }

    /// Returns the live items tracked for `collection`.
    #[must_use]
    pub fn tracked_items(&self, collection: &ObjectRef) -> Vec<ObjectRef> {
        lock(&self.shared.state)
            .collections
            .get(&collection.id())
            .map(|tracked| {
                tracked
                    .items
                    .iter()
                    .filter_map(|i| i.item.upgrade())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of collections tracked, including nested ones.
    #[must_use]
    pub fn tracked_collection_count(&self) -> usize {
        lock(&self.shared.state).collections.len()
    }

    /// Returns `true` while at least one subscription is held.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        let state = lock(&self.shared.state);
        !state.disposed
            && (!state.subscriptions.is_empty()
                || state
                    .collections
                    .values()
                    .any(|c| c.subscription.is_some()))
    }

    /// Detaches every subscription held by this wrapper.
    pub fn unsubscribe_from_all_events(&self) {
        let garbage: Garbage = {
            let mut state = lock(&self.shared.state);
            state.disposed = true;
            let mut garbage: Garbage = state.subscriptions.drain(..).collect();
            for (_, tracked) in state.collections.drain() {
                garbage.extend(tracked.subscription);
                garbage.extend(tracked.items.into_iter().filter_map(|i| i.subscription));
            }
            garbage
        };
        tracing::trace!(released = garbage.len(), "wrapper unsubscribed");
        drop(garbage);
    }
}

impl Drop for ChangeNotificationWrapper {
    fn drop(&mut self) {
        self.unsubscribe_from_all_events();
    }
}

impl fmt::Debug for ChangeNotificationWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("ChangeNotificationWrapper")
            .field("target", &self.shared.target)
            .field("subscriptions", &state.subscriptions.len())
            .field("collections", &state.collections.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl Shared {
    fn on_collection_changed(self: &Arc<Self>, collection: &WeakObjectRef, args: &CollectionChangedArgs) {
        let Some(collection) = collection.upgrade() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let owner = collection.id();

        let garbage: Garbage = {
            let mut state = lock(&self.state);
            if state.disposed || !state.collections.contains_key(&owner) {
                return;
            }
            let mut garbage = Garbage::new();
            match args.action {
                CollectionChangeAction::Add => {
                    for (offset, item) in objects(&args.new_items).enumerate() {
                        let index = args.new_index.map(|i| i + offset);
                        track_item(&weak, &mut state, owner, index, item);
                    }
                }
                CollectionChangeAction::Remove => {
                    for item in objects(&args.old_items) {
                        untrack_item(&mut state, owner, item.id(), &mut garbage);
                    }
                }
                CollectionChangeAction::Replace => {
                    for item in objects(&args.old_items) {
                        untrack_item(&mut state, owner, item.id(), &mut garbage);
                    }
                    for (offset, item) in objects(&args.new_items).enumerate() {
                        let index = args.new_index.map(|i| i + offset);
                        track_item(&weak, &mut state, owner, index, item);
                    }
                }
                CollectionChangeAction::Move => {
                    if let (Some(item), Some(to)) = (objects(&args.new_items).next(), args.new_index)
                    {
                        move_tracked(&mut state, owner, item.id(), to);
                    }
                }
                CollectionChangeAction::Reset => {
                    resync(&weak, &mut state, &collection, &mut garbage);
                }
            }
            garbage
        };

        drop(garbage);
        self.collection_changed.raise(args);
    }
}

fn objects(values: &[Value]) -> impl Iterator<Item = &ObjectRef> {
    values.iter().filter_map(Value::as_object)
}

fn warn_hidden(object: &ObjectRef, err: &SubscribeError) {
    tracing::warn!(
        object_type = object.get().type_name(),
        error = %err,
        "change event is not accessible, notifications for it are disabled"
    );
}

fn track_collection(weak: &Weak<Shared>, state: &mut State, collection: &ObjectRef) {
    let id = collection.id();
    if state
        .collections
        .get(&id)
        .is_some_and(|existing| existing.collection.is_alive())
    {
        return;
    }

    let subscription = collection.get().collection_changed().and_then(|event| {
        let w = weak.clone();
        let source = collection.downgrade();
        event
            .subscribe(move |args| {
                if let Some(shared) = w.upgrade() {
                    shared.on_collection_changed(&source, args);
                }
            })
            .map_err(|err| warn_hidden(collection, &err))
            .ok()
    });

    state.collections.insert(
        id,
        TrackedCollection {
            collection: collection.downgrade(),
            subscription,
            items: Vec::new(),
        },
    );

    let items = collection.get().collection_items().unwrap_or_default();
    for item in objects(&items) {
        track_item(weak, state, id, None, item);
    }
}

fn item_entry(weak: &Weak<Shared>, item: &ObjectRef) -> TrackedItem {
    let subscription = item.get().property_changed().and_then(|event| {
        let w = weak.clone();
        let source = item.downgrade();
        event
            .subscribe(move |change| {
                let (Some(shared), Some(item)) = (w.upgrade(), source.upgrade()) else {
                    return;
                };
                shared
                    .collection_item_property_changed
                    .raise(&ItemPropertyChangedArgs {
                        item,
                        change: change.clone(),
                    });
            })
            .map_err(|err| warn_hidden(item, &err))
            .ok()
    });
    TrackedItem {
        item: item.downgrade(),
        subscription,
    }
}

fn track_item(
    weak: &Weak<Shared>,
    state: &mut State,
    owner: usize,
    index: Option<usize>,
    item: &ObjectRef,
) {
    let entry = item_entry(weak, item);
    if let Some(tracked) = state.collections.get_mut(&owner) {
        match index {
            Some(i) if i <= tracked.items.len() => tracked.items.insert(i, entry),
            _ => tracked.items.push(entry),
        }
    }
    if item.is_collection() {
        track_collection(weak, state, item);
    }
}

fn untrack_item(state: &mut State, owner: usize, id: usize, garbage: &mut Garbage) {
    let Some(tracked) = state.collections.get_mut(&owner) else {
        return;
    };
    let Some(pos) = tracked.items.iter().position(|i| i.item.id() == id) else {
        return;
    };
    let removed = tracked.items.remove(pos);
    garbage.extend(removed.subscription);
    if !is_referenced(state, id) {
        untrack_collection(state, id, garbage);
    }
}

fn untrack_collection(state: &mut State, id: usize, garbage: &mut Garbage) {
    let Some(tracked) = state.collections.remove(&id) else {
        return;
    };
    garbage.extend(tracked.subscription);
    for item in tracked.items {
        garbage.extend(item.subscription);
        let nested = item.item.id();
        if !is_referenced(state, nested) {
            untrack_collection(state, nested, garbage);
        }
    }
}

/// Whether `id` is still an item of some tracked collection.
fn is_referenced(state: &State, id: usize) -> bool {
    state
        .collections
        .values()
        .any(|c| c.items.iter().any(|i| i.item.id() == id && i.item.is_alive()))
}

fn move_tracked(state: &mut State, owner: usize, id: usize, to: usize) {
    if let Some(tracked) = state.collections.get_mut(&owner)
        && let Some(from) = tracked.items.iter().position(|i| i.item.id() == id)
    {
        let entry = tracked.items.remove(from);
        let to = to.min(tracked.items.len());
        tracked.items.insert(to, entry);
    }
}

fn resync(weak: &Weak<Shared>, state: &mut State, collection: &ObjectRef, garbage: &mut Garbage) {
    let owner = collection.id();
    let Some(tracked) = state.collections.get_mut(&owner) else {
        return;
    };
    let mut previous = std::mem::take(&mut tracked.items);

    let current = collection.get().collection_items().unwrap_or_default();
    let mut items = Vec::with_capacity(current.len());
    let mut added = Vec::new();
    for item in objects(&current) {
        let existing = previous
            .iter()
            .position(|p| p.item.id() == item.id() && p.item.is_alive());
        match existing {
            Some(pos) => items.push(previous.swap_remove(pos)),
            None => {
                items.push(item_entry(weak, item));
                added.push(item.clone());
            }
        }
    }

    let (kept, dropped) = (items.len() - added.len(), previous.len());
    if let Some(tracked) = state.collections.get_mut(&owner) {
        tracked.items = items;
    }
    for removed in previous {
        garbage.extend(removed.subscription);
        let id = removed.item.id();
        if !is_referenced(state, id) {
            untrack_collection(state, id, garbage);
        }
    }
    for item in &added {
        if item.is_collection() {
            track_collection(weak, state, item);
        }
    }
    tracing::debug!(kept, added = added.len(), dropped, "resynchronized collection items");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ObservableCollection;
    use crate::object::ObservableObject;
    use crate::value::ObjectValue;

    fn item() -> (Arc<ObservableObject>, ObjectRef) {
        let object = Arc::new(ObservableObject::new());
        let reference = ObjectRef::new(object.clone());
        (object, reference)
    }

    #[derive(Debug)]
    struct Hidden {
        changed: Event<PropertyChangedArgs>,
    }

    impl ObjectValue for Hidden {
        fn property_changed(&self) -> Option<&Event<PropertyChangedArgs>> {
            Some(&self.changed)
        }
    }

    #[test]
    fn plain_values_are_not_useful() {
        assert!(!ChangeNotificationWrapper::is_useful_for_object(&Value::Int(1)));
        let (_, object) = item();
        assert!(ChangeNotificationWrapper::is_useful_for_object(&Value::Object(object)));
    }

    #[test]
    fn forwards_object_property_changes() {
        let (object, reference) = item();
        let wrapper = ChangeNotificationWrapper::new(&reference);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = wrapper
            .property_changed()
            .subscribe(move |args| lock(&sink).push(args.name().to_owned()))
            .unwrap();

        object.raise_property_changed_named("Title");
        assert_eq!(*lock(&seen), vec!["Title".to_owned()]);
    }

    #[test]
    fn tracks_added_and_removed_items() {
        let list = ObservableCollection::<ObjectRef>::new();
        let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
        let (a, ra) = item();
        let (_b, rb) = item();

        list.push(ra.clone());
        list.push(rb.clone());
        assert_eq!(wrapper.tracked_items(&list.to_object_ref()).len(), 2);
        assert_eq!(a.property_changed().handler_count(), 1);

        list.remove_at(0);
        let tracked = wrapper.tracked_items(&list.to_object_ref());
        assert_eq!(tracked.len(), 1);
        assert!(tracked[0].ptr_eq(&rb));
        assert_eq!(a.property_changed().handler_count(), 0);
    }

    #[test]
    fn item_changes_use_the_item_event() {
        let (a, ra) = item();
        let list = ObservableCollection::from_vec(vec![ra.clone()]);
        let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());

        let items = Arc::new(Mutex::new(Vec::new()));
        let direct = Arc::new(Mutex::new(0_usize));
        let (si, sd) = (items.clone(), direct.clone());
        let _a = wrapper
            .collection_item_property_changed()
            .subscribe(move |args| lock(&si).push(args.item.id()))
            .unwrap();
        let _b = wrapper
            .property_changed()
            .subscribe(move |_| *lock(&sd) += 1)
            .unwrap();

        a.raise_property_changed_named("Name");
        assert_eq!(*lock(&items), vec![ra.id()]);
        assert_eq!(*lock(&direct), 0);
    }

    #[test]
    fn nested_collections_are_tracked() {
        let (leaf, rleaf) = item();
        let inner = ObservableCollection::from_vec(vec![rleaf]);
        let outer = ObservableCollection::from_vec(vec![inner.to_object_ref()]);
        let wrapper = ChangeNotificationWrapper::new(&outer.to_object_ref());
        assert_eq!(wrapper.tracked_collection_count(), 2);

        let hits = Arc::new(Mutex::new(0_usize));
        let h = hits.clone();
        let _sub = wrapper
            .collection_item_property_changed()
            .subscribe(move |_| *lock(&h) += 1)
            .unwrap();
        leaf.raise_property_changed_named("Deep");
        assert_eq!(*lock(&hits), 1);

        outer.clear();
        assert_eq!(wrapper.tracked_collection_count(), 1);
        assert_eq!(leaf.property_changed().handler_count(), 0);
    }

    #[test]
    fn hidden_event_degrades() {
        let hidden = Arc::new(Hidden {
            changed: Event::restricted("PropertyChanged"),
        });
        let wrapper = ChangeNotificationWrapper::new(&ObjectRef::new(hidden));
        assert!(!wrapper.is_tracking());
    }

    #[test]
    fn unsubscribe_releases_everything() {
        let (a, ra) = item();
        let list = ObservableCollection::from_vec(vec![ra]);
        let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
        assert!(wrapper.is_tracking());

        wrapper.unsubscribe_from_all_events();
        assert!(!wrapper.is_tracking());
        assert_eq!(a.property_changed().handler_count(), 0);
        assert!(!list.collection_changed().has_handlers());
    }

    #[test]
    fn wrapper_does_not_keep_target_alive() {
        let (object, reference) = item();
        let wrapper = ChangeNotificationWrapper::new(&reference);
        let weak = Arc::downgrade(&object);
        drop((object, reference));
        assert!(weak.upgrade().is_none());
        assert!(wrapper.target().is_none());
    }
}
