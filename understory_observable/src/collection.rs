// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An observable, shared list.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::args::CollectionChangedArgs;
use crate::event::{Event, lock};
use crate::value::{ObjectRef, ObjectValue, PropertyValue, Value, ValueKind};

/// A shared list that raises collection-changed events.
///
/// Cloning the handle shares the list. Every mutation raises its event after
/// the internal lock is released.
pub struct ObservableCollection<T> {
    inner: Arc<CollectionInner<T>>,
}

struct CollectionInner<T> {
    items: Mutex<Vec<T>>,
    collection_changed: Event<CollectionChangedArgs>,
}

impl<T: PropertyValue> ObservableCollection<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a collection holding `items`.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                items: Mutex::new(items),
                collection_changed: Event::new("CollectionChanged"),
            }),
        }
    }

    /// The collection-changed event.
    #[must_use]
    pub fn collection_changed(&self) -> &Event<CollectionChangedArgs> {
        &self.inner.collection_changed
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner.items).len()
    }

    /// Returns `true` if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a clone of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        lock(&self.inner.items).get(index).cloned()
    }

    /// Returns a snapshot of the items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        lock(&self.inner.items).clone()
    }

    /// Appends `item`.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = lock(&self.inner.items);
            items.push(item.clone());
            items.len() - 1
        };
        self.raise(&CollectionChangedArgs::added(vec![item.into_value()], index));
    }

    /// Inserts `item` at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: T) {
        let index = {
            let mut items = lock(&self.inner.items);
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.raise(&CollectionChangedArgs::added(vec![item.into_value()], index));
    }

    /// Removes and returns the item at `index`.
    pub fn remove_at(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = lock(&self.inner.items);
            (index < items.len()).then(|| items.remove(index))
        }?;
        self.raise(&CollectionChangedArgs::removed(
            vec![removed.clone().into_value()],
            index,
        ));
        Some(removed)
    }

    /// Replaces the item at `index`, returning the old one.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let old = {
            let mut items = lock(&self.inner.items);
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item.clone())
        };
        self.raise(&CollectionChangedArgs::replaced(
            old.clone().into_value(),
            item.into_value(),
            index,
        ));
        Some(old)
    }

    /// Moves the item at `from` to `to`.
    ///
    /// Returns `false` if either index is out of range.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let moved = {
            let mut items = lock(&self.inner.items);
            if from >= items.len() || to >= items.len() {
                return false;
            }
            let item = items.remove(from);
            items.insert(to, item.clone());
            item
        };
        self.raise(&CollectionChangedArgs::moved(moved.into_value(), from, to));
        true
    }

    /// Removes every item and raises a reset.
    pub fn clear(&self) {
        lock(&self.inner.items).clear();
        self.raise(&CollectionChangedArgs::reset());
    }

    /// Replaces the whole content and raises a reset.
    pub fn reset_with(&self, items: Vec<T>) {
        *lock(&self.inner.items) = items;
        self.raise(&CollectionChangedArgs::reset());
    }

    /// Returns the collection as an object reference.
    #[must_use]
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.inner.clone())
    }

    /// Returns `true` if both handles share the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn raise(&self, args: &CollectionChangedArgs) {
        self.inner.collection_changed.raise(args);
    }
}

impl<T> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: PropertyValue> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PropertyValue> FromIterator<T> for ObservableCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<T> fmt::Debug for CollectionInner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("len", &lock(&self.items).len())
            .field("item_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: PropertyValue> ObjectValue for CollectionInner<T> {
    fn type_name(&self) -> &'static str {
        "ObservableCollection"
    }

    fn collection_changed(&self) -> Option<&Event<CollectionChangedArgs>> {
        Some(&self.collection_changed)
    }

    fn collection_items(&self) -> Option<Vec<Value>> {
        Some(
            lock(&self.items)
                .iter()
                .cloned()
                .map(T::into_value)
                .collect(),
        )
    }

    fn snapshot(&self) -> Option<Value> {
        let items: Vec<T> = lock(&self.items).clone();
        Some(Value::List(items.into_iter().map(T::into_value).collect()))
    }
}

impl<T: PropertyValue> PropertyValue for ObservableCollection<T> {
    fn kind() -> ValueKind {
        ValueKind::Object
    }

    fn into_value(self) -> Value {
        Value::Object(self.to_object_ref())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .downcast::<CollectionInner<T>>()
            .map(|inner| Self { inner })
    }

    fn revive(value: &Value) -> Option<Value> {
        match value {
            Value::List(items) => {
                let items = items
                    .iter()
                    .map(|item| T::revive(item).and_then(|v| T::from_value(&v)))
                    .collect::<Option<Vec<T>>>()?;
                Some(Self::from_vec(items).into_value())
            }
            other => Self::from_value(other).map(Self::into_value),
        }
    }
}
