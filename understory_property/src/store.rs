// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-instance property storage.
//!
//! A bag maps property names to [`Value`]s behind a single lock. Writes
//! report whether the value actually changed, and the bag's own
//! [`changed`](PropertyBagStore::changed) event fires only on real changes,
//! after the lock is released.
//!
//! # Implementation
//!
//! [`PropertyBag`] keeps its entries in a `SmallVec` sorted by name and looks
//! them up with binary search. Models rarely hold more than a handful of
//! properties, so the inline storage avoids a heap allocation for most
//! instances and lookups stay cache friendly.
//!
//! Strings are interned through [`ValueCache::global`] so repeated writes of
//! the same text share one allocation and compare cheaply.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use smallvec::SmallVec;
use understory_observable::{Event, PropertyValue, Value, ValueCache, ValueKind};

use crate::error::PropertyError;

/// Inline capacity for bag entries.
const INLINE_CAPACITY: usize = 8;

/// A change reported by a bag's `changed` event.
#[derive(Clone, Debug, PartialEq)]
pub struct BagChange {
    /// Entry name.
    pub name: Arc<str>,
    /// Previous value, `None` if the entry was absent.
    pub old_value: Option<Value>,
    /// Value now stored.
    pub new_value: Value,
}

/// Outcome of [`PropertyBagStore::set_value`].
#[derive(Clone, Debug, PartialEq)]
pub struct BagWrite {
    /// Previous value, `None` if the entry was absent.
    pub old_value: Option<Value>,
    /// Whether the stored value differs from the previous one.
    pub changed: bool,
}

/// Storage contract for per-instance property values.
pub trait PropertyBagStore: Send + Sync {
    /// Whether an entry named `name` exists.
    fn is_available(&self, name: &str) -> bool;

    /// A copy of the stored value.
    fn get_value(&self, name: &str) -> Option<Value>;

    /// Stores `value` and reports whether it changed.
    ///
    /// # Errors
    ///
    /// Implementations that check value kinds return
    /// [`PropertyError::InvalidValueType`].
    fn set_value(&self, name: &str, value: Value) -> Result<BagWrite, PropertyError>;

    /// Stores `value` only if `name` is absent. Returns `true` if stored.
    ///
    /// # Errors
    ///
    /// As [`set_value`](Self::set_value).
    fn set_if_absent(&self, name: &str, value: Value) -> Result<bool, PropertyError> {
        if self.is_available(name) {
            return Ok(false);
        }
        self.set_value(name, value).map(|_| true)
    }

    /// Removes an entry and returns its value.
    fn remove(&self, name: &str) -> Option<Value>;

    /// Removes every entry.
    fn clear(&self);

    /// A snapshot of every entry, sorted by name.
    fn get_all_properties(&self) -> Vec<(Arc<str>, Value)>;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the bag holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raised after a write that changed a value.
    fn changed(&self) -> &Event<BagChange>;
}

/// Typed access on top of [`PropertyBagStore`].
pub trait PropertyBagExt: PropertyBagStore {
    /// Reads `name` as `T`. `None` if absent or of another type.
    fn get<T: PropertyValue>(&self, name: &str) -> Option<T> {
        self.get_value(name).and_then(|v| T::from_value(&v))
    }

    /// Reads `name` as `T`, falling back to `default`.
    fn get_or<T: PropertyValue>(&self, name: &str, default: T) -> T {
        self.get(name).unwrap_or(default)
    }

    /// Stores a typed value.
    ///
    /// # Errors
    ///
    /// As [`PropertyBagStore::set_value`].
    fn set<T: PropertyValue>(&self, name: &str, value: T) -> Result<BagWrite, PropertyError> {
        self.set_value(name, value.into_value())
    }
}

impl<B: PropertyBagStore + ?Sized> PropertyBagExt for B {}

type Entries = SmallVec<[(Arc<str>, Value); INLINE_CAPACITY]>;

/// Untyped property bag.
///
/// # Example
///
/// ```rust
/// use understory_property::{PropertyBag, PropertyBagExt, PropertyBagStore};
///
/// let bag = PropertyBag::new();
/// assert!(bag.set("Age", 5_i32).unwrap().changed);
/// assert!(!bag.set("Age", 5_i32).unwrap().changed);
/// assert_eq!(bag.get::<i32>("Age"), Some(5));
/// assert_eq!(bag.get_or("Name", String::from("n/a")), "n/a");
/// ```
pub struct PropertyBag {
    entries: Mutex<Entries>,
    changed: Event<BagChange>,
}

impl PropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(SmallVec::new()),
            changed: Event::new("BagChanged"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn find(entries: &Entries, name: &str) -> Result<usize, usize> {
        entries.binary_search_by(|(key, _)| (**key).cmp(name))
    }

    /// Writes under the lock. `Err` carries the unchanged current value.
    fn write(
        &self,
        name: &str,
        value: Value,
        only_if_absent: bool,
    ) -> Result<BagChange, Option<Value>> {
        let value = ValueCache::global().intern(value);
        let mut entries = self.lock();
        match Self::find(&entries, name) {
            Ok(idx) if only_if_absent => Err(Some(entries[idx].1.clone())),
            Ok(idx) => {
                let slot = &mut entries[idx];
                if slot.1.same_as(&value) {
                    return Err(Some(slot.1.clone()));
                }
                let old = std::mem::replace(&mut slot.1, value.clone());
                Ok(BagChange {
                    name: slot.0.clone(),
                    old_value: Some(old),
                    new_value: value,
                })
            }
            Err(idx) => {
                let key = ValueCache::global().intern_str(name);
                entries.insert(idx, (key.clone(), value.clone()));
                Ok(BagChange {
                    name: key,
                    old_value: None,
                    new_value: value,
                })
            }
        }
    }

    fn publish(&self, change: &BagChange) {
        if self.changed.has_handlers() {
            self.changed.raise(change);
        }
    }
}

impl Default for PropertyBag {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyBagStore for PropertyBag {
    fn is_available(&self, name: &str) -> bool {
        Self::find(&self.lock(), name).is_ok()
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        let entries = self.lock();
        Self::find(&entries, name)
            .ok()
            .map(|idx| entries[idx].1.clone())
    }

    fn set_value(&self, name: &str, value: Value) -> Result<BagWrite, PropertyError> {
        match self.write(name, value, false) {
            Ok(change) => {
                let write = BagWrite {
                    old_value: change.old_value.clone(),
                    changed: true,
                };
                self.publish(&change);
                Ok(write)
            }
            Err(current) => Ok(BagWrite {
                old_value: current,
                changed: false,
            }),
        }
    }

    fn set_if_absent(&self, name: &str, value: Value) -> Result<bool, PropertyError> {
        match self.write(name, value, true) {
            Ok(change) => {
                self.publish(&change);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn remove(&self, name: &str) -> Option<Value> {
        let mut entries = self.lock();
        let idx = Self::find(&entries, name).ok()?;
        Some(entries.remove(idx).1)
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn get_all_properties(&self) -> Vec<(Arc<str>, Value)> {
        self.lock().iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn changed(&self) -> &Event<BagChange> {
        &self.changed
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.lock().iter().map(|(k, v)| (k.clone(), v.clone())))
            .finish()
    }
}

/// A bag that pins each entry to the kind of its first non-null value.
///
/// Later writes of another kind fail with
/// [`PropertyError::InvalidValueType`]. `Null` is accepted for any entry.
#[derive(Default)]
pub struct TypedPropertyBag {
    bag: PropertyBag,
    kinds: Mutex<HashMap<Arc<str>, ValueKind>>,
}

impl TypedPropertyBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The kind recorded for `name`.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
    }

    fn check(&self, name: &str, value: &Value) -> Result<(), PropertyError> {
        if value.is_null() {
            return Ok(());
        }
        let actual = value.kind();
        let mut kinds = self.kinds.lock().unwrap_or_else(PoisonError::into_inner);
        match kinds.get(name) {
            Some(&expected) if expected != actual => Err(PropertyError::InvalidValueType {
                property: name.to_owned(),
                expected,
                actual,
            }),
            Some(_) => Ok(()),
            None => {
                kinds.insert(ValueCache::global().intern_str(name), actual);
                Ok(())
            }
        }
    }
}

impl PropertyBagStore for TypedPropertyBag {
    fn is_available(&self, name: &str) -> bool {
        self.bag.is_available(name)
    }

    fn get_value(&self, name: &str) -> Option<Value> {
        self.bag.get_value(name)
    }

    fn set_value(&self, name: &str, value: Value) -> Result<BagWrite, PropertyError> {
        self.check(name, &value)?;
        self.bag.set_value(name, value)
    }

    fn set_if_absent(&self, name: &str, value: Value) -> Result<bool, PropertyError> {
        if self.bag.is_available(name) {
            return Ok(false);
        }
        self.check(name, &value)?;
        self.bag.set_if_absent(name, value)
    }

    fn remove(&self, name: &str) -> Option<Value> {
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.bag.remove(name)
    }

    fn clear(&self) {
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.bag.clear();
    }

    fn get_all_properties(&self) -> Vec<(Arc<str>, Value)> {
        self.bag.get_all_properties()
    }

    fn len(&self) -> usize {
        self.bag.len()
    }

    fn changed(&self) -> &Event<BagChange> {
        self.bag.changed()
    }
}

impl fmt::Debug for TypedPropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPropertyBag")
            .field("bag", &self.bag)
            .finish_non_exhaustive()
    }
}
