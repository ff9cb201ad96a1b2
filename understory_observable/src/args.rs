// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event argument types.

use std::sync::Arc;

use crate::value::{ObjectRef, Value};

/// Where a property change originated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// The object's own property was written.
    #[default]
    Local,
    /// A child object raised a property change that was forwarded.
    Child,
    /// A child collection (or an item inside it) changed.
    Collection,
}

/// Arguments for a property-changed event.
///
/// A `None` name means "unspecified": every property of the sender should be
/// considered stale.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyChangedArgs {
    /// The changed property, or `None` for an unspecified change.
    pub property_name: Option<Arc<str>>,
    /// The value before the change, if known.
    pub old_value: Option<Value>,
    /// The value after the change, if known.
    pub new_value: Option<Value>,
    /// Where the change came from.
    pub origin: ChangeOrigin,
}

impl PropertyChangedArgs {
    /// A change of `name` with no value information.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            property_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A change of `name` from `old` to `new`.
    #[must_use]
    pub fn with_values(name: impl Into<Arc<str>>, old: Value, new: Value) -> Self {
        Self {
            property_name: Some(name.into()),
            old_value: Some(old),
            new_value: Some(new),
            origin: ChangeOrigin::Local,
        }
    }

    /// An unspecified change.
    #[must_use]
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Returns a copy tagged with `origin`.
    #[must_use]
    pub fn with_origin(mut self, origin: ChangeOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// The property name, or `""` for an unspecified change.
    #[must_use]
    pub fn name(&self) -> &str {
        self.property_name.as_deref().unwrap_or("")
    }

    /// Returns `true` if no specific property is named.
    #[must_use]
    pub fn is_unspecified(&self) -> bool {
        self.property_name.as_deref().is_none_or(str::is_empty)
    }
}

/// What happened to a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CollectionChangeAction {
    /// Items were inserted.
    Add,
    /// Items were removed.
    Remove,
    /// Items were replaced in place.
    Replace,
    /// An item moved.
    Move,
    /// The collection changed wholesale.
    Reset,
}

/// Arguments for a collection-changed event.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionChangedArgs {
    /// The kind of change.
    pub action: CollectionChangeAction,
    /// Items that entered the collection.
    pub new_items: Vec<Value>,
    /// Items that left the collection.
    pub old_items: Vec<Value>,
    /// Index of the first new item, if any.
    pub new_index: Option<usize>,
    /// Index of the first old item, if any.
    pub old_index: Option<usize>,
}

impl CollectionChangedArgs {
    /// A wholesale change with no item information.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            action: CollectionChangeAction::Reset,
            new_items: Vec::new(),
            old_items: Vec::new(),
            new_index: None,
            old_index: None,
        }
    }

    /// `items` were added at `index`.
    #[must_use]
    pub fn added(items: Vec<Value>, index: usize) -> Self {
        Self {
            action: CollectionChangeAction::Add,
            new_items: items,
            new_index: Some(index),
            ..Self::reset()
        }
    }

    /// `items` were removed from `index`.
    #[must_use]
    pub fn removed(items: Vec<Value>, index: usize) -> Self {
        Self {
            action: CollectionChangeAction::Remove,
            old_items: items,
            old_index: Some(index),
            ..Self::reset()
        }
    }

    /// `old` was replaced by `new` at `index`.
    #[must_use]
    pub fn replaced(old: Value, new: Value, index: usize) -> Self {
        Self {
            action: CollectionChangeAction::Replace,
            new_items: vec![new],
            old_items: vec![old],
            new_index: Some(index),
            old_index: Some(index),
        }
    }

    /// `item` moved from `from` to `to`.
    #[must_use]
    pub fn moved(item: Value, from: usize, to: usize) -> Self {
        Self {
            action: CollectionChangeAction::Move,
            new_items: vec![item.clone()],
            old_items: vec![item],
            new_index: Some(to),
            old_index: Some(from),
        }
    }
}

/// A property change raised by an item inside a watched collection.
#[derive(Clone, Debug)]
pub struct ItemPropertyChangedArgs {
    /// The item that changed.
    pub item: ObjectRef,
    /// The change the item reported.
    pub change: PropertyChangedArgs,
}
