// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Observable: change-notification plumbing for data models.
//!
//! This crate holds the pieces every model layer builds on:
//!
//! - [`Event`] and [`Subscription`]: events that hold their handlers weakly,
//!   with RAII handles that own the handler and detach on drop.
//! - [`Value`]: the tagged value stored in property bags, with
//!   [`PropertyValue`] converting between Rust types and tagged values and
//!   [`ObjectRef`] carrying shared objects.
//! - [`ObservableObject`] and [`ObservableCollection`]: the two notification
//!   capabilities a stored object can have.
//! - [`ChangeNotificationWrapper`]: watches one object (and, for collections,
//!   every item, recursively) and re-raises its changes without keeping any of
//!   it alive.
//! - [`Suspension`] and [`SuspensionToken`]: the reference-counted batching
//!   scope shared by notification, callback and validation suspension.
//! - [`ValueCache`]: the process-wide string intern cache.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use understory_observable::{
//!     ChangeNotificationWrapper, ObjectRef, ObservableCollection, ObservableObject,
//! };
//!
//! let item = Arc::new(ObservableObject::new());
//! let list = ObservableCollection::<ObjectRef>::new();
//! let wrapper = ChangeNotificationWrapper::new(&list.to_object_ref());
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = wrapper
//!     .collection_item_property_changed()
//!     .subscribe(move |args| sink.lock().unwrap().push(args.change.name().to_owned()))
//!     .unwrap();
//!
//! list.push(ObjectRef::new(item.clone()));
//! item.raise_property_changed_named("Title");
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["Title".to_owned()]);
//! ```

pub mod intern;

mod args;
mod collection;
mod event;
mod object;
mod suspension;
mod value;
mod wrapper;

pub use args::{
    ChangeOrigin, CollectionChangeAction, CollectionChangedArgs, ItemPropertyChangedArgs,
    PropertyChangedArgs,
};
pub use collection::ObservableCollection;
pub use event::{Event, SubscribeError, Subscription};
pub use intern::ValueCache;
pub use object::ObservableObject;
pub use suspension::{Suspension, SuspensionContext, SuspensionToken};
pub use value::{AsAny, ObjectRef, ObjectValue, PropertyValue, Value, ValueKind, WeakObjectRef};
pub use wrapper::ChangeNotificationWrapper;
