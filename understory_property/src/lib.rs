// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Property: declared property metadata and per-instance storage.
//!
//! This crate is the storage layer under `understory_model`. It does not know
//! about dirty tracking, validation passes or editing; it only describes
//! properties and stores their values.
//!
//! ## Core Concepts
//!
//! ### Metadata
//!
//! A property is described once by a [`PropertyData`], built with
//! [`PropertyDataBuilder`] and handed out as a typed [`Property<T>`] handle.
//! The metadata carries the default value (or a factory), an optional change
//! callback, serialization and backup flags, validation rules and an XML
//! mapping.
//!
//! ### Registration
//!
//! Each model type owns a [`TypeInfo`]. Its declarations run once, through
//! [`TypeInfo::register_properties`]; the stored [`IntrinsicProperty`] flags
//! are present on every type. [`PropertyDataManager`] maps types to their
//! descriptors, process-wide through [`PropertyDataManager::global`].
//!
//! ### Storage
//!
//! [`PropertyBag`] holds the values of one instance. Writes report whether
//! the value changed, so callers can skip notifications for no-op sets.
//! [`TypedPropertyBag`] additionally pins each entry to one value kind.
//!
//! ## Quick Start
//!
//! ```rust
//! use understory_property::{
//!     Property, PropertyBag, PropertyBagExt, PropertyBagStore, PropertyDataManager, TypeKey,
//! };
//!
//! struct Person;
//!
//! let age: Property<i32> = Property::register("Age", 0);
//!
//! let manager = PropertyDataManager::new();
//! let info = manager
//!     .register_properties(TypeKey::of::<Person>(), |reg| {
//!         reg.register(&age)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let bag = PropertyBag::new();
//! for data in info.get_properties() {
//!     bag.set_if_absent(data.name(), data.default_value()).unwrap();
//! }
//!
//! assert_eq!(bag.get::<i32>("Age"), Some(0));
//! assert!(bag.set("Age", 5_i32).unwrap().changed);
//! assert!(!bag.set("Age", 5_i32).unwrap().changed);
//! ```

mod error;
mod id;
mod intrinsic;
mod manager;
mod metadata;
mod registry;
mod store;

pub use error::PropertyError;
pub use id::{Property, TypeKey};
pub use intrinsic::{IS_DIRTY_PROPERTY, IS_READ_ONLY_PROPERTY, IntrinsicProperty, is_intrinsic};
pub use manager::PropertyDataManager;
pub use metadata::{
    CalculatedGetter, PropertyChangedCallback, PropertyData, PropertyDataBuilder, PropertyFlags,
    XmlMapping,
};
pub use registry::{PlainProperty, TypeInfo, TypeRegistration};
pub use store::{
    BagChange, BagWrite, PropertyBag, PropertyBagExt, PropertyBagStore, TypedPropertyBag,
};
