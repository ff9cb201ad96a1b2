// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Model: observable, validatable, editable data models.
//!
//! A model type declares its properties once through [`ModelType`]; each
//! instance is a shared [`Model`] handle holding the values in a property bag.
//! On top of plain get/set the handle provides:
//!
//! - Change notification through [`Model::property_changed`], with nested
//!   suspension scopes ([`Model::suspend_change_notifications`]).
//! - Dirty, read-only and frozen state ([`DirtyTracking`], [`ReadOnly`],
//!   [`Freezable`]). Any user property change marks the model dirty.
//! - Validation of declared rules and type hooks, cached until a property
//!   changes ([`Validatable`], [`DataErrorInfo`]).
//! - Edit sessions with rollback ([`Editable`]).
//! - Equality and hashing through a pluggable [`ModelEqualityComparer`].
//! - Serialization of the stored values ([`Model::save`], [`Model::load`]).
//! - Child awareness: values that raise change notifications, including
//!   collections and nested models, are watched and their changes bubble up.
//!
//! Collaborators such as a validator provider, a serializer or an equality
//! comparer are looked up in a [`ServiceResolver`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::LazyLock;
//!
//! use understory_model::prelude::*;
//! use understory_validation::PropertyRule;
//!
//! static TITLE: LazyLock<Property<String>> = LazyLock::new(|| {
//!     PropertyDataBuilder::new("Title", String::new())
//!         .rule(PropertyRule::required())
//!         .build()
//! });
//!
//! struct Book;
//!
//! impl ModelType for Book {
//!     fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
//!         reg.register(&TITLE)?;
//!         Ok(())
//!     }
//! }
//!
//! let book = Model::new(Book).unwrap();
//! assert!(book.has_errors());
//!
//! book.begin_edit();
//! book.set(&TITLE, "Dune".to_owned()).unwrap();
//! assert!(!book.has_errors());
//! book.cancel_edit();
//!
//! assert_eq!(book.get(&TITLE).unwrap(), "");
//! assert!(book.has_errors());
//! ```

mod capabilities;
mod child;
mod editable;
mod equality;
mod error;
mod flags;
mod model;
mod resolver;
mod serialization;
mod settings;
mod suspension;
mod validation;

pub use capabilities::{DirtyTracking, Freezable, ReadOnly};
pub use editable::{EditEventArgs, Editable};
pub use equality::{DefaultModelEqualityComparer, EquatableModel, ModelEqualityComparer};
pub use error::ModelError;
pub use model::{Model, ModelBuilder, ModelType, SetOutcome};
pub use resolver::ServiceResolver;
pub use serialization::{JsonSerializer, SerializationError, Serializer};
pub use settings::ModelSettings;
pub use validation::{DataErrorInfo, DataErrorsChangedArgs, Validatable};

/// The traits and types most model code needs.
pub mod prelude {
    pub use crate::{
        DataErrorInfo, DirtyTracking, Editable, Freezable, Model, ModelType, ReadOnly,
        SetOutcome, Validatable,
    };
    pub use understory_observable::{PropertyChangedArgs, Value};
    pub use understory_property::{
        Property, PropertyDataBuilder, PropertyError, TypeRegistration,
    };
}
