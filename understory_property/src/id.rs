// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identification types.
//!
//! [`TypeKey`] identifies a model type in the global registry. [`Property<T>`]
//! is the typed handle to one property's metadata, with a phantom type
//! parameter tying typed get/set calls to the declared value type.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::metadata::PropertyData;

/// Stable identifier of a model type.
#[derive(Copy, Clone, Eq)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key of `T`.
    #[must_use]
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`].
    #[must_use]
    #[inline]
    pub fn id(self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics.
    #[must_use]
    #[inline]
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

/// A typed handle to registered property metadata.
///
/// The phantom type is the declared value type; the handle itself is a cheap
/// shared pointer to the erased [`PropertyData`].
///
/// # Example
///
/// ```rust
/// use understory_property::Property;
///
/// let age: Property<i32> = Property::register("Age", 0);
/// assert_eq!(age.name(), "Age");
/// assert!(!age.data().is_nullable());
/// ```
pub struct Property<T> {
    data: Arc<PropertyData>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Property<T> {
    pub(crate) fn from_data(data: Arc<PropertyData>) -> Self {
        Self {
            data,
            _marker: PhantomData,
        }
    }

    /// The property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        self.data.name()
    }

    /// The erased metadata.
    #[must_use]
    #[inline]
    pub fn data(&self) -> &Arc<PropertyData> {
        &self.data
    }
}

// Manual impls so `T` does not need to be `Clone`, `Debug` and so on.

impl<T> Clone for Property<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self::from_data(self.data.clone())
    }
}

impl<T> PartialEq for Property<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T> Eq for Property<T> {}

impl<T> Hash for Property<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.data).hash(state);
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.data.name())
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;

    #[test]
    fn type_key_compares_by_id() {
        assert_eq!(TypeKey::of::<Person>(), TypeKey::of::<Person>());
        assert_ne!(TypeKey::of::<Person>(), TypeKey::of::<u8>());
        assert!(TypeKey::of::<Person>().name().ends_with("Person"));
    }

    #[test]
    fn property_identity_is_the_metadata() {
        let a: Property<i32> = Property::register("Age", 0);
        let b: Property<i32> = Property::register("Age", 0);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn property_debug_names_type() {
        let a: Property<String> = Property::register("Name", String::new());
        let text = format!("{a:?}");
        assert!(text.contains("Name"));
        assert!(text.contains("String"));
    }
}
