// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-type property registry.
//!
//! [`TypeInfo`] holds the properties of one model type: the metadata
//! properties declared through [`TypeRegistration`], properties added at
//! runtime, and "plain" properties that are only read through a getter.
//!
//! Declaration happens once per type. Runtime registration and removal are
//! type-wide: every instance of the type observes them.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hashbrown::{HashMap, HashSet};
use understory_observable::{PropertyValue, Value};
use understory_validation::PropertyRule;

use crate::error::PropertyError;
use crate::id::{Property, TypeKey};
use crate::intrinsic::{IS_DIRTY_PROPERTY, IS_READ_ONLY_PROPERTY, is_intrinsic};
use crate::metadata::{PropertyData, XmlMapping};

type PlainGetter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// A property exposed by a getter but not stored in the property bag.
///
/// Plain properties take part in annotation validation.
#[derive(Clone)]
pub struct PlainProperty {
    name: Arc<str>,
    getter: PlainGetter,
    rules: Vec<PropertyRule>,
}

impl PlainProperty {
    /// A plain property of `O` read through `getter`.
    pub fn new<O, T, F>(name: impl Into<Arc<str>>, getter: F) -> Self
    where
        O: Any,
        T: PropertyValue,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(move |instance: &dyn Any| {
                instance.downcast_ref::<O>().map(|o| getter(o).into_value())
            }),
            rules: Vec::new(),
        }
    }

    /// Adds a validation rule.
    #[must_use]
    pub fn rule(mut self, rule: PropertyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validation rules.
    #[must_use]
    pub fn rules(&self) -> &[PropertyRule] {
        &self.rules
    }

    /// Reads the value from `instance`.
    ///
    /// Returns `None` if `instance` is not the declaring type.
    #[must_use]
    pub fn value(&self, instance: &dyn Any) -> Option<Value> {
        (self.getter)(instance)
    }
}

impl fmt::Debug for PlainProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainProperty")
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

/// Collects the declarations of one type.
///
/// Handed to the declaration closure of [`TypeInfo::register_properties`].
#[derive(Debug)]
pub struct TypeRegistration {
    key: TypeKey,
    properties: Vec<Arc<PropertyData>>,
    plain: Vec<PlainProperty>,
}

impl TypeRegistration {
    fn new(key: TypeKey) -> Self {
        Self {
            key,
            properties: Vec::new(),
            plain: Vec::new(),
        }
    }

    /// The type being declared.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Declares a metadata property.
    ///
    /// # Errors
    ///
    /// [`PropertyError::InvalidDeclaration`] for an empty name or a name
    /// reserved for an intrinsic property, and
    /// [`PropertyError::AlreadyRegistered`] for a repeated name.
    pub fn register<T>(&mut self, property: &Property<T>) -> Result<&mut Self, PropertyError> {
        let data = property.data();
        check_name(self.key, data.name())?;
        if self.properties.iter().any(|p| p.name() == data.name()) {
            return Err(PropertyError::AlreadyRegistered {
                type_name: self.key.name(),
                property: data.name().to_owned(),
            });
        }
        self.properties.push(data.clone());
        Ok(self)
    }

    /// Declares a plain property.
    pub fn plain(&mut self, property: PlainProperty) -> &mut Self {
        self.plain.push(property);
        self
    }
}

fn check_name(key: TypeKey, name: &str) -> Result<(), PropertyError> {
    let reason = if name.is_empty() {
        "property name is empty"
    } else if is_intrinsic(name) {
        "name is reserved for an intrinsic property"
    } else {
        return Ok(());
    };
    Err(PropertyError::InvalidDeclaration {
        type_name: key.name(),
        property: name.to_owned(),
        reason,
    })
}

#[derive(Default)]
struct Inner {
    by_name: HashMap<Arc<str>, Arc<PropertyData>>,
    order: Vec<Arc<PropertyData>>,
    plain: Vec<PlainProperty>,
    xml_names: HashMap<Arc<str>, Arc<str>>,
}

impl Inner {
    fn insert(&mut self, data: Arc<PropertyData>) {
        if let Some(mapping) = data.xml_mapping() {
            self.xml_names
                .insert(Arc::from(mapping.name()), data.shared_name().clone());
        }
        self.by_name.insert(data.shared_name().clone(), data.clone());
        self.order.push(data);
    }

    fn remove(&mut self, name: &str) -> Option<Arc<PropertyData>> {
        let data = self.by_name.remove(name)?;
        self.order.retain(|p| !Arc::ptr_eq(p, &data));
        if let Some(mapping) = data.xml_mapping() {
            self.xml_names.remove(mapping.name());
        }
        Some(data)
    }
}

/// The properties of one model type.
///
/// # Example
///
/// ```rust
/// use understory_property::{Property, TypeInfo, TypeKey};
///
/// struct Person;
///
/// let age: Property<i32> = Property::register("Age", 0);
/// let info = TypeInfo::new(TypeKey::of::<Person>());
/// info.register_properties(|reg| {
///     reg.register(&age)?;
///     Ok(())
/// })
/// .unwrap();
///
/// assert!(info.is_property_registered("Age"));
/// assert!(info.is_property_registered("IsDirty"));
/// assert!(info.get_property_data("Height").is_err());
/// ```
pub struct TypeInfo {
    key: TypeKey,
    inner: RwLock<Inner>,
    registered: Mutex<bool>,
    excluded_from_annotations: Mutex<HashSet<String>>,
}

impl TypeInfo {
    /// Creates an empty descriptor holding only the stored intrinsic
    /// properties.
    #[must_use]
    pub fn new(key: TypeKey) -> Self {
        let mut inner = Inner::default();
        inner.insert(IS_DIRTY_PROPERTY.data().clone());
        inner.insert(IS_READ_ONLY_PROPERTY.data().clone());
        Self {
            key,
            inner: RwLock::new(inner),
            registered: Mutex::new(false),
            excluded_from_annotations: Mutex::new(HashSet::new()),
        }
    }

    /// The described type.
    #[must_use]
    #[inline]
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether [`register_properties`](Self::register_properties) completed.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        *self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the type's declarations once.
    ///
    /// Later calls return `Ok(())` without running `declare`. A failed
    /// declaration leaves the type unregistered.
    ///
    /// # Errors
    ///
    /// Whatever `declare` returns, and [`PropertyError::AlreadyRegistered`] if
    /// a declared name was already added at runtime.
    pub fn register_properties<F>(&self, declare: F) -> Result<(), PropertyError>
    where
        F: FnOnce(&mut TypeRegistration) -> Result<(), PropertyError>,
    {
        let mut registered = self
            .registered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *registered {
            return Ok(());
        }

        let mut registration = TypeRegistration::new(self.key);
        declare(&mut registration)?;

        let mut inner = self.write();
        if let Some(duplicate) = registration
            .properties
            .iter()
            .find(|p| inner.by_name.contains_key(p.name()))
        {
            return Err(PropertyError::AlreadyRegistered {
                type_name: self.key.name(),
                property: duplicate.name().to_owned(),
            });
        }
        let count = registration.properties.len();
        for data in registration.properties {
            inner.insert(data);
        }
        for plain in registration.plain {
            if inner.by_name.contains_key(plain.name()) {
                tracing::debug!(
                    type_name = self.key.name(),
                    property = plain.name(),
                    "plain property shadows a registered property, skipped"
                );
                continue;
            }
            inner.plain.push(plain);
        }
        drop(inner);

        *registered = true;
        tracing::debug!(
            type_name = self.key.name(),
            properties = count,
            "registered type properties"
        );
        Ok(())
    }

    /// Adds a property at runtime, for every instance of the type.
    ///
    /// # Errors
    ///
    /// [`PropertyError::AlreadyRegistered`] if the name is taken, or
    /// [`PropertyError::InvalidDeclaration`] for an invalid name.
    pub fn register_property<T>(&self, property: &Property<T>) -> Result<(), PropertyError> {
        let data = property.data();
        check_name(self.key, data.name())?;
        let mut inner = self.write();
        if inner.by_name.contains_key(data.name()) {
            return Err(PropertyError::AlreadyRegistered {
                type_name: self.key.name(),
                property: data.name().to_owned(),
            });
        }
        inner.insert(data.clone());
        Ok(())
    }

    /// Removes a property, for every instance of the type.
    ///
    /// Removing an unknown name does nothing.
    pub fn unregister_property(&self, name: &str) {
        if self.write().remove(name).is_some() {
            tracing::debug!(
                type_name = self.key.name(),
                property = name,
                "unregistered property"
            );
        }
    }

    /// Looks up a property.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotRegistered`] if the type has no such property.
    pub fn get_property_data(&self, name: &str) -> Result<Arc<PropertyData>, PropertyError> {
        self.read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| PropertyError::NotRegistered {
                type_name: self.key.name(),
                property: name.to_owned(),
            })
    }

    /// Whether the type has a property named `name`.
    #[must_use]
    pub fn is_property_registered(&self, name: &str) -> bool {
        self.read().by_name.contains_key(name)
    }

    /// Every metadata property, intrinsic ones first, then in declaration order.
    #[must_use]
    pub fn get_properties(&self) -> Vec<Arc<PropertyData>> {
        self.read().order.clone()
    }

    /// Every plain property.
    #[must_use]
    pub fn plain_properties(&self) -> Vec<PlainProperty> {
        self.read().plain.clone()
    }

    /// The XML name of a property: its mapped name, or the property name.
    #[must_use]
    pub fn get_xml_name(&self, property: &str) -> Option<Arc<str>> {
        let inner = self.read();
        let data = inner.by_name.get(property)?;
        Some(
            data.xml_mapping()
                .map_or_else(|| data.shared_name().clone(), |m| Arc::from(m.name())),
        )
    }

    /// The property mapped to an XML name.
    ///
    /// Names without an explicit mapping resolve to the property of the same
    /// name.
    #[must_use]
    pub fn get_property_name_from_xml_name(&self, xml_name: &str) -> Option<Arc<str>> {
        let inner = self.read();
        if let Some(name) = inner.xml_names.get(xml_name) {
            return Some(name.clone());
        }
        inner
            .by_name
            .get(xml_name)
            .filter(|data| data.xml_mapping().is_none())
            .map(|data| data.shared_name().clone())
    }

    /// Whether `xml_name` is mapped to an XML element.
    ///
    /// Unmapped properties are written as elements.
    #[must_use]
    pub fn is_xml_element(&self, xml_name: &str) -> bool {
        self.xml_mapping_of(xml_name)
            .is_some_and(|m| !matches!(m, Some(XmlMapping::Attribute(_))))
    }

    /// Whether `xml_name` is mapped to an XML attribute.
    #[must_use]
    pub fn is_xml_attribute(&self, xml_name: &str) -> bool {
        self.xml_mapping_of(xml_name)
            .is_some_and(|m| matches!(m, Some(XmlMapping::Attribute(_))))
    }

    fn xml_mapping_of(&self, xml_name: &str) -> Option<Option<XmlMapping>> {
        let name = self.get_property_name_from_xml_name(xml_name)?;
        let inner = self.read();
        inner.by_name.get(&*name).map(|d| d.xml_mapping().cloned())
    }

    /// Whether annotation validation gave up on `name`.
    #[must_use]
    pub fn is_excluded_from_annotations(&self, name: &str) -> bool {
        self.excluded_from_annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Stops annotation validation of `name` for every instance of the type.
    ///
    /// Returns `true` if the name was newly excluded.
    pub fn exclude_from_annotations(&self, name: &str) -> bool {
        let added = self
            .excluded_from_annotations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned());
        if added {
            tracing::warn!(
                type_name = self.key.name(),
                property = name,
                "property excluded from annotation validation"
            );
        }
        added
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("TypeInfo")
            .field("type", &self.key)
            .field("properties", &inner.order.len())
            .field("plain", &inner.plain.len())
            .finish_non_exhaustive()
    }
}
