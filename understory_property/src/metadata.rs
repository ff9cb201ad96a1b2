// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property metadata definitions.
//!
//! This module provides [`PropertyData`], the erased descriptor of one
//! property, and [`PropertyDataBuilder`] for ergonomic construction.
//!
//! Metadata is created independently of any type. It is attached to a type
//! when the type declares it (see [`TypeRegistration`](crate::TypeRegistration))
//! or at runtime through [`TypeInfo::register_property`](crate::TypeInfo::register_property).

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bitflags::bitflags;
use understory_observable::{PropertyChangedArgs, PropertyValue, Value, ValueKind};
use understory_validation::PropertyRule;

use crate::id::Property;

bitflags! {
    /// Boolean properties of a [`PropertyData`].
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// The value type can be handed to a serializer.
        const SERIALIZABLE = 1 << 0;
        /// Included when the model is saved.
        const INCLUDE_IN_SERIALIZATION = 1 << 1;
        /// Included in edit-session backups.
        const INCLUDE_IN_BACKUP = 1 << 2;
        /// Declared by the model infrastructure itself.
        const FRAMEWORK = 1 << 3;
        /// `Null` is a valid value.
        const NULLABLE = 1 << 4;
        /// No backing storage; the value comes from a getter.
        const CALCULATED = 1 << 5;
    }
}

/// Callback invoked after a property of an instance changed.
///
/// The instance is passed type-erased; builders downcast it for the caller.
pub type PropertyChangedCallback = Arc<dyn Fn(&dyn Any, &PropertyChangedArgs) + Send + Sync>;

/// Getter of a calculated property.
pub type CalculatedGetter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

#[derive(Clone)]
enum DefaultValue {
    Fixed(Value),
    Factory(DefaultFactory),
}

/// How a property maps to XML.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum XmlMapping {
    /// Written as a child element with this name.
    Element(Arc<str>),
    /// Written as an attribute with this name.
    Attribute(Arc<str>),
}

impl XmlMapping {
    /// The mapped XML name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Element(name) | Self::Attribute(name) => name,
        }
    }
}

/// Metadata for one property.
///
/// Immutable once built. Shared between every type that declares it.
pub struct PropertyData {
    name: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
    kind: ValueKind,
    flags: PropertyFlags,
    default: DefaultValue,
    changed: Option<PropertyChangedCallback>,
    getter: Option<CalculatedGetter>,
    rules: Vec<PropertyRule>,
    xml: Option<XmlMapping>,
    accepts: fn(&Value) -> bool,
    revive: fn(&Value) -> Option<Value>,
}

impl PropertyData {
    /// Starts building metadata for a stored property.
    pub fn builder<T: PropertyValue>(
        name: impl Into<Arc<str>>,
        default_value: T,
    ) -> PropertyDataBuilder<T> {
        PropertyDataBuilder::new(name, default_value)
    }

    /// The property name.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property name as a shared string.
    #[must_use]
    #[inline]
    pub fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// [`TypeId`] of the declared Rust type.
    #[must_use]
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the declared Rust type.
    #[must_use]
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The storage kind.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// All flags.
    #[must_use]
    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    /// Whether `Null` is a valid value.
    #[must_use]
    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags.contains(PropertyFlags::NULLABLE)
    }

    /// Whether the value type can be serialized.
    #[must_use]
    #[inline]
    pub fn is_serializable(&self) -> bool {
        self.flags.contains(PropertyFlags::SERIALIZABLE)
    }

    /// Whether the property is written when the model is saved.
    #[must_use]
    #[inline]
    pub fn include_in_serialization(&self) -> bool {
        self.flags.contains(PropertyFlags::INCLUDE_IN_SERIALIZATION)
    }

    /// Whether the property is captured by edit-session backups.
    #[must_use]
    #[inline]
    pub fn include_in_backup(&self) -> bool {
        self.flags.contains(PropertyFlags::INCLUDE_IN_BACKUP)
    }

    /// Whether the property belongs to the model infrastructure.
    #[must_use]
    #[inline]
    pub fn is_framework_property(&self) -> bool {
        self.flags.contains(PropertyFlags::FRAMEWORK)
    }

    /// Whether the value comes from a getter instead of storage.
    #[must_use]
    #[inline]
    pub fn is_calculated_property(&self) -> bool {
        self.flags.contains(PropertyFlags::CALCULATED)
    }

    /// A fresh default value.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match &self.default {
            DefaultValue::Fixed(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }

    /// Whether a change callback is registered.
    #[must_use]
    pub fn has_change_callback(&self) -> bool {
        self.changed.is_some()
    }

    /// Invokes the change callback, if any, for `instance`.
    pub fn on_changed(&self, instance: &dyn Any, args: &PropertyChangedArgs) {
        if let Some(callback) = &self.changed {
            callback(instance, args);
        }
    }

    /// Computes the value of a calculated property for `instance`.
    ///
    /// Returns `None` for stored properties or if `instance` is not the type
    /// the getter was declared for.
    #[must_use]
    pub fn calculated_value(&self, instance: &dyn Any) -> Option<Value> {
        self.getter.as_ref().and_then(|getter| getter(instance))
    }

    /// Declarative validation rules.
    #[must_use]
    pub fn rules(&self) -> &[PropertyRule] {
        &self.rules
    }

    /// XML mapping, if declared.
    #[must_use]
    pub fn xml_mapping(&self) -> Option<&XmlMapping> {
        self.xml.as_ref()
    }

    /// Whether `value` can be assigned to this property.
    ///
    /// `Null` is accepted only by nullable properties.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            self.is_nullable()
        } else {
            (self.accepts)(value)
        }
    }

    /// Rebuilds a storable value from a deserialized one.
    #[must_use]
    pub fn revive(&self, value: &Value) -> Option<Value> {
        (self.revive)(value)
    }
}

impl fmt::Debug for PropertyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyData")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("has_change_callback", &self.changed.is_some())
            .field("rules", &self.rules.len())
            .field("xml", &self.xml)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PropertyData`].
///
/// Defaults: serializable, included in serialization and backup, no callback,
/// no rules.
///
/// # Example
///
/// ```rust
/// use understory_property::{PropertyData, PropertyDataBuilder};
/// use understory_validation::PropertyRule;
///
/// let name = PropertyDataBuilder::new("Name", String::new())
///     .include_in_backup(false)
///     .rule(PropertyRule::required())
///     .xml_attribute("name")
///     .build();
///
/// assert_eq!(name.name(), "Name");
/// assert!(!name.data().include_in_backup());
/// assert_eq!(name.data().rules().len(), 1);
/// ```
pub struct PropertyDataBuilder<T> {
    name: Arc<str>,
    flags: PropertyFlags,
    default: DefaultValue,
    changed: Option<PropertyChangedCallback>,
    getter: Option<CalculatedGetter>,
    rules: Vec<PropertyRule>,
    xml: Option<XmlMapping>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: PropertyValue> PropertyDataBuilder<T> {
    /// A stored property with a fixed default.
    pub fn new(name: impl Into<Arc<str>>, default_value: T) -> Self {
        Self::with_default(name, DefaultValue::Fixed(default_value.into_value()))
    }

    /// A stored property whose default is produced per instance.
    pub fn with_factory<F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_default(
            name,
            DefaultValue::Factory(Arc::new(move || factory().into_value())),
        )
    }

    /// A calculated property read through `getter` on instances of `O`.
    pub fn calculated<O, F>(name: impl Into<Arc<str>>, getter: F) -> Self
    where
        O: Any,
        F: Fn(&O) -> T + Send + Sync + 'static,
    {
        let mut builder = Self::with_default(name, DefaultValue::Fixed(Value::Null));
        builder.flags = PropertyFlags::CALCULATED;
        if T::is_nullable() {
            builder.flags |= PropertyFlags::NULLABLE;
        }
        builder.getter = Some(Arc::new(move |instance: &dyn Any| {
            instance
                .downcast_ref::<O>()
                .map(|o| getter(o).into_value())
        }));
        builder
    }

    fn with_default(name: impl Into<Arc<str>>, default: DefaultValue) -> Self {
        let mut flags = PropertyFlags::SERIALIZABLE
            | PropertyFlags::INCLUDE_IN_SERIALIZATION
            | PropertyFlags::INCLUDE_IN_BACKUP;
        if T::is_nullable() {
            flags |= PropertyFlags::NULLABLE;
        }
        Self {
            name: name.into(),
            flags,
            default,
            changed: None,
            getter: None,
            rules: Vec::new(),
            xml: None,
            _marker: PhantomData,
        }
    }

    /// Invokes `callback` on instances of `O` after the property changes.
    #[must_use]
    pub fn on_changed<O, F>(mut self, callback: F) -> Self
    where
        O: Any,
        F: Fn(&O, &PropertyChangedArgs) + Send + Sync + 'static,
    {
        self.changed = Some(Arc::new(move |instance: &dyn Any, args| {
            if let Some(o) = instance.downcast_ref::<O>() {
                callback(o, args);
            }
        }));
        self
    }

    /// Sets whether the property is written when the model is saved.
    #[must_use]
    pub fn include_in_serialization(mut self, include: bool) -> Self {
        self.flags.set(PropertyFlags::INCLUDE_IN_SERIALIZATION, include);
        self
    }

    /// Sets whether the property is captured by edit-session backups.
    #[must_use]
    pub fn include_in_backup(mut self, include: bool) -> Self {
        self.flags.set(PropertyFlags::INCLUDE_IN_BACKUP, include);
        self
    }

    /// Sets whether the value type can be serialized at all.
    #[must_use]
    pub fn serializable(mut self, serializable: bool) -> Self {
        self.flags.set(PropertyFlags::SERIALIZABLE, serializable);
        self
    }

    /// Marks the property as part of the model infrastructure.
    #[must_use]
    pub(crate) fn framework(mut self) -> Self {
        self.flags |= PropertyFlags::FRAMEWORK;
        self
    }

    /// Adds a declarative validation rule.
    #[must_use]
    pub fn rule(mut self, rule: PropertyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Maps the property to an XML element.
    #[must_use]
    pub fn xml_element(mut self, name: impl Into<Arc<str>>) -> Self {
        self.xml = Some(XmlMapping::Element(name.into()));
        self
    }

    /// Maps the property to an XML attribute.
    #[must_use]
    pub fn xml_attribute(mut self, name: impl Into<Arc<str>>) -> Self {
        self.xml = Some(XmlMapping::Attribute(name.into()));
        self
    }

    /// Builds the metadata.
    #[must_use]
    pub fn build(self) -> Property<T> {
        Property::from_data(Arc::new(PropertyData {
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            kind: T::kind(),
            flags: self.flags,
            default: self.default,
            changed: self.changed,
            getter: self.getter,
            rules: self.rules,
            xml: self.xml,
            accepts: T::accepts,
            revive: T::revive,
        }))
    }
}

impl<T> fmt::Debug for PropertyDataBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDataBuilder")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl<T: PropertyValue> Property<T> {
    /// Shortcut for a stored property with default flags.
    #[must_use]
    pub fn register(name: impl Into<Arc<str>>, default_value: T) -> Self {
        PropertyDataBuilder::new(name, default_value).build()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Owner {
        log: Mutex<Vec<String>>,
        base: i32,
    }

    #[test]
    fn defaults_and_flags() {
        let p = Property::register("Count", 3_u32);
        let data = p.data();
        assert_eq!(data.default_value(), Value::UInt(3));
        assert!(data.include_in_serialization());
        assert!(data.include_in_backup());
        assert!(data.is_serializable());
        assert!(!data.is_nullable());
        assert!(!data.is_framework_property());
        assert_eq!(data.kind(), ValueKind::UInt);
    }

    #[test]
    fn option_is_nullable() {
        let p = Property::<Option<String>>::register("Nick", None);
        assert!(p.data().is_nullable());
        assert!(p.data().accepts(&Value::Null));
        assert!(p.data().accepts(&Value::from("x")));
        assert!(!p.data().accepts(&Value::Int(1)));
    }

    #[test]
    fn non_nullable_rejects_null() {
        let p = Property::register("Age", 0_i32);
        assert!(!p.data().accepts(&Value::Null));
    }

    #[test]
    fn factory_runs_per_call() {
        let p = PropertyDataBuilder::with_factory("Tags", || vec!["a".to_owned()]).build();
        assert_eq!(
            p.data().default_value(),
            Value::List(vec![Value::from("a")])
        );
    }

    #[test]
    fn callback_downcasts_instance() {
        let p = PropertyDataBuilder::new("Age", 0_i32)
            .on_changed(|owner: &Owner, args| {
                owner.log.lock().unwrap().push(args.name().to_owned());
            })
            .build();
        let owner = Owner {
            log: Mutex::new(Vec::new()),
            base: 0,
        };
        p.data()
            .on_changed(&owner, &PropertyChangedArgs::new("Age"));
        // A different instance type is ignored.
        p.data().on_changed(&5_u8, &PropertyChangedArgs::new("Age"));
        assert_eq!(*owner.log.lock().unwrap(), vec!["Age".to_owned()]);
    }

    #[test]
    fn calculated_reads_through_getter() {
        let p = PropertyDataBuilder::calculated("Double", |o: &Owner| o.base * 2).build();
        let owner = Owner {
            log: Mutex::new(Vec::new()),
            base: 21,
        };
        assert!(p.data().is_calculated_property());
        assert!(!p.data().include_in_backup());
        assert_eq!(p.data().calculated_value(&owner), Some(Value::Int(42)));
    }

    #[test]
    fn xml_mapping_is_recorded() {
        let p = PropertyDataBuilder::new("Title", String::new())
            .xml_element("title")
            .build();
        assert_eq!(
            p.data().xml_mapping(),
            Some(&XmlMapping::Element("title".into()))
        );
    }
}
