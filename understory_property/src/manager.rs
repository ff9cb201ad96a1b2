// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Process-wide map from model type to [`TypeInfo`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use hashbrown::HashMap;

use crate::error::PropertyError;
use crate::id::{Property, TypeKey};
use crate::metadata::PropertyData;
use crate::registry::{TypeInfo, TypeRegistration};

/// Owns one [`TypeInfo`] per model type.
///
/// Most code uses [`PropertyDataManager::global`]. Separate managers are
/// useful for isolated tests and for hosts that keep several model worlds.
///
/// The manager also carries the switch that disables property-changed events
/// for every model bound to it, meant for bulk operations.
pub struct PropertyDataManager {
    types: RwLock<HashMap<TypeKey, Arc<TypeInfo>>>,
    notifications_disabled: AtomicBool,
}

static GLOBAL: LazyLock<PropertyDataManager> = LazyLock::new(PropertyDataManager::new);

impl PropertyDataManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            notifications_disabled: AtomicBool::new(false),
        }
    }

    /// The process-wide manager.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// The descriptor of `key`, created empty on first use.
    pub fn type_info(&self, key: TypeKey) -> Arc<TypeInfo> {
        if let Some(info) = self
            .types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return info.clone();
        }
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Arc::new(TypeInfo::new(key)))
            .clone()
    }

    /// The descriptor of `key`, if one exists.
    #[must_use]
    pub fn get_type_info(&self, key: TypeKey) -> Option<Arc<TypeInfo>> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Runs the declarations of `key` once and returns its descriptor.
    ///
    /// # Errors
    ///
    /// See [`TypeInfo::register_properties`].
    pub fn register_properties<F>(
        &self,
        key: TypeKey,
        declare: F,
    ) -> Result<Arc<TypeInfo>, PropertyError>
    where
        F: FnOnce(&mut TypeRegistration) -> Result<(), PropertyError>,
    {
        let info = self.type_info(key);
        info.register_properties(declare)?;
        Ok(info)
    }

    /// Adds a property to `key` at runtime.
    ///
    /// # Errors
    ///
    /// See [`TypeInfo::register_property`].
    pub fn register_property<T>(
        &self,
        key: TypeKey,
        property: &Property<T>,
    ) -> Result<(), PropertyError> {
        self.type_info(key).register_property(property)
    }

    /// Removes a property from `key`. Unknown names are ignored.
    pub fn unregister_property(&self, key: TypeKey, name: &str) {
        if let Some(info) = self.get_type_info(key) {
            info.unregister_property(name);
        }
    }

    /// Whether `key` has a property named `name`.
    #[must_use]
    pub fn is_property_registered(&self, key: TypeKey, name: &str) -> bool {
        self.get_type_info(key)
            .is_some_and(|info| info.is_property_registered(name))
    }

    /// Looks up a property of `key`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotRegistered`] if the type or the property is unknown.
    pub fn get_property_data(
        &self,
        key: TypeKey,
        name: &str,
    ) -> Result<Arc<PropertyData>, PropertyError> {
        match self.get_type_info(key) {
            Some(info) => info.get_property_data(name),
            None => Err(PropertyError::NotRegistered {
                type_name: key.name(),
                property: name.to_owned(),
            }),
        }
    }

    /// Every metadata property of `key`.
    #[must_use]
    pub fn get_properties(&self, key: TypeKey) -> Vec<Arc<PropertyData>> {
        self.get_type_info(key)
            .map(|info| info.get_properties())
            .unwrap_or_default()
    }

    /// The XML name of `property` on `key`.
    #[must_use]
    pub fn get_xml_element_name(&self, key: TypeKey, property: &str) -> Option<Arc<str>> {
        self.get_type_info(key)?.get_xml_name(property)
    }

    /// The property of `key` mapped to `xml_name`.
    #[must_use]
    pub fn get_property_name_from_xml_element(
        &self,
        key: TypeKey,
        xml_name: &str,
    ) -> Option<Arc<str>> {
        self.get_type_info(key)?
            .get_property_name_from_xml_name(xml_name)
    }

    /// Whether `xml_name` is an element of `key`.
    #[must_use]
    pub fn is_xml_element(&self, key: TypeKey, xml_name: &str) -> bool {
        self.get_type_info(key)
            .is_some_and(|info| info.is_xml_element(xml_name))
    }

    /// Whether `xml_name` is an attribute of `key`.
    #[must_use]
    pub fn is_xml_attribute(&self, key: TypeKey, xml_name: &str) -> bool {
        self.get_type_info(key)
            .is_some_and(|info| info.is_xml_attribute(xml_name))
    }

    /// Disables or re-enables property-changed events for bound models.
    pub fn set_property_change_notifications_disabled(&self, disabled: bool) {
        let previous = self.notifications_disabled.swap(disabled, Ordering::AcqRel);
        if previous != disabled {
            tracing::debug!(disabled, "property change notifications toggled");
        }
    }

    /// Whether property-changed events are disabled.
    #[must_use]
    pub fn property_change_notifications_disabled(&self) -> bool {
        self.notifications_disabled.load(Ordering::Acquire)
    }
}

impl Default for PropertyDataManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PropertyDataManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self
            .types
            .read()
            .map(|t| t.len())
            .unwrap_or_default();
        f.debug_struct("PropertyDataManager")
            .field("types", &types)
            .field(
                "notifications_disabled",
                &self.property_change_notifications_disabled(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;
    struct Other;

    #[test]
    fn unknown_types_report_not_registered() {
        let manager = PropertyDataManager::new();
        let err = manager
            .get_property_data(TypeKey::of::<Person>(), "Age")
            .unwrap_err();
        assert!(matches!(err, PropertyError::NotRegistered { .. }));
        assert!(manager.get_properties(TypeKey::of::<Person>()).is_empty());
    }

    #[test]
    fn types_are_isolated() {
        let manager = PropertyDataManager::new();
        let age = Property::register("Age", 0_i32);
        let info = manager
            .register_properties(TypeKey::of::<Person>(), |reg| {
                reg.register(&age)?;
                Ok(())
            })
            .unwrap();
        assert!(Arc::ptr_eq(
            &info,
            &manager.type_info(TypeKey::of::<Person>())
        ));
        assert!(manager.is_property_registered(TypeKey::of::<Person>(), "Age"));
        assert!(!manager.is_property_registered(TypeKey::of::<Other>(), "Age"));

        manager.unregister_property(TypeKey::of::<Person>(), "Age");
        assert!(!manager.is_property_registered(TypeKey::of::<Person>(), "Age"));
    }

    #[test]
    fn runtime_duplicate_fails() {
        let manager = PropertyDataManager::new();
        let key = TypeKey::of::<Other>();
        let size = Property::register("Size", 0_u32);
        manager.register_property(key, &size).unwrap();
        assert!(matches!(
            manager.register_property(key, &size),
            Err(PropertyError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn notification_switch() {
        let manager = PropertyDataManager::new();
        assert!(!manager.property_change_notifications_disabled());
        manager.set_property_change_notifications_disabled(true);
        assert!(manager.property_change_notifications_disabled());
    }
}
