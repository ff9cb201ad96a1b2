// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The model handle, its construction and the get/set path.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

use hashbrown::HashMap;
use understory_observable::{
    ChangeOrigin, Event, ObjectRef, ObjectValue, ObservableObject, PropertyChangedArgs,
    PropertyValue, Suspension, Value, ValueKind,
};
use understory_property::{
    IS_DIRTY_PROPERTY, IS_READ_ONLY_PROPERTY, IntrinsicProperty, Property, PropertyBag,
    PropertyBagStore, PropertyData, PropertyDataManager, PropertyError, TypeInfo, TypeKey,
    TypeRegistration, is_intrinsic,
};
use understory_validation::{BusinessRuleValidationResult, FieldValidationResult};

use crate::child::{self, ChildTracker};
use crate::editable::EditState;
use crate::flags::{AtomicStateFlags, StateFlags};
use crate::resolver::ServiceResolver;
use crate::settings::ModelSettings;
use crate::validation::{self, ValidationCore};

/// A type whose instances are models.
///
/// The implementing type holds whatever plain state the model needs besides
/// its declared properties; declared property values live in the model's
/// property bag. Every hook defaults to doing nothing.
///
/// Callbacks, calculated getters and plain property getters receive the
/// instance as `&Model<Self>`.
#[allow(unused_variables, reason = "default hooks ignore their arguments")]
pub trait ModelType: Any + Send + Sync + Sized {
    /// Declares the properties of the type. Runs once per process.
    fn register_properties(registration: &mut TypeRegistration) -> Result<(), PropertyError>;

    /// Settings shared by every instance. Read once per process.
    fn settings() -> ModelSettings {
        ModelSettings::default()
    }

    /// Runs at the end of construction, after defaults are applied.
    fn initialize_custom_properties(model: &Model<Self>) {}

    /// Runs for every raised property change, before the public event.
    fn on_property_changed(model: &Model<Self>, args: &PropertyChangedArgs) {}

    /// Adds field results during a validation pass.
    fn validate_fields(model: &Model<Self>, results: &mut Vec<FieldValidationResult>) {}

    /// Adds business-rule results during a validation pass.
    fn validate_business_rules(
        model: &Model<Self>,
        results: &mut Vec<BusinessRuleValidationResult>,
    ) {
    }
}

/// Result of a property write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOutcome {
    /// The stored value changed.
    Changed,
    /// The stored value was already equal.
    Unchanged,
    /// The write was refused: the model is frozen or read-only, or the
    /// property is calculated.
    Rejected,
}

static TYPE_SETTINGS: LazyLock<RwLock<HashMap<TypeId, Arc<ModelSettings>>>> =
    LazyLock::new(Default::default);

fn type_settings<M: ModelType>() -> Arc<ModelSettings> {
    if let Some(settings) = TYPE_SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&TypeId::of::<M>())
    {
        return settings.clone();
    }
    TYPE_SETTINGS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(TypeId::of::<M>())
        .or_insert_with(|| Arc::new(M::settings()))
        .clone()
}

pub(crate) struct ModelInner<M> {
    pub(crate) state: M,
    pub(crate) type_info: Arc<TypeInfo>,
    pub(crate) manager: &'static PropertyDataManager,
    pub(crate) resolver: Arc<ServiceResolver>,
    pub(crate) settings: Arc<ModelSettings>,
    pub(crate) bag: PropertyBag,
    pub(crate) observable: ObservableObject,
    pub(crate) flags: AtomicStateFlags,
    pub(crate) notifications: Suspension,
    pub(crate) callbacks: Suspension,
    pub(crate) validation: ValidationCore,
    pub(crate) children: ChildTracker,
    pub(crate) edit: EditState,
    pub(crate) hash: OnceLock<u64>,
}

impl<M: ModelType> fmt::Debug for ModelInner<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type", &self.type_info.type_key())
            .field("values", &self.bag)
            .finish_non_exhaustive()
    }
}

impl<M: ModelType> ObjectValue for ModelInner<M> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn property_changed(&self) -> Option<&Event<PropertyChangedArgs>> {
        Some(self.observable.property_changed())
    }

    fn snapshot(&self) -> Option<Value> {
        let entries = self
            .type_info
            .get_properties()
            .into_iter()
            .filter(|data| {
                data.include_in_serialization()
                    && !data.is_calculated_property()
                    && !is_intrinsic(data.name())
            })
            .filter_map(|data| {
                let value = self.bag.get_value(data.name())?;
                Some((data.shared_name().clone(), value))
            })
            .collect();
        Some(Value::Map(entries))
    }
}

/// A shared handle to one model instance.
///
/// Cloning the handle shares the instance. Properties are read and written
/// through declared [`Property`] handles or by name.
///
/// # Example
///
/// ```rust
/// use std::sync::LazyLock;
///
/// use understory_model::prelude::*;
///
/// static AGE: LazyLock<Property<i32>> = LazyLock::new(|| Property::register("Age", 0));
///
/// struct Person;
///
/// impl ModelType for Person {
///     fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
///         reg.register(&AGE)?;
///         Ok(())
///     }
/// }
///
/// let person = Model::new(Person).unwrap();
/// assert_eq!(person.get(&AGE).unwrap(), 0);
/// assert_eq!(person.set(&AGE, 5).unwrap(), SetOutcome::Changed);
/// assert!(person.is_dirty());
/// ```
pub struct Model<M> {
    pub(crate) inner: Arc<ModelInner<M>>,
}

impl<M> Clone for Model<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Configures the construction of a [`Model`].
pub struct ModelBuilder<M> {
    state: M,
    manager: &'static PropertyDataManager,
    resolver: Option<Arc<ServiceResolver>>,
    settings: Option<ModelSettings>,
    values: Vec<(String, Value)>,
}

impl<M: ModelType> ModelBuilder<M> {
    /// Uses `manager` instead of the global property registry.
    #[must_use]
    pub fn manager(mut self, manager: &'static PropertyDataManager) -> Self {
        self.manager = manager;
        self
    }

    /// Uses `resolver` instead of the global service resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<ServiceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Overrides the type's settings for this instance.
    #[must_use]
    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Pre-seeds a property value. Defaults are not applied over it.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Declaration errors of the type, and [`PropertyError`]s for invalid
    /// pre-seeded values.
    pub fn build(self) -> Result<Model<M>, PropertyError> {
        let type_info = self
            .manager
            .register_properties(TypeKey::of::<M>(), M::register_properties)?;
        let settings = self
            .settings
            .map_or_else(type_settings::<M>, Arc::new);

        let model = Model {
            inner: Arc::new(ModelInner {
                state: self.state,
                type_info,
                manager: self.manager,
                resolver: self.resolver.unwrap_or_else(ServiceResolver::global),
                settings,
                bag: PropertyBag::new(),
                observable: ObservableObject::new(),
                flags: AtomicStateFlags::default(),
                notifications: Suspension::new(),
                callbacks: Suspension::new(),
                validation: ValidationCore::new(),
                children: ChildTracker::default(),
                edit: EditState::default(),
                hash: OnceLock::new(),
            }),
        };

        for (name, value) in self.values {
            let data = model.inner.type_info.get_property_data(&name)?;
            let value = model.coerce(&data, value)?;
            model.inner.bag.set_value(data.name(), value)?;
        }
        for data in model.inner.type_info.get_properties() {
            if !data.is_calculated_property() {
                model
                    .inner
                    .bag
                    .set_if_absent(data.name(), data.default_value())?;
            }
        }
        if model.inner.settings.handle_child_changes {
            child::watch_initial_values(&model);
        }
        child::register_model_type::<M>();

        M::initialize_custom_properties(&model);
        model.inner.flags.insert(StateFlags::INITIALIZED);
        tracing::trace!(model = std::any::type_name::<M>(), "model initialized");
        Ok(model)
    }
}

impl<M> fmt::Debug for ModelBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBuilder")
            .field("type", &std::any::type_name::<M>())
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl<M: ModelType> Model<M> {
    /// Creates a model with default settings and collaborators.
    ///
    /// # Errors
    ///
    /// Declaration errors of the type.
    pub fn new(state: M) -> Result<Self, PropertyError> {
        Self::builder(state).build()
    }

    /// Creates a model with some values pre-seeded before defaults apply.
    ///
    /// # Errors
    ///
    /// See [`ModelBuilder::build`].
    pub fn with_values<I, K>(state: M, values: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut builder = Self::builder(state);
        builder
            .values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v)));
        builder.build()
    }

    /// Starts configuring a model.
    pub fn builder(state: M) -> ModelBuilder<M> {
        ModelBuilder {
            state,
            manager: PropertyDataManager::global(),
            resolver: None,
            settings: None,
            values: Vec::new(),
        }
    }

    /// The plain state of the instance.
    #[must_use]
    #[inline]
    pub fn state(&self) -> &M {
        &self.inner.state
    }

    /// The property descriptor of the type.
    #[must_use]
    #[inline]
    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.inner.type_info
    }

    /// The effective settings.
    #[must_use]
    #[inline]
    pub fn settings(&self) -> &ModelSettings {
        &self.inner.settings
    }

    /// The service resolver.
    #[must_use]
    #[inline]
    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.inner.resolver
    }

    /// Raised for every property change that is not suspended.
    #[must_use]
    #[inline]
    pub fn property_changed(&self) -> &Event<PropertyChangedArgs> {
        self.inner.observable.property_changed()
    }

    /// Whether construction finished.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.flags.contains(StateFlags::INITIALIZED)
    }

    /// Whether both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The instance as an untyped object reference.
    #[must_use]
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.inner.clone())
    }

    /// Reads a property through its typed handle.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotRegistered`] if the type has no property of that
    /// name, and [`PropertyError::InvalidPropertyValue`] if the stored value
    /// is not a `T`.
    pub fn get<T: PropertyValue>(&self, property: &Property<T>) -> Result<T, PropertyError> {
        let value = self.get_value(property.name())?;
        T::from_value(&value).ok_or_else(|| PropertyError::InvalidPropertyValue {
            type_name: std::any::type_name::<M>(),
            property: property.name().to_owned(),
            expected: std::any::type_name::<T>(),
            actual: value.kind(),
        })
    }

    /// Reads a property by name.
    ///
    /// Calculated properties are computed through their getter.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotRegistered`] if the type has no such property.
    pub fn get_value(&self, name: &str) -> Result<Value, PropertyError> {
        let data = self.inner.type_info.get_property_data(name)?;
        Ok(self.read(&data))
    }

    pub(crate) fn read(&self, data: &PropertyData) -> Value {
        if data.is_calculated_property() {
            return data.calculated_value(self).unwrap_or_default();
        }
        if let Some(value) = self.inner.bag.get_value(data.name()) {
            return value;
        }
        // Registered after construction: materialize the default once.
        if let Err(err) = self.inner.bag.set_if_absent(data.name(), data.default_value()) {
            tracing::warn!(
                model = std::any::type_name::<M>(),
                property = data.name(),
                error = %err,
                "default of a late property could not be stored"
            );
            return data.default_value();
        }
        self.inner
            .bag
            .get_value(data.name())
            .unwrap_or_default()
    }

    /// Writes a property through its typed handle.
    ///
    /// # Errors
    ///
    /// See [`Model::set_value`].
    pub fn set<T: PropertyValue>(
        &self,
        property: &Property<T>,
        value: T,
    ) -> Result<SetOutcome, PropertyError> {
        self.set_value(property.name(), value.into_value())
    }

    /// Writes a property by name and notifies on change.
    ///
    /// Frozen and read-only models, and calculated properties, refuse the
    /// write with a warning and [`SetOutcome::Rejected`].
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotRegistered`] for unknown names,
    /// [`PropertyError::NotNullable`] for `Null` on a non-nullable property and
    /// [`PropertyError::InvalidPropertyValue`] for values of the wrong type.
    pub fn set_value(&self, name: &str, value: Value) -> Result<SetOutcome, PropertyError> {
        self.set_value_with(name, value, true)
    }

    /// Writes a property by name, optionally without notification.
    ///
    /// # Errors
    ///
    /// See [`Model::set_value`].
    pub fn set_value_with(
        &self,
        name: &str,
        value: Value,
        notify_on_change: bool,
    ) -> Result<SetOutcome, PropertyError> {
        let data = self.inner.type_info.get_property_data(name)?;
        self.set_checked(&data, value, notify_on_change)
    }

    pub(crate) fn set_checked(
        &self,
        data: &Arc<PropertyData>,
        value: Value,
        notify_on_change: bool,
    ) -> Result<SetOutcome, PropertyError> {
        let type_name = std::any::type_name::<M>();
        if self.frozen_flag() {
            tracing::warn!(
                model = type_name,
                property = data.name(),
                "model is frozen, value not set"
            );
            return Ok(SetOutcome::Rejected);
        }
        if self.read_only_flag() && data.name() != IntrinsicProperty::IsReadOnly.name() {
            tracing::warn!(
                model = type_name,
                property = data.name(),
                "model is read-only, value not set"
            );
            return Ok(SetOutcome::Rejected);
        }
        if data.is_calculated_property() {
            tracing::warn!(
                model = type_name,
                property = data.name(),
                "calculated property cannot be set"
            );
            return Ok(SetOutcome::Rejected);
        }
        let value = self.coerce(data, value)?;
        self.store(data, value, notify_on_change)
    }

    fn coerce(&self, data: &PropertyData, value: Value) -> Result<Value, PropertyError> {
        let type_name = std::any::type_name::<M>();
        if value.is_null() {
            return if data.is_nullable() {
                Ok(Value::Null)
            } else {
                Err(PropertyError::NotNullable {
                    type_name,
                    property: data.name().to_owned(),
                })
            };
        }
        if !data.accepts(&value) {
            return Err(PropertyError::InvalidPropertyValue {
                type_name,
                property: data.name().to_owned(),
                expected: data.type_name(),
                actual: value.kind(),
            });
        }
        if data.kind() == ValueKind::Any {
            return Ok(value);
        }
        Ok(data.revive(&value).unwrap_or(value))
    }

    /// Writes to the bag and runs change handling. No guards.
    pub(crate) fn store(
        &self,
        data: &Arc<PropertyData>,
        value: Value,
        notify_on_change: bool,
    ) -> Result<SetOutcome, PropertyError> {
        let write = self.inner.bag.set_value(data.name(), value.clone())?;
        let intrinsic = is_intrinsic(data.name());
        if write.changed {
            if self.inner.settings.handle_child_changes {
                child::update_watch(self, data.shared_name(), &value);
            }
            if !intrinsic {
                validation::on_value_changed(self, data);
            }
        }

        let notify = notify_on_change
            && (write.changed || self.inner.settings.always_invoke_notify_changed);
        if notify {
            let args = PropertyChangedArgs::with_values(
                data.shared_name().clone(),
                write.old_value.unwrap_or_default(),
                value,
            );
            self.notify(&args);
        }
        Ok(if write.changed {
            SetOutcome::Changed
        } else {
            SetOutcome::Unchanged
        })
    }

    /// Raises a change of `name` through the normal notification path.
    pub fn raise_property_changed(&self, name: &str) {
        self.notify(&PropertyChangedArgs::new(name));
    }

    /// Defers `args` while notifications are suspended, raises it otherwise.
    pub(crate) fn notify(&self, args: &PropertyChangedArgs) {
        if self.inner.notifications.record(args.name()) {
            tracing::trace!(property = args.name(), "change notification deferred");
            return;
        }
        self.raise_core(args);
    }

    /// The single place where a change becomes visible.
    pub(crate) fn raise_core(&self, args: &PropertyChangedArgs) {
        let name = args.name();
        if args.origin == ChangeOrigin::Local && !args.is_unspecified() {
            if self.inner.callbacks.record(name) {
                tracing::trace!(property = name, "change callback suspended");
            } else if let Ok(data) = self.inner.type_info.get_property_data(name) {
                data.on_changed(self, args);
            }
        }

        M::on_property_changed(self, args);

        if !self.inner.manager.property_change_notifications_disabled() {
            self.inner.observable.raise_property_changed(args);
        }

        if !is_intrinsic(name) {
            if args.origin != ChangeOrigin::Local || args.is_unspecified() {
                validation::invalidate(self);
            }
            self.set_dirty_flag(true);
            validation::after_property_changed(self);
        }
    }

    pub(crate) fn dirty_flag(&self) -> bool {
        self.flag(IntrinsicProperty::IsDirty)
    }

    pub(crate) fn read_only_flag(&self) -> bool {
        self.flag(IntrinsicProperty::IsReadOnly)
    }

    pub(crate) fn frozen_flag(&self) -> bool {
        self.inner.flags.contains(StateFlags::FROZEN)
    }

    fn flag(&self, property: IntrinsicProperty) -> bool {
        self.inner
            .bag
            .get_value(property.name())
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub(crate) fn set_dirty_flag(&self, dirty: bool) {
        if self.dirty_flag() == dirty {
            return;
        }
        // Intrinsic writes cannot fail type checks.
        let _ = self.store(IS_DIRTY_PROPERTY.data(), Value::Bool(dirty), true);
    }

    pub(crate) fn set_read_only_flag(&self, read_only: bool) -> SetOutcome {
        self.set_checked(IS_READ_ONLY_PROPERTY.data(), Value::Bool(read_only), true)
            .unwrap_or(SetOutcome::Rejected)
    }

    pub(crate) fn freeze_now(&self) {
        if self.inner.flags.try_insert(StateFlags::FROZEN) {
            tracing::debug!(model = std::any::type_name::<M>(), "model frozen");
        }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<ModelInner<M>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<ModelInner<M>>) -> Self {
        Self { inner }
    }
}

impl<M: ModelType> fmt::Debug for Model<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<M: ModelType> PropertyValue for Model<M> {
    fn kind() -> ValueKind {
        ValueKind::Object
    }

    fn into_value(self) -> Value {
        Value::Object(self.to_object_ref())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .downcast::<ModelInner<M>>()
            .map(Self::from_inner)
    }
}

impl<M: ModelType> From<Model<M>> for Value {
    fn from(model: Model<M>) -> Self {
        model.into_value()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use understory_property::PropertyDataBuilder;

    use super::*;
    use crate::capabilities::DirtyTracking;

    static AGE: LazyLock<Property<i32>> = LazyLock::new(|| Property::register("Age", 0));
    static NICK: LazyLock<Property<Option<String>>> =
        LazyLock::new(|| Property::register("Nick", None));
    static SCORE: LazyLock<Property<f64>> = LazyLock::new(|| Property::register("Score", 0.0));
    static DOUBLE_AGE: LazyLock<Property<i32>> = LazyLock::new(|| {
        PropertyDataBuilder::calculated("DoubleAge", |m: &Model<Person>| {
            m.get(&AGE).unwrap_or_default() * 2
        })
        .build()
    });

    struct Person;

    impl ModelType for Person {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&AGE)?
                .register(&NICK)?
                .register(&SCORE)?
                .register(&DOUBLE_AGE)?;
            Ok(())
        }
    }

    fn record(model: &Model<Person>) -> (Arc<Mutex<Vec<String>>>, understory_observable::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = model
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push(args.name().to_owned());
            })
            .unwrap();
        (seen, sub)
    }

    #[test]
    fn defaults_are_applied() {
        let person = Model::new(Person).unwrap();
        assert_eq!(person.get(&AGE).unwrap(), 0);
        assert_eq!(person.get(&NICK).unwrap(), None);
        assert!(!person.is_dirty());
        assert!(person.is_initialized());
    }

    #[test]
    fn pre_seeded_values_win_over_defaults() {
        let person = Model::builder(Person).value("Age", 30_i32).build().unwrap();
        assert_eq!(person.get(&AGE).unwrap(), 30);
        assert!(!person.is_dirty());
    }

    #[test]
    fn properties_added_after_construction_read_their_default() {
        static LATE: LazyLock<Property<i32>> = LazyLock::new(|| Property::register("Late", 7));
        let manager: &'static PropertyDataManager = Box::leak(Box::new(PropertyDataManager::new()));
        let person = Model::builder(Person).manager(manager).build().unwrap();

        manager
            .register_property(TypeKey::of::<Person>(), &LATE)
            .unwrap();
        assert_eq!(person.get(&LATE).unwrap(), 7);
        assert_eq!(person.get_value("Late").unwrap(), Value::Int(7));
        person.set(&LATE, 8).unwrap();
        assert_eq!(person.get(&LATE).unwrap(), 8);
    }

    #[test]
    fn unknown_names_fail() {
        let person = Model::new(Person).unwrap();
        assert!(matches!(
            person.get_value("Height"),
            Err(PropertyError::NotRegistered { .. })
        ));
        assert!(matches!(
            person.set_value("Height", Value::Int(1)),
            Err(PropertyError::NotRegistered { .. })
        ));
    }

    #[test]
    fn type_errors_fail_fast() {
        let person = Model::new(Person).unwrap();
        assert!(matches!(
            person.set_value("Age", Value::from("old")),
            Err(PropertyError::InvalidPropertyValue { .. })
        ));
        assert!(matches!(
            person.set_value("Age", Value::Null),
            Err(PropertyError::NotNullable { .. })
        ));
        assert_eq!(
            person.set_value("Nick", Value::Null).unwrap(),
            SetOutcome::Unchanged
        );
    }

    #[test]
    fn integers_are_widened_for_float_properties() {
        let person = Model::new(Person).unwrap();
        person.set_value("Score", Value::Int(3)).unwrap();
        assert_eq!(person.get_value("Score").unwrap(), Value::Float(3.0));
    }

    #[test]
    fn calculated_properties_read_through_getter_and_refuse_writes() {
        let person = Model::new(Person).unwrap();
        person.set(&AGE, 21).unwrap();
        assert_eq!(person.get(&DOUBLE_AGE).unwrap(), 42);
        assert_eq!(person.set(&DOUBLE_AGE, 1).unwrap(), SetOutcome::Rejected);
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let person = Model::new(Person).unwrap();
        let (seen, _sub) = record(&person);
        person.set(&AGE, 5).unwrap();
        person.set(&AGE, 5).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["Age", "IsDirty"]);
    }

    #[test]
    fn always_invoke_notifies_equal_values() {
        let person = Model::builder(Person)
            .settings(ModelSettings {
                always_invoke_notify_changed: true,
                ..ModelSettings::default()
            })
            .build()
            .unwrap();
        let (seen, _sub) = record(&person);
        person.set(&AGE, 0).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["Age", "IsDirty"]);
    }

    #[test]
    fn silent_writes_store_without_events() {
        let person = Model::new(Person).unwrap();
        let (seen, _sub) = record(&person);
        person.set_value_with("Age", Value::Int(9), false).unwrap();
        assert_eq!(person.get(&AGE).unwrap(), 9);
        assert!(seen.lock().unwrap().is_empty());
        assert!(!person.is_dirty());
    }

    #[test]
    fn models_round_trip_through_values() {
        let person = Model::new(Person).unwrap();
        let value = person.clone().into_value();
        let back = Model::<Person>::from_value(&value).unwrap();
        assert!(back.ptr_eq(&person));
        assert!(Model::<Person>::from_value(&Value::Int(1)).is_none());
    }
}
