// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The validation engine of a model.
//!
//! Validation is pull-based: any tracked change clears the "validated" state,
//! and the next [`Validatable::has_errors`] or [`Validatable::has_warnings`]
//! runs one non-forced pass. A pass builds a fresh [`ValidationContext`] from
//! the type hooks, the registered [`Validator`] and the cached annotation
//! results, then reconciles it with the previous context so that only
//! properties whose results actually changed are announced.
//!
//! Annotation results (the [`PropertyRule`](understory_validation::PropertyRule)s
//! declared on properties) are computed for every property on the first pass
//! and on forced passes, and recomputed for a single property when its value
//! changes.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashSet;
use understory_observable::{Event, PropertyChangedArgs, Suspension, SuspensionToken, Value};
use understory_property::{IntrinsicProperty, PropertyBagStore, PropertyData};
use understory_validation::{
    BusinessRuleValidationResult, FieldValidationResult, ValidationContext,
    ValidationContextChange, ValidationResultType, ValidationSummary,
    ValidationTarget, Validator, ValidatorProvider, validate_property,
};

use crate::child;
use crate::flags::{AtomicStateFlags, StateFlags};
use crate::model::{Model, ModelType};

/// Arguments of the errors-changed and warnings-changed events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataErrorsChangedArgs {
    /// The property whose results changed; empty for business rules.
    pub property_name: Arc<str>,
}

#[derive(Default)]
struct ValidationState {
    context: ValidationContext,
    annotations: Vec<(Arc<str>, Vec<FieldValidationResult>)>,
    annotations_initialized: bool,
    in_flight: HashSet<Arc<str>>,
}

impl ValidationState {
    fn set_annotations(&mut self, name: &Arc<str>, results: Vec<FieldValidationResult>) {
        match self.annotations.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = results,
            None => self.annotations.push((name.clone(), results)),
        }
    }
}

pub(crate) struct ValidationCore {
    state: Mutex<ValidationState>,
    suspension: Suspension,
    errors_changed: Event<DataErrorsChangedArgs>,
    warnings_changed: Event<DataErrorsChangedArgs>,
}

impl ValidationCore {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ValidationState::default()),
            suspension: Suspension::new(),
            errors_changed: Event::new("ErrorsChanged"),
            warnings_changed: Event::new("WarningsChanged"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ValidationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ValidationCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ValidationCore")
            .field("errors", &state.context.error_count())
            .field("warnings", &state.context.warning_count())
            .field("suspended", &self.suspension.is_active())
            .finish_non_exhaustive()
    }
}

/// A model that validates itself.
pub trait Validatable {
    /// Runs a validation pass.
    ///
    /// Does nothing while a pass is running or validation is suspended, and
    /// unless `force` is set, while the last pass is still up to date.
    /// Annotation rules are re-evaluated for every property only when both
    /// `force` and `validate_annotations` are set.
    fn validate(&self, force: bool, validate_annotations: bool);

    /// Whether the last pass is still up to date.
    fn is_validated(&self) -> bool;

    /// Whether any error is present, validating first if stale.
    fn has_errors(&self) -> bool;

    /// Whether any warning is present, validating first if stale.
    fn has_warnings(&self) -> bool;

    /// A copy of the current results.
    fn validation_context(&self) -> ValidationContext;

    /// Defers validation until the returned token drops.
    ///
    /// On resume either a forced full pass runs (`validate_on_resume`) or
    /// only the annotations of properties changed in the meantime are
    /// refreshed.
    fn suspend_validation(&self, validate_on_resume: bool) -> SuspensionToken;

    /// Raised per property whose errors changed.
    fn errors_changed(&self) -> &Event<DataErrorsChangedArgs>;

    /// Raised per property whose warnings changed.
    fn warnings_changed(&self) -> &Event<DataErrorsChangedArgs>;
}

/// String-oriented queries over the current validation results.
///
/// These read the results as they are and never validate. With the
/// `hide_validation_results` setting every query returns an empty result.
pub trait DataErrorInfo {
    /// The first business-rule error message, or an empty string.
    fn error(&self) -> String;

    /// The first business-rule warning message, or an empty string.
    fn warning(&self) -> String;

    /// The first error message of `property`, or an empty string.
    fn field_error(&self, property: &str) -> String;

    /// The first warning message of `property`, or an empty string.
    fn field_warning(&self, property: &str) -> String;

    /// Every error message of `property`; business-rule errors for `None`
    /// or an empty name.
    fn get_errors(&self, property: Option<&str>) -> Vec<String>;

    /// Every warning message of `property`; business-rule warnings for `None`
    /// or an empty name.
    fn get_warnings(&self, property: Option<&str>) -> Vec<String>;

    /// A snapshot of the results carrying `tag` (all for `None`), optionally
    /// merged with the summaries of child models.
    fn validation_summary(&self, include_children: bool, tag: Option<&str>) -> ValidationSummary;
}

impl<M: ModelType> Validatable for Model<M> {
    fn validate(&self, force: bool, validate_annotations: bool) {
        run(self, force, validate_annotations);
    }

    fn is_validated(&self) -> bool {
        self.inner.flags.contains(StateFlags::VALIDATED)
    }

    fn has_errors(&self) -> bool {
        ensure_up_to_date(self);
        self.inner.validation.lock().context.has_errors()
    }

    fn has_warnings(&self) -> bool {
        ensure_up_to_date(self);
        self.inner.validation.lock().context.has_warnings()
    }

    fn validation_context(&self) -> ValidationContext {
        self.inner.validation.lock().context.clone()
    }

    fn suspend_validation(&self, validate_on_resume: bool) -> SuspensionToken {
        self.inner.validation.suspension.enter();
        let weak = self.downgrade();
        SuspensionToken::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some(context) = inner.validation.suspension.exit() else {
                return;
            };
            let model = Self::from_inner(inner);
            if validate_on_resume {
                run(&model, true, true);
            } else {
                for name in context.properties() {
                    refresh_annotations(&model, name);
                }
                invalidate(&model);
            }
        })
    }

    fn errors_changed(&self) -> &Event<DataErrorsChangedArgs> {
        &self.inner.validation.errors_changed
    }

    fn warnings_changed(&self) -> &Event<DataErrorsChangedArgs> {
        &self.inner.validation.warnings_changed
    }
}

impl<M: ModelType> DataErrorInfo for Model<M> {
    fn error(&self) -> String {
        self.get_errors(None).into_iter().next().unwrap_or_default()
    }

    fn warning(&self) -> String {
        self.get_warnings(None).into_iter().next().unwrap_or_default()
    }

    fn field_error(&self, property: &str) -> String {
        self.get_errors(Some(property))
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn field_warning(&self, property: &str) -> String {
        self.get_warnings(Some(property))
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    fn get_errors(&self, property: Option<&str>) -> Vec<String> {
        messages(self, property, ValidationResultType::Error)
    }

    fn get_warnings(&self, property: Option<&str>) -> Vec<String> {
        messages(self, property, ValidationResultType::Warning)
    }

    fn validation_summary(&self, include_children: bool, tag: Option<&str>) -> ValidationSummary {
        if self.settings().hide_validation_results {
            return ValidationSummary::default();
        }
        let mut visited = HashSet::new();
        visited.insert(self.to_object_ref().id());
        collect_summary(self, include_children, tag, &mut visited)
    }
}

impl<M: ModelType> ValidationTarget for Model<M> {
    fn target_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn target_type_name(&self) -> &'static str {
        std::any::type_name::<M>()
    }

    fn property_value(&self, name: &str) -> Option<Value> {
        if let Ok(value) = self.get_value(name) {
            return Some(value);
        }
        self.type_info()
            .plain_properties()
            .iter()
            .find(|p| p.name() == name)
            .and_then(|p| p.value(self))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn messages<M: ModelType>(
    model: &Model<M>,
    property: Option<&str>,
    kind: ValidationResultType,
) -> Vec<String> {
    if model.settings().hide_validation_results {
        return Vec::new();
    }
    let state = model.inner.validation.lock();
    match property.filter(|p| !p.is_empty()) {
        Some(property) => state
            .context
            .field_results_of(property, kind)
            .map(|r| r.message().to_owned())
            .collect(),
        None => state
            .context
            .business_rule_results_of(kind)
            .map(|r| r.message().to_owned())
            .collect(),
    }
}

pub(crate) fn collect_summary<M: ModelType>(
    model: &Model<M>,
    include_children: bool,
    tag: Option<&str>,
    visited: &mut HashSet<usize>,
) -> ValidationSummary {
    let mut summary = {
        let state = model.inner.validation.lock();
        ValidationSummary::filtered(&state.context, tag)
    };
    if include_children {
        let mut children = Vec::new();
        for (_, value) in model.inner.bag.get_all_properties() {
            child::child_summaries(&value, tag, visited, &mut children);
        }
        for child in children {
            summary.merge(child);
        }
    }
    summary
}

/// Marks the last pass stale.
pub(crate) fn invalidate<M: ModelType>(model: &Model<M>) {
    model.inner.flags.remove(StateFlags::VALIDATED);
}

/// Called after a stored, non-intrinsic value changed.
pub(crate) fn on_value_changed<M: ModelType>(model: &Model<M>, data: &PropertyData) {
    invalidate(model);
    if !model.settings().validate_using_annotations {
        return;
    }
    if model.inner.validation.suspension.record(data.name()) {
        return;
    }
    refresh_annotations(model, data.name());
}

/// Called once a non-intrinsic change has been raised.
pub(crate) fn after_property_changed<M: ModelType>(model: &Model<M>) {
    if model.settings().automatically_validate_on_property_changed {
        run(model, false, false);
    }
}

fn ensure_up_to_date<M: ModelType>(model: &Model<M>) {
    if !model.inner.flags.contains(StateFlags::VALIDATED) {
        run(model, false, false);
    }
}

fn refresh_annotations<M: ModelType>(model: &Model<M>, name: &str) {
    if !model.inner.validation.lock().annotations_initialized {
        return;
    }
    let Ok(data) = model.type_info().get_property_data(name) else {
        return;
    };
    if data.is_framework_property() {
        return;
    }
    let results = annotate(model, &data).unwrap_or_default();
    model
        .inner
        .validation
        .lock()
        .set_annotations(data.shared_name(), results);
}

/// Evaluates the rules of one metadata property. `None` if the property is
/// excluded or cannot be evaluated.
fn annotate<M: ModelType>(model: &Model<M>, data: &PropertyData) -> Option<Vec<FieldValidationResult>> {
    let type_info = model.type_info();
    if data.rules().is_empty() || type_info.is_excluded_from_annotations(data.name()) {
        return None;
    }
    let value = model.read(data);
    match validate_property(data.name(), &value, data.rules()) {
        Ok(results) => Some(results),
        Err(err) => {
            tracing::debug!(property = data.name(), error = %err, "annotation rule failed");
            type_info.exclude_from_annotations(data.name());
            None
        }
    }
}

fn annotate_all<M: ModelType>(model: &Model<M>) -> Vec<(Arc<str>, Vec<FieldValidationResult>)> {
    let type_info = model.type_info();
    let mut all = Vec::new();
    for data in type_info.get_properties() {
        if data.is_framework_property() {
            continue;
        }
        if let Some(results) = annotate(model, &data) {
            all.push((data.shared_name().clone(), results));
        }
    }
    for plain in type_info.plain_properties() {
        if plain.rules().is_empty() || type_info.is_excluded_from_annotations(plain.name()) {
            continue;
        }
        let evaluated = plain
            .value(model)
            .ok_or(None)
            .and_then(|value| {
                validate_property(plain.name(), &value, plain.rules()).map_err(Some)
            });
        match evaluated {
            Ok(results) => all.push((Arc::from(plain.name()), results)),
            Err(err) => {
                if let Some(err) = err {
                    tracing::debug!(property = plain.name(), error = %err, "annotation rule failed");
                }
                type_info.exclude_from_annotations(plain.name());
            }
        }
    }
    all
}

fn run<M: ModelType>(model: &Model<M>, force: bool, validate_annotations: bool) {
    let core = &model.inner.validation;
    let flags = &model.inner.flags;
    if core.suspension.is_active() {
        return;
    }
    if !force && flags.contains(StateFlags::VALIDATED) {
        return;
    }
    if !flags.try_insert(StateFlags::VALIDATING) {
        tracing::trace!("validation already running");
        return;
    }
    let validating = Validating(flags);

    let validator: Option<Arc<dyn Validator>> = model
        .resolver()
        .resolve::<dyn ValidatorProvider>()
        .and_then(|provider| provider.get_validator(TypeId::of::<M>()));
    let target: &dyn ValidationTarget = model;

    let (previous_fields, previous_rules) = {
        let state = core.lock();
        (
            state.context.field_results().to_vec(),
            state.context.business_rule_results().to_vec(),
        )
    };
    if let Some(v) = &validator {
        v.before_validation(target, &previous_fields, &previous_rules);
        v.before_validate_fields(target, &previous_fields);
    }

    let mut fields = Vec::new();
    M::validate_fields(model, &mut fields);
    if let Some(v) = &validator {
        v.validate_fields(target, &mut fields);
    }

    if model.settings().validate_using_annotations {
        let initialized = core.lock().annotations_initialized;
        if !initialized || (force && validate_annotations) {
            let computed = annotate_all(model);
            let mut state = core.lock();
            state.annotations = computed;
            state.annotations_initialized = true;
        }
        let state = core.lock();
        for (_, results) in &state.annotations {
            fields.extend(results.iter().cloned());
        }
    }
    if let Some(v) = &validator {
        v.after_validate_fields(target, &fields);
        v.before_validate_business_rules(target, &previous_rules);
    }

    let mut rules: Vec<BusinessRuleValidationResult> = Vec::new();
    M::validate_business_rules(model, &mut rules);
    if let Some(v) = &validator {
        v.validate_business_rules(target, &mut rules);
        v.after_validate_business_rules(target, &rules);
    }

    let mut fresh = ValidationContext::new();
    for result in fields {
        fresh.add_field_validation_result(result);
    }
    for result in rules {
        fresh.add_business_rule_validation_result(result);
    }
    if let Some(v) = &validator {
        v.validate(target, &mut fresh);
        v.after_validation(target, fresh.field_results(), fresh.business_rule_results());
    }

    let (changes, had, has) = {
        let mut state = core.lock();
        let had = (state.context.has_errors(), state.context.has_warnings());
        let changes = state.context.synchronize_with_context(&fresh, false);
        let has = (state.context.has_errors(), state.context.has_warnings());
        (changes, had, has)
    };
    flags.insert(StateFlags::VALIDATED);
    drop(validating);
    tracing::trace!(
        model = std::any::type_name::<M>(),
        changes = changes.len(),
        "validation pass finished"
    );

    announce(model, &changes);
    if had.0 != has.0 {
        model.notify(&PropertyChangedArgs::new(IntrinsicProperty::HasErrors.name()));
    }
    if had.1 != has.1 {
        model.notify(&PropertyChangedArgs::new(IntrinsicProperty::HasWarnings.name()));
    }
}

/// Clears [`StateFlags::VALIDATING`] when a pass ends, including by a panic
/// in a hook.
struct Validating<'a>(&'a AtomicStateFlags);

impl Drop for Validating<'_> {
    fn drop(&mut self) {
        self.0.remove(StateFlags::VALIDATING);
    }
}

/// Marks a property name as being announced until dropped.
struct InFlight<'a> {
    core: &'a ValidationCore,
    name: Arc<str>,
}

impl<'a> InFlight<'a> {
    fn enter(core: &'a ValidationCore, name: Arc<str>) -> Option<Self> {
        core.lock()
            .in_flight
            .insert(name.clone())
            .then_some(Self { core, name })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.core.lock().in_flight.remove(&self.name);
    }
}

/// Raises errors-changed or warnings-changed once per affected property.
fn announce<M: ModelType>(model: &Model<M>, changes: &[ValidationContextChange]) {
    let mut errors: Vec<Arc<str>> = Vec::new();
    let mut warnings: Vec<Arc<str>> = Vec::new();
    for change in changes {
        let name: Arc<str> = Arc::from(change.result.property_name());
        let names = match change.result.result_type() {
            ValidationResultType::Error => &mut errors,
            ValidationResultType::Warning => &mut warnings,
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let core = &model.inner.validation;
    for (names, event) in [
        (errors, &core.errors_changed),
        (warnings, &core.warnings_changed),
    ] {
        for name in names {
            let Some(_in_flight) = InFlight::enter(core, name.clone()) else {
                continue;
            };
            event.raise(&DataErrorsChangedArgs {
                property_name: name,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use understory_property::{Property, PropertyDataBuilder, PropertyError, TypeRegistration};
    use understory_validation::PropertyRule;

    use super::*;

    static AGE: LazyLock<Property<i32>> = LazyLock::new(|| {
        PropertyDataBuilder::new("Age", 0)
            .rule(PropertyRule::range(0.0, 150.0))
            .build()
    });
    static NAME: LazyLock<Property<String>> = LazyLock::new(|| {
        PropertyDataBuilder::new("Name", String::new())
            .rule(PropertyRule::required().as_warning())
            .build()
    });

    struct Person;

    impl ModelType for Person {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&AGE)?.register(&NAME)?;
            Ok(())
        }

        fn validate_business_rules(
            model: &Model<Self>,
            results: &mut Vec<BusinessRuleValidationResult>,
        ) {
            if model.get(&AGE).unwrap_or_default() == 13 {
                results.push(BusinessRuleValidationResult::error("unlucky"));
            }
        }
    }

    #[test]
    fn annotations_report_field_results() {
        let person = Model::new(Person).unwrap();
        assert!(!person.has_errors());
        assert!(person.has_warnings());
        assert!(!person.field_warning("Name").is_empty());

        person.set(&AGE, 200).unwrap();
        assert!(person.has_errors());
        assert_eq!(person.get_errors(Some("Age")).len(), 1);

        person.set(&AGE, 20).unwrap();
        assert!(!person.has_errors());
        assert!(person.field_error("Age").is_empty());
    }

    #[test]
    fn business_rules_surface_through_error() {
        let person = Model::new(Person).unwrap();
        person.set(&AGE, 13).unwrap();
        assert!(person.has_errors());
        assert_eq!(person.error(), "unlucky");
        assert_eq!(person.get_errors(None), ["unlucky"]);
    }

    #[test]
    fn errors_changed_names_the_property() {
        let person = Model::new(Person).unwrap();
        person.validate(true, true);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = person
            .errors_changed()
            .subscribe(move |args: &DataErrorsChangedArgs| {
                sink.lock().unwrap().push(args.property_name.to_string());
            })
            .unwrap();

        person.set(&AGE, -1).unwrap();
        person.validate(false, false);
        assert_eq!(*seen.lock().unwrap(), ["Age"]);
    }

    #[test]
    fn has_errors_flip_is_announced() {
        let person = Model::new(Person).unwrap();
        person.validate(true, true);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = person
            .property_changed()
            .subscribe(move |args: &PropertyChangedArgs| {
                sink.lock().unwrap().push(args.name().to_owned());
            })
            .unwrap();
        person.set(&AGE, 500).unwrap();
        assert!(person.has_errors());
        assert!(seen.lock().unwrap().iter().any(|n| n == "HasErrors"));
    }

    #[test]
    fn suspended_validation_catches_up_on_resume() {
        let person = Model::new(Person).unwrap();
        person.validate(true, true);
        {
            let _token = person.suspend_validation(false);
            person.set(&AGE, 999).unwrap();
            person.validate(true, true);
            assert!(person.validation_context().field_results_for("Age").next().is_none());
        }
        assert!(!person.is_validated());
        assert!(person.has_errors());
    }

    #[test]
    fn hidden_results_are_empty() {
        let person = Model::builder(Person)
            .settings(crate::ModelSettings {
                hide_validation_results: true,
                ..crate::ModelSettings::default()
            })
            .build()
            .unwrap();
        person.set(&AGE, 999).unwrap();
        assert!(person.has_errors());
        assert!(person.get_errors(Some("Age")).is_empty());
        assert!(!person.validation_summary(false, None).has_errors());
    }

    static LEVEL: LazyLock<Property<i32>> = LazyLock::new(|| Property::register("Level", 0));

    fn check_level(model: &Model<impl ModelType>, results: &mut Vec<FieldValidationResult>) {
        if model.get(&LEVEL).unwrap_or_default() > 5 {
            results.push(FieldValidationResult::error("Level", "too high"));
        }
    }

    struct Gauge;

    impl ModelType for Gauge {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&LEVEL)?;
            Ok(())
        }

        fn validate_fields(model: &Model<Self>, results: &mut Vec<FieldValidationResult>) {
            check_level(model, results);
        }
    }

    static FAIL_NEXT_PASS: std::sync::atomic::AtomicBool =
        std::sync::atomic::AtomicBool::new(false);

    struct Flaky;

    impl ModelType for Flaky {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&LEVEL)?;
            Ok(())
        }

        fn validate_fields(model: &Model<Self>, results: &mut Vec<FieldValidationResult>) {
            if FAIL_NEXT_PASS.swap(false, std::sync::atomic::Ordering::SeqCst) {
                panic!("validation hook failed");
            }
            check_level(model, results);
        }
    }

    fn record_errors<M: ModelType>(
        model: &Model<M>,
    ) -> (Arc<Mutex<Vec<String>>>, understory_observable::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = model
            .errors_changed()
            .subscribe(move |args: &DataErrorsChangedArgs| {
                sink.lock().unwrap().push(args.property_name.to_string());
            })
            .unwrap();
        (seen, sub)
    }

    #[test]
    fn a_panicking_hook_does_not_wedge_validation() {
        let flaky = Model::new(Flaky).unwrap();
        FAIL_NEXT_PASS.store(true, std::sync::atomic::Ordering::SeqCst);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            flaky.validate(true, false);
        }));
        assert!(outcome.is_err());
        assert!(!flaky.inner.flags.contains(StateFlags::VALIDATING));

        flaky.set(&LEVEL, 10).unwrap();
        assert!(flaky.has_errors());
        assert!(flaky.is_validated());
    }

    #[test]
    fn a_panicking_handler_does_not_silence_later_announcements() {
        let person = Model::new(Person).unwrap();
        person.validate(true, true);

        let fail = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = person
            .errors_changed()
            .subscribe(move |args: &DataErrorsChangedArgs| {
                if fail.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    panic!("handler failed");
                }
                sink.lock().unwrap().push(args.property_name.to_string());
            })
            .unwrap();

        person.set(&AGE, -1).unwrap();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            person.validate(false, false);
        }));
        assert!(outcome.is_err());

        person.set(&AGE, 20).unwrap();
        person.validate(false, false);
        assert_eq!(*seen.lock().unwrap(), ["Age"]);
    }

    #[test]
    fn resuming_with_validation_runs_a_full_pass() {
        let gauge = Model::new(Gauge).unwrap();
        gauge.validate(true, true);
        let (seen, _sub) = record_errors(&gauge);

        let token = gauge.suspend_validation(true);
        gauge.set(&LEVEL, 10).unwrap();
        gauge.validate(true, true);
        assert!(seen.lock().unwrap().is_empty());
        assert!(!gauge.validation_context().has_errors());
        token.release();

        assert!(gauge.is_validated());
        assert!(gauge.validation_context().has_errors());
        assert_eq!(*seen.lock().unwrap(), ["Level"]);
    }

    #[test]
    fn automatic_validation_follows_each_change() {
        let gauge = Model::builder(Gauge)
            .settings(crate::ModelSettings {
                automatically_validate_on_property_changed: true,
                ..crate::ModelSettings::default()
            })
            .build()
            .unwrap();
        let (seen, _sub) = record_errors(&gauge);

        gauge.set(&LEVEL, 10).unwrap();
        assert!(gauge.is_validated());
        assert!(gauge.validation_context().has_errors());

        gauge.set(&LEVEL, 1).unwrap();
        assert!(gauge.is_validated());
        assert!(!gauge.validation_context().has_errors());
        assert_eq!(*seen.lock().unwrap(), ["Level", "Level"]);
    }
}
