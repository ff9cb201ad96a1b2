// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The validator contract and validator lookup.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use understory_observable::Value;

use crate::context::ValidationContext;
use crate::result::{BusinessRuleValidationResult, FieldValidationResult};

/// The object being validated, as seen by a [`Validator`].
pub trait ValidationTarget: Send + Sync {
    /// The concrete type of the target, used to look up validators.
    fn target_type(&self) -> TypeId;

    /// A readable type name for diagnostics.
    fn target_type_name(&self) -> &'static str;

    /// Reads a property by name.
    fn property_value(&self, name: &str) -> Option<Value>;

    /// The target as `Any`, for validators that know the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// External validation logic, invoked through ordered hooks.
///
/// One validation pass calls, in order: [`before_validation`],
/// [`before_validate_fields`], [`validate_fields`], [`after_validate_fields`],
/// [`before_validate_business_rules`], [`validate_business_rules`],
/// [`after_validate_business_rules`], [`validate`], [`after_validation`].
/// Every hook defaults to doing nothing.
///
/// [`before_validation`]: Validator::before_validation
/// [`before_validate_fields`]: Validator::before_validate_fields
/// [`validate_fields`]: Validator::validate_fields
/// [`after_validate_fields`]: Validator::after_validate_fields
/// [`before_validate_business_rules`]: Validator::before_validate_business_rules
/// [`validate_business_rules`]: Validator::validate_business_rules
/// [`after_validate_business_rules`]: Validator::after_validate_business_rules
/// [`validate`]: Validator::validate
/// [`after_validation`]: Validator::after_validation
#[allow(unused_variables, reason = "default hooks ignore their arguments")]
pub trait Validator: Send + Sync {
    /// Runs before anything else.
    fn before_validation(
        &self,
        target: &dyn ValidationTarget,
        previous_fields: &[FieldValidationResult],
        previous_business_rules: &[BusinessRuleValidationResult],
    ) {
    }

    /// Runs before field validation.
    fn before_validate_fields(
        &self,
        target: &dyn ValidationTarget,
        previous_fields: &[FieldValidationResult],
    ) {
    }

    /// Adds field results.
    fn validate_fields(
        &self,
        target: &dyn ValidationTarget,
        results: &mut Vec<FieldValidationResult>,
    ) {
    }

    /// Runs after field validation.
    fn after_validate_fields(
        &self,
        target: &dyn ValidationTarget,
        results: &[FieldValidationResult],
    ) {
    }

    /// Runs before business-rule validation.
    fn before_validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        previous_business_rules: &[BusinessRuleValidationResult],
    ) {
    }

    /// Adds business-rule results.
    fn validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        results: &mut Vec<BusinessRuleValidationResult>,
    ) {
    }

    /// Runs after business-rule validation.
    fn after_validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        results: &[BusinessRuleValidationResult],
    ) {
    }

    /// Sees (and may edit) the complete fresh context.
    fn validate(&self, target: &dyn ValidationTarget, context: &mut ValidationContext) {}

    /// Runs last.
    fn after_validation(
        &self,
        target: &dyn ValidationTarget,
        fields: &[FieldValidationResult],
        business_rules: &[BusinessRuleValidationResult],
    ) {
    }
}

/// Resolves the validator for a model type.
pub trait ValidatorProvider: Send + Sync {
    /// Returns the validator for `target_type`, if any.
    fn get_validator(&self, target_type: TypeId) -> Option<Arc<dyn Validator>>;
}

/// Runs several validators as one, in registration order.
#[derive(Clone, Default)]
pub struct CompositeValidator {
    validators: Vec<Arc<dyn Validator>>,
}

impl CompositeValidator {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a validator.
    pub fn add(&mut self, validator: Arc<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Number of validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns `true` if no validator is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for CompositeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValidator")
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Validator for CompositeValidator {
    fn before_validation(
        &self,
        target: &dyn ValidationTarget,
        previous_fields: &[FieldValidationResult],
        previous_business_rules: &[BusinessRuleValidationResult],
    ) {
        for v in &self.validators {
            v.before_validation(target, previous_fields, previous_business_rules);
        }
    }

    fn before_validate_fields(
        &self,
        target: &dyn ValidationTarget,
        previous_fields: &[FieldValidationResult],
    ) {
        for v in &self.validators {
            v.before_validate_fields(target, previous_fields);
        }
    }

    fn validate_fields(
        &self,
        target: &dyn ValidationTarget,
        results: &mut Vec<FieldValidationResult>,
    ) {
        for v in &self.validators {
            v.validate_fields(target, results);
        }
    }

    fn after_validate_fields(
        &self,
        target: &dyn ValidationTarget,
        results: &[FieldValidationResult],
    ) {
        for v in &self.validators {
            v.after_validate_fields(target, results);
        }
    }

    fn before_validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        previous_business_rules: &[BusinessRuleValidationResult],
    ) {
        for v in &self.validators {
            v.before_validate_business_rules(target, previous_business_rules);
        }
    }

    fn validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        results: &mut Vec<BusinessRuleValidationResult>,
    ) {
        for v in &self.validators {
            v.validate_business_rules(target, results);
        }
    }

    fn after_validate_business_rules(
        &self,
        target: &dyn ValidationTarget,
        results: &[BusinessRuleValidationResult],
    ) {
        for v in &self.validators {
            v.after_validate_business_rules(target, results);
        }
    }

    fn validate(&self, target: &dyn ValidationTarget, context: &mut ValidationContext) {
        for v in &self.validators {
            v.validate(target, context);
        }
    }

    fn after_validation(
        &self,
        target: &dyn ValidationTarget,
        fields: &[FieldValidationResult],
        business_rules: &[BusinessRuleValidationResult],
    ) {
        for v in &self.validators {
            v.after_validation(target, fields, business_rules);
        }
    }
}

/// A [`ValidatorProvider`] backed by explicit per-type registration.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: RwLock<HashMap<TypeId, Vec<Arc<dyn Validator>>>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `validator` for targets of type `T`.
    pub fn register<T: Any>(&self, validator: Arc<dyn Validator>) {
        self.register_for(TypeId::of::<T>(), validator);
    }

    /// Registers `validator` for targets whose type id is `target_type`.
    pub fn register_for(&self, target_type: TypeId, validator: Arc<dyn Validator>) {
        let mut map = self
            .validators
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let list = map.entry(target_type).or_default();
        list.push(validator);
        tracing::debug!(?target_type, count = list.len(), "registered validator");
    }

    /// Removes every validator registered for `T`.
    pub fn clear<T: Any>(&self) {
        self.validators
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&TypeId::of::<T>());
    }
}

impl ValidatorProvider for ValidatorRegistry {
    fn get_validator(&self, target_type: TypeId) -> Option<Arc<dyn Validator>> {
        let map = self
            .validators
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match map.get(&target_type)?.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => {
                let mut composite = CompositeValidator::new();
                for v in many {
                    composite.add(v.clone());
                }
                Some(Arc::new(composite))
            }
        }
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self
            .validators
            .read()
            .map(|m| m.len())
            .unwrap_or_default();
        f.debug_struct("ValidatorRegistry")
            .field("types", &types)
            .finish()
    }
}
