// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mutable aggregation of validation results.
//!
//! A model keeps one long-lived [`ValidationContext`]. Each validation pass
//! fills a fresh context and then calls
//! [`ValidationContext::synchronize_with_context`] on the long-lived one; the
//! returned change list is what drives per-property error notifications.

use crate::result::{
    BusinessRuleValidationResult, FieldValidationResult, ValidationResult, ValidationResultType,
};

/// Whether a result appeared or disappeared during synchronization.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationContextChangeType {
    /// The result is new.
    Added,
    /// The result is gone.
    Removed,
}

/// One difference produced by [`ValidationContext::synchronize_with_context`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationContextChange {
    /// The result that changed.
    pub result: ValidationResult,
    /// What happened to it.
    pub change_type: ValidationContextChangeType,
}

/// Field and business-rule results of one model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationContext {
    field_results: Vec<FieldValidationResult>,
    business_rule_results: Vec<BusinessRuleValidationResult>,
}

impl ValidationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if any result has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Returns `true` if any result has warning severity.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Number of error results.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(ValidationResultType::Error)
    }

    /// Number of warning results.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(ValidationResultType::Warning)
    }

    fn count(&self, kind: ValidationResultType) -> usize {
        self.field_results
            .iter()
            .filter(|r| r.result_type() == kind)
            .count()
            + self
                .business_rule_results
                .iter()
                .filter(|r| r.result_type() == kind)
                .count()
    }

    /// All field results.
    #[must_use]
    pub fn field_results(&self) -> &[FieldValidationResult] {
        &self.field_results
    }

    /// All business-rule results.
    #[must_use]
    pub fn business_rule_results(&self) -> &[BusinessRuleValidationResult] {
        &self.business_rule_results
    }

    /// Field results for `property_name`.
    pub fn field_results_for<'a>(
        &'a self,
        property_name: &'a str,
    ) -> impl Iterator<Item = &'a FieldValidationResult> + 'a {
        self.field_results
            .iter()
            .filter(move |r| r.property_name() == property_name)
    }

    /// Field results for `property_name` with severity `kind`.
    pub fn field_results_of<'a>(
        &'a self,
        property_name: &'a str,
        kind: ValidationResultType,
    ) -> impl Iterator<Item = &'a FieldValidationResult> + 'a {
        self.field_results_for(property_name)
            .filter(move |r| r.result_type() == kind)
    }

    /// Business-rule results with severity `kind`.
    pub fn business_rule_results_of(
        &self,
        kind: ValidationResultType,
    ) -> impl Iterator<Item = &BusinessRuleValidationResult> + '_ {
        self.business_rule_results
            .iter()
            .filter(move |r| r.result_type() == kind)
    }

    /// Adds a field result.
    pub fn add_field_validation_result(&mut self, result: FieldValidationResult) {
        self.field_results.push(result);
    }

    /// Adds a business-rule result.
    pub fn add_business_rule_validation_result(&mut self, result: BusinessRuleValidationResult) {
        self.business_rule_results.push(result);
    }

    /// Removes every field result for `property_name`.
    pub fn remove_field_validation_results(&mut self, property_name: &str) {
        self.field_results
            .retain(|r| r.property_name() != property_name);
    }

    /// Removes every result.
    pub fn clear(&mut self) {
        self.field_results.clear();
        self.business_rule_results.clear();
    }

    /// Makes `self` match `other` and reports the differences.
    ///
    /// Results present here but absent from `other` are removed, unless
    /// `only_add` is set; results present in `other` but absent here are
    /// added. Results are matched by value, each occurrence at most once.
    pub fn synchronize_with_context(
        &mut self,
        other: &Self,
        only_add: bool,
    ) -> Vec<ValidationContextChange> {
        let mut changes = Vec::new();
        sync_list(
            &mut self.field_results,
            &other.field_results,
            only_add,
            ValidationResult::Field,
            &mut changes,
        );
        sync_list(
            &mut self.business_rule_results,
            &other.business_rule_results,
            only_add,
            ValidationResult::BusinessRule,
            &mut changes,
        );
        changes
    }
}

fn sync_list<T: Clone + PartialEq>(
    current: &mut Vec<T>,
    target: &[T],
    only_add: bool,
    wrap: fn(T) -> ValidationResult,
    changes: &mut Vec<ValidationContextChange>,
) {
    let mut unmatched: Vec<Option<&T>> = target.iter().map(Some).collect();
    let mut kept = Vec::with_capacity(current.len());

    for existing in current.drain(..) {
        let matched = unmatched
            .iter_mut()
            .find(|slot| slot.is_some_and(|t| *t == existing))
            .map(Option::take);
        if matched.is_some() || only_add {
            kept.push(existing);
        } else {
            changes.push(ValidationContextChange {
                result: wrap(existing),
                change_type: ValidationContextChangeType::Removed,
            });
        }
    }

    for added in unmatched.into_iter().flatten() {
        kept.push(added.clone());
        changes.push(ValidationContextChange {
            result: wrap(added.clone()),
            change_type: ValidationContextChangeType::Added,
        });
    }

    *current = kept;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(fields: &[FieldValidationResult]) -> ValidationContext {
        let mut ctx = ValidationContext::new();
        for f in fields {
            ctx.add_field_validation_result(f.clone());
        }
        ctx
    }

    #[test]
    fn counts_by_severity() {
        let mut c = ctx(&[
            FieldValidationResult::error("Age", "too young"),
            FieldValidationResult::warning("Name", "short"),
        ]);
        c.add_business_rule_validation_result(BusinessRuleValidationResult::error("bad"));
        assert_eq!(c.error_count(), 2);
        assert_eq!(c.warning_count(), 1);
        assert_eq!(c.field_results_for("Age").count(), 1);
        assert_eq!(
            c.field_results_of("Name", ValidationResultType::Error).count(),
            0
        );
    }

    #[test]
    fn synchronize_reports_only_differences() {
        let keep = FieldValidationResult::error("Age", "too young");
        let gone = FieldValidationResult::error("Name", "required");
        let new = FieldValidationResult::warning("Email", "unverified");

        let mut current = ctx(&[keep.clone(), gone.clone()]);
        let fresh = ctx(&[keep.clone(), new.clone()]);
        let changes = current.synchronize_with_context(&fresh, false);

        assert_eq!(
            changes,
            vec![
                ValidationContextChange {
                    result: ValidationResult::Field(gone),
                    change_type: ValidationContextChangeType::Removed,
                },
                ValidationContextChange {
                    result: ValidationResult::Field(new),
                    change_type: ValidationContextChangeType::Added,
                },
            ]
        );
        assert_eq!(current, fresh);
    }

    #[test]
    fn only_add_keeps_stale_results() {
        let old = FieldValidationResult::error("Age", "too young");
        let mut current = ctx(&[old.clone()]);
        let changes = current.synchronize_with_context(&ValidationContext::new(), true);
        assert!(changes.is_empty());
        assert_eq!(current.field_results(), [old]);
    }

    #[test]
    fn duplicates_match_once() {
        let dup = FieldValidationResult::error("Age", "x");
        let mut current = ctx(&[dup.clone()]);
        let fresh = ctx(&[dup.clone(), dup.clone()]);
        let changes = current.synchronize_with_context(&fresh, false);
        assert_eq!(changes.len(), 1);
        assert_eq!(current.field_results().len(), 2);
    }
}
