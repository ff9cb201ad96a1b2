// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point-in-time snapshot of a [`ValidationContext`].

use crate::context::ValidationContext;
use crate::result::{BusinessRuleValidationResult, FieldValidationResult, ValidationResultType};

/// Immutable copy of a context's results, split by kind and severity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    field_errors: Vec<FieldValidationResult>,
    field_warnings: Vec<FieldValidationResult>,
    business_rule_errors: Vec<BusinessRuleValidationResult>,
    business_rule_warnings: Vec<BusinessRuleValidationResult>,
}

impl ValidationSummary {
    /// Snapshots every result of `context`.
    #[must_use]
    pub fn new(context: &ValidationContext) -> Self {
        Self::filtered(context, None)
    }

    /// Snapshots the results of `context` carrying `tag`.
    ///
    /// With `None`, every result is included.
    #[must_use]
    pub fn filtered(context: &ValidationContext, tag: Option<&str>) -> Self {
        let keep = |t: Option<&str>| tag.is_none() || t == tag;
        let mut summary = Self::default();
        for r in context.field_results().iter().filter(|r| keep(r.tag())) {
            match r.result_type() {
                ValidationResultType::Error => summary.field_errors.push(r.clone()),
                ValidationResultType::Warning => summary.field_warnings.push(r.clone()),
            }
        }
        for r in context
            .business_rule_results()
            .iter()
            .filter(|r| keep(r.tag()))
        {
            match r.result_type() {
                ValidationResultType::Error => summary.business_rule_errors.push(r.clone()),
                ValidationResultType::Warning => summary.business_rule_warnings.push(r.clone()),
            }
        }
        summary
    }

    /// Appends the results of `other`.
    pub fn merge(&mut self, other: Self) {
        self.field_errors.extend(other.field_errors);
        self.field_warnings.extend(other.field_warnings);
        self.business_rule_errors.extend(other.business_rule_errors);
        self.business_rule_warnings
            .extend(other.business_rule_warnings);
    }

    /// Returns `true` if any error is present.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty() || !self.business_rule_errors.is_empty()
    }

    /// Returns `true` if any warning is present.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.field_warnings.is_empty() || !self.business_rule_warnings.is_empty()
    }

    /// Field errors.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldValidationResult] {
        &self.field_errors
    }

    /// Field warnings.
    #[must_use]
    pub fn field_warnings(&self) -> &[FieldValidationResult] {
        &self.field_warnings
    }

    /// Business-rule errors.
    #[must_use]
    pub fn business_rule_errors(&self) -> &[BusinessRuleValidationResult] {
        &self.business_rule_errors
    }

    /// Business-rule warnings.
    #[must_use]
    pub fn business_rule_warnings(&self) -> &[BusinessRuleValidationResult] {
        &self.business_rule_warnings
    }
}
