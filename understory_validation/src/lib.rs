// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Validation: validation results and the validator contract.
//!
//! Validation results are data, not errors: a model can be invalid without
//! anything having gone wrong. This crate defines that data and the seams the
//! model layer calls into:
//!
//! - [`FieldValidationResult`] and [`BusinessRuleValidationResult`], tagged
//!   [`ValidationResultType::Warning`] or [`ValidationResultType::Error`].
//! - [`ValidationContext`], the mutable aggregation kept by each model, with
//!   [`ValidationContext::synchronize_with_context`] diffing a fresh pass
//!   against the previous one.
//! - [`ValidationSummary`], an immutable snapshot with optional tag filtering.
//! - [`Validator`], the ordered hook contract for external validators, and
//!   [`ValidatorProvider`] / [`ValidatorRegistry`] to look them up per type.
//! - [`PropertyRule`], declarative per-property rules evaluated by the
//!   annotation pass.
//!
//! ## Example
//!
//! ```rust
//! use understory_validation::{
//!     FieldValidationResult, ValidationContext, ValidationContextChangeType,
//! };
//!
//! let mut current = ValidationContext::new();
//! let mut fresh = ValidationContext::new();
//! fresh.add_field_validation_result(FieldValidationResult::error("Age", "too young"));
//!
//! let changes = current.synchronize_with_context(&fresh, false);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].change_type, ValidationContextChangeType::Added);
//! assert!(current.has_errors());
//! ```

mod context;
mod result;
mod rules;
mod summary;
mod validator;

pub use context::{ValidationContext, ValidationContextChange, ValidationContextChangeType};
pub use result::{
    BusinessRuleValidationResult, FieldValidationResult, ValidationResult, ValidationResultType,
};
pub use rules::{
    Length, Pattern, PropertyRule, Range, Required, RuleError, ValueRule, validate_property,
};
pub use summary::ValidationSummary;
pub use validator::{
    CompositeValidator, ValidationTarget, Validator, ValidatorProvider, ValidatorRegistry,
};
