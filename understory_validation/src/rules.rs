// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Declarative per-property rules.
//!
//! Rules are attached to property metadata and evaluated by the annotation
//! pass of a validation run. A rule either accepts the value, rejects it with
//! a message, or reports that it cannot evaluate values of that kind at all;
//! the last case is a declaration problem and the model stops evaluating that
//! property's rules.
//!
//! ```rust
//! use understory_observable::Value;
//! use understory_validation::PropertyRule;
//!
//! let rule = PropertyRule::range(0.0, 150.0);
//! assert!(rule.validate("Age", &Value::Int(42)).unwrap().is_none());
//! assert!(rule.validate("Age", &Value::Int(-1)).unwrap().is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use understory_observable::{Value, ValueKind};

use crate::result::{FieldValidationResult, ValidationResultType};

/// A rule could not be evaluated against a value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// The rule does not apply to values of this kind.
    #[error("rule `{rule}` cannot evaluate a value of kind {kind:?}")]
    UnsupportedKind {
        /// Rule name.
        rule: &'static str,
        /// Offending kind.
        kind: ValueKind,
    },
}

/// A check over one property value.
pub trait ValueRule: Send + Sync + fmt::Debug {
    /// Short rule name for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns a failure message, or `None` if the value passes.
    fn check(&self, property: &str, value: &Value) -> Result<Option<String>, RuleError>;
}

/// A [`ValueRule`] together with the severity of its failures.
#[derive(Clone, Debug)]
pub struct PropertyRule {
    rule: Arc<dyn ValueRule>,
    severity: ValidationResultType,
}

impl PropertyRule {
    /// Wraps a rule; failures are errors.
    pub fn new(rule: impl ValueRule + 'static) -> Self {
        Self {
            rule: Arc::new(rule),
            severity: ValidationResultType::Error,
        }
    }

    /// The value must be present (not null, not empty).
    #[must_use]
    pub fn required() -> Self {
        Self::new(Required)
    }

    /// Numeric value within `min..=max`.
    #[must_use]
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(Range { min, max })
    }

    /// String, bytes or list length within `min..=max`.
    #[must_use]
    pub fn length(min: usize, max: usize) -> Self {
        Self::new(Length { min, max })
    }

    /// String matching `pattern`.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(Pattern {
            regex: Regex::new(pattern)?,
        }))
    }

    /// A rule from a closure returning a failure message.
    pub fn custom<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self::new(Custom {
            name,
            check: Box::new(check),
        })
    }

    /// Reports failures as warnings instead of errors.
    #[must_use]
    pub fn as_warning(mut self) -> Self {
        self.severity = ValidationResultType::Warning;
        self
    }

    /// The severity of failures.
    #[must_use]
    pub fn severity(&self) -> ValidationResultType {
        self.severity
    }

    /// The rule name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.rule.name()
    }

    /// Evaluates the rule for `property`.
    pub fn validate(
        &self,
        property: &str,
        value: &Value,
    ) -> Result<Option<FieldValidationResult>, RuleError> {
        Ok(self
            .rule
            .check(property, value)?
            .map(|message| FieldValidationResult::new(property, self.severity, message)))
    }
}

/// Evaluates every rule in `rules` against `value`.
///
/// Stops at the first rule that cannot evaluate the value.
pub fn validate_property(
    property: &str,
    value: &Value,
    rules: &[PropertyRule],
) -> Result<Vec<FieldValidationResult>, RuleError> {
    let mut results = Vec::new();
    for rule in rules {
        if let Some(result) = rule.validate(property, value)? {
            results.push(result);
        }
    }
    Ok(results)
}

/// Value must not be null or empty.
#[derive(Clone, Copy, Debug)]
pub struct Required;

impl ValueRule for Required {
    fn name(&self) -> &'static str {
        "required"
    }

    fn check(&self, property: &str, value: &Value) -> Result<Option<String>, RuleError> {
        let missing = match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::List(l) => l.is_empty(),
            _ => false,
        };
        Ok(missing.then(|| format!("{property} is required")))
    }
}

/// Numeric value within an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct Range {
    min: f64,
    max: f64,
}

impl ValueRule for Range {
    fn name(&self) -> &'static str {
        "range"
    }

    #[allow(clippy::cast_precision_loss, reason = "range bounds are floating point")]
    fn check(&self, property: &str, value: &Value) -> Result<Option<String>, RuleError> {
        let number = match value {
            Value::Null => return Ok(None),
            Value::Int(v) => *v as f64,
            Value::UInt(v) => *v as f64,
            Value::Float(v) => *v,
            other => {
                return Err(RuleError::UnsupportedKind {
                    rule: self.name(),
                    kind: other.kind(),
                });
            }
        };
        let inside = number >= self.min && number <= self.max;
        Ok((!inside).then(|| {
            format!(
                "{property} must be between {} and {}",
                self.min, self.max
            )
        }))
    }
}

/// Length within an inclusive range.
#[derive(Clone, Copy, Debug)]
pub struct Length {
    min: usize,
    max: usize,
}

impl ValueRule for Length {
    fn name(&self) -> &'static str {
        "length"
    }

    fn check(&self, property: &str, value: &Value) -> Result<Option<String>, RuleError> {
        let len = match value {
            Value::Null => return Ok(None),
            Value::String(s) => s.chars().count(),
            Value::Bytes(b) => b.len(),
            Value::List(l) => l.len(),
            other => {
                return Err(RuleError::UnsupportedKind {
                    rule: self.name(),
                    kind: other.kind(),
                });
            }
        };
        Ok((!(self.min..=self.max).contains(&len)).then(|| {
            format!(
                "{property} must have a length between {} and {}",
                self.min, self.max
            )
        }))
    }
}

/// String matching a regular expression.
#[derive(Clone, Debug)]
pub struct Pattern {
    regex: Regex,
}

impl ValueRule for Pattern {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn check(&self, property: &str, value: &Value) -> Result<Option<String>, RuleError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok((!self.regex.is_match(s))
                .then(|| format!("{property} does not match `{}`", self.regex.as_str()))),
            other => Err(RuleError::UnsupportedKind {
                rule: self.name(),
                kind: other.kind(),
            }),
        }
    }
}

type CheckFn = dyn Fn(&Value) -> Option<String> + Send + Sync;

struct Custom {
    name: &'static str,
    check: Box<CheckFn>,
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ValueRule for Custom {
    fn name(&self) -> &'static str {
        self.name
    }

    fn check(&self, _property: &str, value: &Value) -> Result<Option<String>, RuleError> {
        Ok((self.check)(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_null_and_blank() {
        let rule = PropertyRule::required();
        assert!(rule.validate("Name", &Value::Null).unwrap().is_some());
        assert!(rule.validate("Name", &Value::from("  ")).unwrap().is_some());
        assert!(rule.validate("Name", &Value::from("Ada")).unwrap().is_none());
        assert!(rule.validate("Age", &Value::Int(0)).unwrap().is_none());
    }

    #[test]
    fn range_checks_numbers_and_rejects_text() {
        let rule = PropertyRule::range(1.0, 10.0);
        assert!(rule.validate("N", &Value::UInt(10)).unwrap().is_none());
        assert!(rule.validate("N", &Value::Float(10.5)).unwrap().is_some());
        assert!(rule.validate("N", &Value::Null).unwrap().is_none());
        assert_eq!(
            rule.validate("N", &Value::from("x")),
            Err(RuleError::UnsupportedKind {
                rule: "range",
                kind: ValueKind::String
            })
        );
    }

    #[test]
    fn length_counts_chars() {
        let rule = PropertyRule::length(2, 3);
        assert!(rule.validate("S", &Value::from("né")).unwrap().is_none());
        assert!(rule.validate("S", &Value::from("abcd")).unwrap().is_some());
    }

    #[test]
    fn pattern_and_warning_severity() {
        let rule = PropertyRule::pattern(r"^\S+@\S+$").unwrap().as_warning();
        let result = rule
            .validate("Email", &Value::from("nope"))
            .unwrap()
            .unwrap();
        assert_eq!(result.result_type(), ValidationResultType::Warning);
        assert_eq!(result.property_name(), "Email");
        assert!(PropertyRule::pattern("(").is_err());
    }

    #[test]
    fn custom_rules_and_batch_evaluation() {
        let even = PropertyRule::custom("even", |v| match v {
            Value::Int(i) if i % 2 != 0 => Some("must be even".into()),
            _ => None,
        });
        let rules = [PropertyRule::required(), even];
        let results = validate_property("N", &Value::Int(3), &rules).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message(), "must be even");
    }
}
