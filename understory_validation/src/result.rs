// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validation result records.

use std::fmt;
use std::sync::Arc;

/// Severity of a validation result.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationResultType {
    /// Informational problem; the model is still considered valid.
    Warning,
    /// The model is invalid.
    Error,
}

/// A result attached to one property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldValidationResult {
    property_name: Arc<str>,
    result_type: ValidationResultType,
    message: String,
    tag: Option<Arc<str>>,
}

impl FieldValidationResult {
    /// Creates a result.
    pub fn new(
        property_name: impl Into<Arc<str>>,
        result_type: ValidationResultType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            result_type,
            message: message.into(),
            tag: None,
        }
    }

    /// Creates an error for `property_name`.
    pub fn error(property_name: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self::new(property_name, ValidationResultType::Error, message)
    }

    /// Creates a warning for `property_name`.
    pub fn warning(property_name: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self::new(property_name, ValidationResultType::Warning, message)
    }

    /// Attaches a tag used to filter summaries.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The property this result belongs to.
    #[must_use]
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    /// Severity.
    #[must_use]
    pub fn result_type(&self) -> ValidationResultType {
        self.result_type
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Optional tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for FieldValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_name, self.message)
    }
}

/// A result attached to the model as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BusinessRuleValidationResult {
    result_type: ValidationResultType,
    message: String,
    tag: Option<Arc<str>>,
    related_properties: Vec<Arc<str>>,
}

impl BusinessRuleValidationResult {
    /// Creates a result.
    pub fn new(result_type: ValidationResultType, message: impl Into<String>) -> Self {
        Self {
            result_type,
            message: message.into(),
            tag: None,
            related_properties: Vec::new(),
        }
    }

    /// Creates an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ValidationResultType::Error, message)
    }

    /// Creates a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ValidationResultType::Warning, message)
    }

    /// Attaches a tag used to filter summaries.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Names properties involved in the rule.
    #[must_use]
    pub fn with_related_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.related_properties = names.into_iter().map(Into::into).collect();
        self
    }

    /// Severity.
    #[must_use]
    pub fn result_type(&self) -> ValidationResultType {
        self.result_type
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Optional tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Properties involved in the rule.
    #[must_use]
    pub fn related_properties(&self) -> &[Arc<str>] {
        &self.related_properties
    }
}

impl fmt::Display for BusinessRuleValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Either kind of result.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidationResult {
    /// A field result.
    Field(FieldValidationResult),
    /// A business-rule result.
    BusinessRule(BusinessRuleValidationResult),
}

impl ValidationResult {
    /// Severity.
    #[must_use]
    pub fn result_type(&self) -> ValidationResultType {
        match self {
            Self::Field(r) => r.result_type(),
            Self::BusinessRule(r) => r.result_type(),
        }
    }

    /// Message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Field(r) => r.message(),
            Self::BusinessRule(r) => r.message(),
        }
    }

    /// The property name for field results, `""` for business rules.
    #[must_use]
    pub fn property_name(&self) -> &str {
        match self {
            Self::Field(r) => r.property_name(),
            Self::BusinessRule(_) => "",
        }
    }

    /// Optional tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Field(r) => r.tag(),
            Self::BusinessRule(r) => r.tag(),
        }
    }
}
