// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-type model behaviour switches.

use serde::{Deserialize, Serialize};

/// Behaviour switches shared by every instance of a model type.
///
/// A type supplies its settings through
/// [`ModelType::settings`](crate::ModelType::settings); a single instance can
/// override them with [`ModelBuilder::settings`](crate::ModelBuilder::settings).
///
/// Settings can also be read from JSON. Missing keys take their defaults:
///
/// ```rust
/// use understory_model::ModelSettings;
///
/// let settings = ModelSettings::from_json(r#"{ "always_invoke_notify_changed": true }"#).unwrap();
/// assert!(settings.always_invoke_notify_changed);
/// assert!(settings.validate_using_annotations);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Raise property-changed even when a set stores an equal value.
    pub always_invoke_notify_changed: bool,
    /// Run a full validation after every user property change.
    pub automatically_validate_on_property_changed: bool,
    /// Evaluate the declared property rules.
    pub validate_using_annotations: bool,
    /// Make the data-error queries report nothing.
    pub hide_validation_results: bool,
    /// Watch property values that raise change notifications.
    pub handle_child_changes: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            always_invoke_notify_changed: false,
            automatically_validate_on_property_changed: false,
            validate_using_annotations: true,
            hide_validation_results: false,
            handle_child_changes: true,
        }
    }
}

impl ModelSettings {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
