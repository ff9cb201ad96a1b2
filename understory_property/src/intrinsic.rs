// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Properties owned by the model infrastructure.
//!
//! Every layer consults [`IntrinsicProperty`] to decide whether a change
//! counts as user data. Intrinsic properties never mark a model dirty, never
//! trigger validation and are skipped by equality, serialization, backup and
//! annotation validation.

use std::sync::LazyLock;

use crate::id::Property;
use crate::metadata::PropertyDataBuilder;

/// The canonical set of infrastructure properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntrinsicProperty {
    /// Unsaved changes exist.
    IsDirty,
    /// Writes are rejected.
    IsReadOnly,
    /// The validation context holds errors.
    HasErrors,
    /// The validation context holds warnings.
    HasWarnings,
}

impl IntrinsicProperty {
    /// Every intrinsic property.
    pub const ALL: [Self; 4] = [
        Self::IsDirty,
        Self::IsReadOnly,
        Self::HasErrors,
        Self::HasWarnings,
    ];

    /// The property name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IsDirty => "IsDirty",
            Self::IsReadOnly => "IsReadOnly",
            Self::HasErrors => "HasErrors",
            Self::HasWarnings => "HasWarnings",
        }
    }

    /// Looks up an intrinsic property by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Whether the value lives in the property bag.
    ///
    /// The validation flags are computed from the validation context.
    #[must_use]
    pub const fn is_stored(self) -> bool {
        matches!(self, Self::IsDirty | Self::IsReadOnly)
    }
}

/// Returns `true` if `name` is an intrinsic property.
#[must_use]
pub fn is_intrinsic(name: &str) -> bool {
    IntrinsicProperty::from_name(name).is_some()
}

/// The stored dirty flag, registered on every model type.
pub static IS_DIRTY_PROPERTY: LazyLock<Property<bool>> =
    LazyLock::new(|| framework_flag(IntrinsicProperty::IsDirty));

/// The stored read-only flag, registered on every model type.
pub static IS_READ_ONLY_PROPERTY: LazyLock<Property<bool>> =
    LazyLock::new(|| framework_flag(IntrinsicProperty::IsReadOnly));

fn framework_flag(property: IntrinsicProperty) -> Property<bool> {
    PropertyDataBuilder::new(property.name(), false)
        .framework()
        .include_in_serialization(false)
        .include_in_backup(false)
        .build()
}
