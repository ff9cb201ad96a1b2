// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property system errors.
//!
//! Every variant is a shape violation by calling code (wrong name, wrong type,
//! bad declaration). Runtime data conditions are never reported here.

use understory_observable::ValueKind;

/// A property access or declaration broke the type's property contract.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// No property of that name is registered on the type.
    #[error("property `{property}` is not registered on `{type_name}`")]
    NotRegistered {
        /// Owning type.
        type_name: &'static str,
        /// Requested property.
        property: String,
    },
    /// A property of that name is already registered on the type.
    #[error("property `{property}` is already registered on `{type_name}`")]
    AlreadyRegistered {
        /// Owning type.
        type_name: &'static str,
        /// Duplicate property.
        property: String,
    },
    /// Null was assigned to a property that does not accept it.
    #[error("property `{property}` on `{type_name}` is not nullable")]
    NotNullable {
        /// Owning type.
        type_name: &'static str,
        /// Target property.
        property: String,
    },
    /// The value's kind does not match the declared property type.
    #[error(
        "cannot assign a value of kind {actual:?} to property `{property}` of type `{expected}` on `{type_name}`"
    )]
    InvalidPropertyValue {
        /// Owning type.
        type_name: &'static str,
        /// Target property.
        property: String,
        /// Declared Rust type.
        expected: &'static str,
        /// Kind of the rejected value.
        actual: ValueKind,
    },
    /// A typed bag saw a value of a different kind than the first write.
    #[error("bag entry `{property}` holds {expected:?} values, got {actual:?}")]
    InvalidValueType {
        /// Entry name.
        property: String,
        /// Kind recorded on first write.
        expected: ValueKind,
        /// Kind of the rejected value.
        actual: ValueKind,
    },
    /// The type's property declarations are malformed.
    #[error("invalid declaration of `{property}` on `{type_name}`: {reason}")]
    InvalidDeclaration {
        /// Owning type.
        type_name: &'static str,
        /// Offending property.
        property: String,
        /// What is wrong.
        reason: &'static str,
    },
}
