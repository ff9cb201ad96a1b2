// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model errors.

use understory_property::PropertyError;

use crate::serialization::SerializationError;

/// A model operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The property contract of the type was violated.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// Saving or loading failed.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
