// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Service lookup for model collaborators.
//!
//! Models resolve their equality comparer, validator provider and serializer
//! through a [`ServiceResolver`]. Services are registered as shared trait
//! objects keyed by the trait type:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use understory_model::{JsonSerializer, Serializer, ServiceResolver};
//!
//! let resolver = ServiceResolver::new();
//! resolver.register::<dyn Serializer>(Arc::new(JsonSerializer::new()));
//! assert!(resolver.resolve::<dyn Serializer>().is_some());
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use hashbrown::HashMap;

/// A registry of shared services keyed by type.
#[derive(Default)]
pub struct ServiceResolver {
    services: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

static GLOBAL: LazyLock<Arc<ServiceResolver>> = LazyLock::new(Arc::default);

impl ServiceResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide resolver used by models built without one.
    #[must_use]
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    /// Registers `service` as the implementation of `T`, replacing any
    /// previous one.
    pub fn register<T>(&self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let replaced = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(TypeId::of::<T>(), Box::new(service))
            .is_some();
        tracing::debug!(
            service = std::any::type_name::<T>(),
            replaced,
            "registered service"
        );
    }

    /// The implementation of `T`, if registered.
    #[must_use]
    pub fn resolve<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<T>())
            .and_then(|service| service.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Removes the implementation of `T`.
    pub fn unregister<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&TypeId::of::<T>())
            .is_some()
    }

    /// Whether `T` is registered.
    #[must_use]
    pub fn is_registered<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.read().map(|s| s.len()).unwrap_or_default();
        f.debug_struct("ServiceResolver")
            .field("services", &services)
            .finish()
    }
}
