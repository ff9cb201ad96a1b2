// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Model equality and hashing through a pluggable comparer.
//!
//! [`Model`] implements `PartialEq`, `Eq` and `Hash` by asking the
//! [`ModelEqualityComparer`] registered in its resolver, falling back to
//! [`DefaultModelEqualityComparer::default`], which compares identity only.
//!
//! The hash of a model is computed once and cached. Do not change
//! equality-relevant properties of a model while it is used as a hash key.

use std::any::TypeId;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use understory_observable::Value;
use understory_property::{PropertyBagStore, is_intrinsic};

use crate::model::{Model, ModelType};

/// The view of a model an equality comparer works on.
pub trait EquatableModel {
    /// The model type.
    fn model_type(&self) -> TypeId;

    /// A stable identity of the instance.
    fn identity(&self) -> usize;

    /// The non-intrinsic property values, in declaration order.
    fn comparable_values(&self) -> Vec<(Arc<str>, Value)>;
}

/// Decides model equality and hashing.
pub trait ModelEqualityComparer: Send + Sync {
    /// Whether `left` and `right` are equal.
    fn equals(&self, left: &dyn EquatableModel, right: &dyn EquatableModel) -> bool;

    /// A hash consistent with [`ModelEqualityComparer::equals`].
    fn hash(&self, model: &dyn EquatableModel) -> u64;
}

/// The built-in comparer.
///
/// With every switch off (the default) two models are equal only if they are
/// the same instance. With `compare_properties`, models of the same type are
/// compared property by property: plain values when `compare_values` is set,
/// collection contents when `compare_collections` is set. Other object values
/// always compare by identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultModelEqualityComparer {
    /// Compare property values at all.
    pub compare_properties: bool,
    /// Compare non-collection values.
    pub compare_values: bool,
    /// Compare collection values item by item.
    pub compare_collections: bool,
}

impl DefaultModelEqualityComparer {
    /// A comparer that compares values and collections.
    #[must_use]
    pub fn by_value() -> Self {
        Self {
            compare_properties: true,
            compare_values: true,
            compare_collections: true,
        }
    }

    fn value_equals(&self, left: &Value, right: &Value) -> bool {
        match (collection_items(left), collection_items(right)) {
            (Some(a), Some(b)) => {
                !self.compare_collections
                    || (a.len() == b.len() && a.iter().zip(&b).all(|(x, y)| x == y))
            }
            (None, None) => !self.compare_values || left == right,
            _ => false,
        }
    }

    fn hash_value(&self, value: &Value, state: &mut DefaultHasher) {
        if let Some(items) = collection_items(value) {
            if self.compare_collections {
                items.len().hash(state);
                for item in &items {
                    hash_plain(item, state);
                }
            }
        } else if self.compare_values {
            hash_plain(value, state);
        }
    }
}

impl ModelEqualityComparer for DefaultModelEqualityComparer {
    fn equals(&self, left: &dyn EquatableModel, right: &dyn EquatableModel) -> bool {
        if left.identity() == right.identity() {
            return true;
        }
        if !self.compare_properties || left.model_type() != right.model_type() {
            return false;
        }
        let (l, r) = (left.comparable_values(), right.comparable_values());
        l.len() == r.len()
            && l
                .iter()
                .zip(&r)
                .all(|((ln, lv), (rn, rv))| ln == rn && self.value_equals(lv, rv))
    }

    fn hash(&self, model: &dyn EquatableModel) -> u64 {
        let mut state = DefaultHasher::new();
        if self.compare_properties {
            model.model_type().hash(&mut state);
            for (name, value) in model.comparable_values() {
                name.hash(&mut state);
                self.hash_value(&value, &mut state);
            }
        } else {
            model.identity().hash(&mut state);
        }
        state.finish()
    }
}

fn collection_items(value: &Value) -> Option<Vec<Value>> {
    value.as_object()?.get().collection_items()
}

fn hash_plain(value: &Value, state: &mut DefaultHasher) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(v) => v.hash(state),
        Value::Int(v) => v.hash(state),
        Value::UInt(v) => v.hash(state),
        Value::Float(v) => v.to_bits().hash(state),
        Value::Char(v) => v.hash(state),
        Value::String(v) => v.hash(state),
        Value::Bytes(v) => v.hash(state),
        Value::List(items) => {
            items.len().hash(state);
            for item in items {
                hash_plain(item, state);
            }
        }
        Value::Map(entries) => {
            for (name, item) in entries {
                name.hash(state);
                hash_plain(item, state);
            }
        }
        Value::Object(object) => object.id().hash(state),
    }
}

impl<M: ModelType> EquatableModel for Model<M> {
    fn model_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner).addr()
    }

    fn comparable_values(&self) -> Vec<(Arc<str>, Value)> {
        self.type_info()
            .get_properties()
            .into_iter()
            .filter(|data| !is_intrinsic(data.name()))
            .map(|data| (data.shared_name().clone(), self.read(&data)))
            .collect()
    }
}

impl<M: ModelType> Model<M> {
    fn comparer(&self) -> Arc<dyn ModelEqualityComparer> {
        self.resolver()
            .resolve::<dyn ModelEqualityComparer>()
            .unwrap_or_else(|| Arc::new(DefaultModelEqualityComparer::default()))
    }

    /// The hash of this model, computed once.
    #[must_use]
    pub fn cached_hash(&self) -> u64 {
        *self
            .inner
            .hash
            .get_or_init(|| ModelEqualityComparer::hash(&*self.comparer(), self))
    }
}

impl<M: ModelType> PartialEq for Model<M> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.comparer().equals(self, other)
    }
}

impl<M: ModelType> Eq for Model<M> {}

impl<M: ModelType> Hash for Model<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.cached_hash());
    }
}
