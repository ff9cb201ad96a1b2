// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tagged property values.
//!
//! [`Value`] is the storage representation for every property. Primitive
//! kinds are held inline; shared objects (child models, collections, anything
//! implementing [`ObjectValue`]) are held through an [`ObjectRef`].
//!
//! Typed access goes through [`PropertyValue`], which converts between a
//! concrete Rust type and its tagged form and decides which tagged values a
//! property of that type accepts.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::args::{CollectionChangedArgs, PropertyChangedArgs};
use crate::event::Event;

/// The kind of a [`Value`], used as a type token by property metadata.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// No value.
    Null,
    /// `bool`.
    Bool,
    /// Signed integers.
    Int,
    /// Unsigned integers.
    UInt,
    /// Floating point numbers.
    Float,
    /// `char`.
    Char,
    /// Strings.
    String,
    /// Raw bytes.
    Bytes,
    /// Ordered list of values.
    List,
    /// Ordered name/value pairs.
    Map,
    /// Shared object reference.
    Object,
    /// Any kind (dynamic properties).
    Any,
}

/// A tagged property value.
#[derive(Clone, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A floating point number.
    Float(f64),
    /// A character.
    Char(char),
    /// A shared string.
    String(Arc<str>),
    /// Shared raw bytes.
    Bytes(Arc<[u8]>),
    /// A list of values.
    List(Vec<Value>),
    /// Name/value pairs, typically the snapshot of an object.
    Map(Vec<(Arc<str>, Value)>),
    /// A shared object.
    Object(ObjectRef),
}

impl Value {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Float(_) => ValueKind::Float,
            Self::Char(_) => ValueKind::Char,
            Self::String(_) => ValueKind::String,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Object(_) => ValueKind::Object,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object reference, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Identity-or-value comparison used for change detection.
    ///
    /// Primitives compare by value (floats bitwise, so `NaN` equals itself),
    /// objects compare by identity.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::String(a), Self::String(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Bytes(a), Self::Bytes(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_as(vb))
            }
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::UInt(v) => write!(f, "UInt({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Char(v) => write!(f, "Char({v:?})"),
            Self::String(v) => write!(f, "String({v:?})"),
            Self::Bytes(v) => write!(f, "Bytes(len={})", v.len()),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Self::Object(v) => f.debug_tuple("Object").field(v).finish(),
        }
    }
}

/// Blanket `Any` access for [`ObjectValue`] implementors.
pub trait AsAny: Any + Send + Sync {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Converts a shared pointer to `Arc<dyn Any>` for downcasting.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// An object that can be stored in a [`Value`].
///
/// The notification capabilities are optional: an object exposes a
/// property-changed event, a collection-changed event, both or neither.
pub trait ObjectValue: AsAny + fmt::Debug {
    /// A readable type name for diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// The property-changed event, if the object raises one.
    fn property_changed(&self) -> Option<&Event<PropertyChangedArgs>> {
        None
    }

    /// The collection-changed event, if the object is an observable collection.
    fn collection_changed(&self) -> Option<&Event<CollectionChangedArgs>> {
        None
    }

    /// The current items, if the object is a collection.
    fn collection_items(&self) -> Option<Vec<Value>> {
        None
    }

    /// A serializable snapshot of the object, if it has one.
    ///
    /// The snapshot is shallow: nested objects stay [`Value::Object`] and are
    /// expanded by the caller, which is responsible for detecting cycles.
    fn snapshot(&self) -> Option<Value> {
        None
    }
}

/// A shared reference to an [`ObjectValue`].
#[derive(Clone)]
pub struct ObjectRef(Arc<dyn ObjectValue>);

impl ObjectRef {
    /// Wraps a shared object.
    #[must_use]
    pub fn new<T: ObjectValue>(object: Arc<T>) -> Self {
        Self(object)
    }

    /// Wraps an already type-erased object.
    #[must_use]
    pub fn from_dyn(object: Arc<dyn ObjectValue>) -> Self {
        Self(object)
    }

    /// A stable identity for the lifetime of the object.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Returns `true` if both references point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }

    /// Creates a non-owning reference.
    #[must_use]
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef {
            id: self.id(),
            weak: Arc::downgrade(&self.0),
        }
    }

    /// Returns the erased object.
    #[must_use]
    pub fn get(&self) -> &dyn ObjectValue {
        &*self.0
    }

    /// Returns `true` if the object is a `T`.
    #[must_use]
    pub fn is<T: ObjectValue>(&self) -> bool {
        AsAny::as_any(&*self.0).type_id() == TypeId::of::<T>()
    }

    /// Borrows the object as a `T`.
    #[must_use]
    pub fn downcast_ref<T: ObjectValue>(&self) -> Option<&T> {
        AsAny::as_any(&*self.0).downcast_ref()
    }

    /// Returns a typed shared pointer to the object.
    #[must_use]
    pub fn downcast<T: ObjectValue>(&self) -> Option<Arc<T>> {
        AsAny::into_any_arc(self.0.clone()).downcast().ok()
    }

    /// Returns `true` if the object raises property or collection changes.
    #[must_use]
    pub fn is_observable(&self) -> bool {
        self.0.property_changed().is_some() || self.0.collection_changed().is_some()
    }

    /// Returns `true` if the object is a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.0.collection_changed().is_some() || self.0.collection_items().is_some()
    }

    /// Returns the number of strong references to the object.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef")
            .field("type", &self.0.type_name())
            .field("id", &format_args!("{:#x}", self.id()))
            .finish()
    }
}

/// A non-owning [`ObjectRef`].
#[derive(Clone)]
pub struct WeakObjectRef {
    id: usize,
    weak: Weak<dyn ObjectValue>,
}

impl WeakObjectRef {
    /// The identity of the referenced object.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Upgrades to a strong reference if the object is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.weak.upgrade().map(ObjectRef)
    }

    /// Returns `true` while the object is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.weak.strong_count() > 0
    }
}

impl fmt::Debug for WeakObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObjectRef")
            .field("id", &format_args!("{:#x}", self.id))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A Rust type that can be stored in a property.
///
/// `accepts` decides whether an untyped assignment is valid for a property of
/// this type; `revive` rebuilds a storable value from a deserialized one (for
/// object kinds this may construct a fresh object from a snapshot).
pub trait PropertyValue: Clone + Send + Sync + 'static {
    /// The storage kind.
    fn kind() -> ValueKind;

    /// Whether [`Value::Null`] is a valid value.
    fn is_nullable() -> bool {
        false
    }

    /// Converts into the tagged form.
    fn into_value(self) -> Value;

    /// Converts from the tagged form.
    fn from_value(value: &Value) -> Option<Self>;

    /// Whether an untyped value can be assigned to a property of this type.
    fn accepts(value: &Value) -> bool {
        Self::from_value(value).is_some()
    }

    /// Rebuilds a storable value from a deserialized one.
    fn revive(value: &Value) -> Option<Value> {
        Self::from_value(value).map(Self::into_value)
    }
}

macro_rules! signed_value {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Int(i64::from(v))
            }
        }

        impl PropertyValue for $t {
            fn kind() -> ValueKind {
                ValueKind::Int
            }

            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Int(v) => <$t>::try_from(*v).ok(),
                    Value::UInt(v) => <$t>::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

macro_rules! unsigned_value {
    ($($t:ty),*) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::UInt(u64::from(v))
            }
        }

        impl PropertyValue for $t {
            fn kind() -> ValueKind {
                ValueKind::UInt
            }

            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::UInt(v) => <$t>::try_from(*v).ok(),
                    Value::Int(v) => <$t>::try_from(*v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

signed_value!(i8, i16, i32, i64);
unsigned_value!(u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl PropertyValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as Self),
            Value::UInt(v) => Some(*v as Self),
            _ => None,
        }
    }
}

impl PropertyValue for f32 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "f32 properties store their own widened values"
    )]
    fn from_value(value: &Value) -> Option<Self> {
        f64::from_value(value).map(|v| v as Self)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl PropertyValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Char(v)
    }
}

impl PropertyValue for char {
    fn kind() -> ValueKind {
        ValueKind::Char
    }

    fn into_value(self) -> Value {
        Value::Char(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    fn revive(value: &Value) -> Option<Value> {
        match value {
            Value::Char(c) => Some(Value::Char(*c)),
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Value::Char(c)),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Self::String(v)
    }
}

impl PropertyValue for String {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(Self::from)
    }
}

impl PropertyValue for Arc<str> {
    fn kind() -> ValueKind {
        ValueKind::String
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<Arc<[u8]>> for Value {
    fn from(v: Arc<[u8]>) -> Self {
        Self::Bytes(v)
    }
}

impl PropertyValue for Arc<[u8]> {
    fn kind() -> ValueKind {
        ValueKind::Bytes
    }

    fn into_value(self) -> Value {
        Value::Bytes(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(b) => Some(b.clone()),
            Value::List(items) => items
                .iter()
                .map(u8::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self::from),
            _ => None,
        }
    }
}

impl<T: PropertyValue> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(T::into_value).collect())
    }
}

impl<T: PropertyValue> PropertyValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::List
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn is_nullable() -> bool {
        true
    }

    fn into_value(self) -> Value {
        self.map_or(Value::Null, T::into_value)
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn accepts(value: &Value) -> bool {
        value.is_null() || T::accepts(value)
    }

    fn revive(value: &Value) -> Option<Value> {
        if value.is_null() {
            Some(Value::Null)
        } else {
            T::revive(value)
        }
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

impl PropertyValue for ObjectRef {
    fn kind() -> ValueKind {
        ValueKind::Object
    }

    fn into_value(self) -> Value {
        Value::Object(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl PropertyValue for Value {
    fn kind() -> ValueKind {
        ValueKind::Any
    }

    fn is_nullable() -> bool {
        true
    }

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain;

    impl ObjectValue for Plain {}

    #[test]
    fn integers_round_trip_with_range_checks() {
        assert_eq!(i32::from_value(&Value::from(5_i32)), Some(5));
        assert_eq!(u8::from_value(&Value::Int(300)), None);
        assert_eq!(i8::from_value(&Value::UInt(12)), Some(12));
        assert!(!i32::accepts(&Value::from("5")));
    }

    #[test]
    fn floats_widen_integers() {
        assert_eq!(f64::from_value(&Value::Int(2)), Some(2.0));
        assert_eq!(f32::from_value(&Value::Float(0.5)), Some(0.5));
    }

    #[test]
    fn nan_is_same_as_itself() {
        let a = Value::Float(f64::NAN);
        assert!(a.same_as(&a.clone()));
        assert!(Value::Float(0.0).same_as(&Value::Float(-0.0)));
    }

    #[test]
    fn option_accepts_null() {
        assert!(Option::<i32>::accepts(&Value::Null));
        assert!(!i32::accepts(&Value::Null));
        assert!(Option::<i32>::is_nullable());
        assert_eq!(Option::<i32>::from_value(&Value::Int(4)), Some(Some(4)));
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = ObjectRef::new(Arc::new(Plain));
        let b = ObjectRef::new(Arc::new(Plain));
        assert!(Value::Object(a.clone()).same_as(&Value::Object(a.clone())));
        assert!(!Value::Object(a.clone()).same_as(&Value::Object(b)));
        assert!(a.is::<Plain>());
        assert!(a.downcast::<Plain>().is_some());
        assert!(!a.is_observable());
    }

    #[test]
    fn weak_object_ref_does_not_keep_alive() {
        let a = ObjectRef::new(Arc::new(Plain));
        let weak = a.downgrade();
        assert_eq!(weak.id(), a.id());
        assert!(weak.upgrade().is_some());
        drop(a);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn lists_convert_item_wise() {
        let value = Value::from(vec![1_i32, 2, 3]);
        assert_eq!(Vec::<i32>::from_value(&value), Some(vec![1, 2, 3]));
        assert_eq!(value.kind(), ValueKind::List);
    }

    #[test]
    fn dynamic_values_accept_anything() {
        assert!(Value::accepts(&Value::Null));
        assert!(Value::accepts(&Value::from(1_u32)));
        assert_eq!(<Value as PropertyValue>::kind(), ValueKind::Any);
    }
}
