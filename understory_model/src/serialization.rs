// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Member serialization: the [`Serializer`] contract, its JSON
//! implementation, and `save`/`load` on models.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use understory_observable::{Value, ValueKind};
use understory_property::{PropertyBagStore, PropertyData, is_intrinsic};

use crate::error::ModelError;
use crate::model::{Model, ModelType};

/// Saving or loading members failed.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// The JSON document could not be written or parsed.
    #[error("invalid member document: {0}")]
    Json(#[from] serde_json::Error),
    /// The underlying stream failed.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
    /// A value of this kind cannot be represented.
    #[error("property `{property}` holds a {kind:?} value that cannot be serialized")]
    Unsupported {
        /// The property.
        property: String,
        /// The kind of its value.
        kind: ValueKind,
    },
    /// An object graph refers back to an object still being written.
    #[error("property `{property}` holds an object graph with a cycle")]
    Cycle {
        /// The property.
        property: String,
    },
    /// A stored member does not fit its property.
    #[error("member `{property}` does not hold a valid value")]
    InvalidValue {
        /// The property.
        property: String,
    },
}

/// Writes and reads the members of a model.
///
/// Models resolve a serializer through their
/// [`ServiceResolver`](crate::ServiceResolver) and fall back to
/// [`JsonSerializer`].
pub trait Serializer: Send + Sync {
    /// Writes `members` to `writer`.
    ///
    /// # Errors
    ///
    /// Stream failures and values the format cannot represent.
    fn serialize_members(
        &self,
        members: &[(Arc<str>, Value)],
        writer: &mut dyn Write,
    ) -> Result<(), SerializationError>;

    /// Reads members back from `reader`.
    ///
    /// # Errors
    ///
    /// Stream failures and malformed documents.
    fn deserialize_members(
        &self,
        reader: &mut dyn Read,
    ) -> Result<Vec<(String, Value)>, SerializationError>;
}

const FORMAT_VERSION: u32 = 1;

/// Serializes members as a JSON document.
///
/// Characters are written as one-character strings and bytes as lists of
/// numbers; both are rebuilt by the property type on load. Objects are
/// written as their snapshot when they have one; an object graph with a cycle
/// fails with [`SerializationError::Cycle`]. Non-finite floats are written as
/// `{"$float": "NaN" | "inf" | "-inf"}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// A compact serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A serializer that writes indented JSON.
    #[must_use]
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

#[derive(Serialize, Deserialize)]
struct MembersDocument {
    version: u32,
    members: Vec<Member>,
}

#[derive(Serialize, Deserialize)]
struct Member {
    name: String,
    value: WireValue,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
enum NonFinite {
    #[serde(rename = "NaN")]
    Nan,
    #[serde(rename = "inf")]
    Infinity,
    #[serde(rename = "-inf")]
    NegInfinity,
}

impl NonFinite {
    fn of(value: f64) -> Option<Self> {
        if value.is_nan() {
            Some(Self::Nan)
        } else if value.is_infinite() {
            Some(if value > 0.0 {
                Self::Infinity
            } else {
                Self::NegInfinity
            })
        } else {
            None
        }
    }

    fn value(self) -> f64 {
        match self {
            Self::Nan => f64::NAN,
            Self::Infinity => f64::INFINITY,
            Self::NegInfinity => f64::NEG_INFINITY,
        }
    }
}

// JSON has no literal for these; serde_json would write `null`.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpecialFloat {
    #[serde(rename = "$float")]
    float: NonFinite,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Special(SpecialFloat),
    String(String),
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
}

impl WireValue {
    /// `path` holds the ids of the objects being written around `value`.
    fn encode(
        property: &str,
        value: &Value,
        path: &mut Vec<usize>,
    ) -> Result<Self, SerializationError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(v) => Self::Bool(*v),
            Value::Int(v) => Self::Int(*v),
            Value::UInt(v) => Self::UInt(*v),
            Value::Float(v) => match NonFinite::of(*v) {
                Some(float) => Self::Special(SpecialFloat { float }),
                None => Self::Float(*v),
            },
            Value::Char(c) => Self::String(c.to_string()),
            Value::String(s) => Self::String(s.to_string()),
            Value::Bytes(b) => Self::List(b.iter().map(|&b| Self::UInt(u64::from(b))).collect()),
            Value::List(items) => Self::List(
                items
                    .iter()
                    .map(|item| Self::encode(property, item, path))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.to_string(), Self::encode(property, v, path)?)))
                    .collect::<Result<_, SerializationError>>()?,
            ),
            Value::Object(object) => {
                if path.contains(&object.id()) {
                    return Err(SerializationError::Cycle {
                        property: property.to_owned(),
                    });
                }
                let Some(snapshot) = object.get().snapshot() else {
                    return Err(SerializationError::Unsupported {
                        property: property.to_owned(),
                        kind: ValueKind::Object,
                    });
                };
                path.push(object.id());
                let encoded = Self::encode(property, &snapshot, path);
                path.pop();
                encoded?
            }
        })
    }

    fn decode(self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(v),
            Self::Int(v) => Value::Int(v),
            Self::UInt(v) => Value::UInt(v),
            Self::Float(v) => Value::Float(v),
            Self::Special(special) => Value::Float(special.float.value()),
            Self::String(s) => Value::String(s.into()),
            Self::List(items) => Value::List(items.into_iter().map(Self::decode).collect()),
            Self::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Arc::from(k), v.decode()))
                    .collect(),
            ),
        }
    }
}

impl Serializer for JsonSerializer {
    fn serialize_members(
        &self,
        members: &[(Arc<str>, Value)],
        writer: &mut dyn Write,
    ) -> Result<(), SerializationError> {
        let document = MembersDocument {
            version: FORMAT_VERSION,
            members: members
                .iter()
                .map(|(name, value)| {
                    Ok(Member {
                        name: name.to_string(),
                        value: WireValue::encode(name, value, &mut Vec::new())?,
                    })
                })
                .collect::<Result<_, SerializationError>>()?,
        };
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &document)?;
        } else {
            serde_json::to_writer(&mut *writer, &document)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn deserialize_members(
        &self,
        reader: &mut dyn Read,
    ) -> Result<Vec<(String, Value)>, SerializationError> {
        let document: MembersDocument = serde_json::from_reader(reader)?;
        if document.version != FORMAT_VERSION {
            tracing::warn!(
                version = document.version,
                expected = FORMAT_VERSION,
                "member document version differs"
            );
        }
        Ok(document
            .members
            .into_iter()
            .map(|m| (m.name, m.value.decode()))
            .collect())
    }
}

impl<M: ModelType> Model<M> {
    pub(crate) fn serializer(&self) -> Arc<dyn Serializer> {
        self.resolver()
            .resolve::<dyn Serializer>()
            .unwrap_or_else(|| Arc::new(JsonSerializer::new()))
    }

    /// Stored values of the properties selected by `include`.
    pub(crate) fn members(&self, include: impl Fn(&PropertyData) -> bool) -> Vec<(Arc<str>, Value)> {
        self.type_info()
            .get_properties()
            .into_iter()
            .filter(|data| {
                !is_intrinsic(data.name()) && !data.is_calculated_property() && include(&**data)
            })
            .filter_map(|data| {
                let value = self.inner.bag.get_value(data.name())?;
                Some((data.shared_name().clone(), value))
            })
            .collect()
    }

    /// Revives `value` for the property `name`.
    pub(crate) fn revive_member(
        &self,
        name: &str,
        value: &Value,
    ) -> Result<(Arc<PropertyData>, Value), SerializationError> {
        let data = self
            .type_info()
            .get_property_data(name)
            .map_err(|_| SerializationError::InvalidValue {
                property: name.to_owned(),
            })?;
        let revived = if value.is_null() && data.is_nullable() {
            Some(Value::Null)
        } else if data.kind() == ValueKind::Any {
            Some(value.clone())
        } else {
            data.revive(value)
        };
        revived
            .map(|v| (data, v))
            .ok_or_else(|| SerializationError::InvalidValue {
                property: name.to_owned(),
            })
    }

    /// Writes every serializable property.
    ///
    /// # Errors
    ///
    /// Serializer failures.
    pub fn save(&self, writer: &mut dyn Write) -> Result<(), ModelError> {
        let members = self.members(PropertyData::include_in_serialization);
        self.serializer().serialize_members(&members, writer)?;
        tracing::debug!(
            model = std::any::type_name::<M>(),
            members = members.len(),
            "model saved"
        );
        Ok(())
    }

    /// Saves into a string.
    ///
    /// # Errors
    ///
    /// See [`Model::save`].
    pub fn save_to_string(&self) -> Result<String, ModelError> {
        let mut buffer = Vec::new();
        self.save(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Reads members and applies them through the normal set path.
    ///
    /// Notifications are batched and raised once per changed property.
    /// Unknown or unrevivable members are skipped with a warning. The model
    /// is clean afterwards.
    ///
    /// # Errors
    ///
    /// Serializer failures and property contract violations.
    pub fn load(&self, reader: &mut dyn Read) -> Result<(), ModelError> {
        let members = self.serializer().deserialize_members(reader)?;
        let token = self.suspend_change_notifications(true);
        let mut applied = 0_usize;
        for (name, value) in members {
            let (data, value) = match self.revive_member(&name, &value) {
                Ok(revived) => revived,
                Err(err) => {
                    tracing::warn!(property = %name, error = %err, "member skipped on load");
                    continue;
                }
            };
            if !data.include_in_serialization() || is_intrinsic(data.name()) {
                continue;
            }
            self.set_checked(&data, value, true)?;
            applied += 1;
        }
        token.release();
        self.set_dirty_flag(false);
        tracing::debug!(
            model = std::any::type_name::<M>(),
            applied,
            "model loaded"
        );
        Ok(())
    }

    /// Builds a model and loads it from `reader`.
    ///
    /// # Errors
    ///
    /// See [`Model::new`] and [`Model::load`].
    pub fn deserialize(state: M, reader: &mut dyn Read) -> Result<Self, ModelError> {
        let model = Self::new(state)?;
        model.load(reader)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use understory_property::{Property, PropertyDataBuilder, PropertyError, TypeRegistration};

    use super::*;
    use crate::capabilities::DirtyTracking;

    static NAME: LazyLock<Property<String>> =
        LazyLock::new(|| Property::register("Name", String::new()));
    static INITIAL: LazyLock<Property<char>> = LazyLock::new(|| Property::register("Initial", 'a'));
    static RATIO: LazyLock<Property<f64>> = LazyLock::new(|| Property::register("Ratio", 0.0));
    static BLOB: LazyLock<Property<Option<Arc<[u8]>>>> =
        LazyLock::new(|| Property::register("Blob", None));
    static SECRET: LazyLock<Property<String>> = LazyLock::new(|| {
        PropertyDataBuilder::new("Secret", String::new())
            .include_in_serialization(false)
            .build()
    });

    struct Account;

    impl ModelType for Account {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&NAME)?
                .register(&INITIAL)?
                .register(&RATIO)?
                .register(&BLOB)?
                .register(&SECRET)?;
            Ok(())
        }
    }

    #[test]
    fn save_then_load_restores_values_and_clears_dirty() {
        let source = Model::new(Account).unwrap();
        source.set(&NAME, "Ada".to_owned()).unwrap();
        source.set(&INITIAL, 'z').unwrap();
        source.set(&RATIO, 2.0).unwrap();
        source
            .set(&BLOB, Some(Arc::from(&[1_u8, 2, 3][..])))
            .unwrap();
        source.set(&SECRET, "hidden".to_owned()).unwrap();
        let json = source.save_to_string().unwrap();
        assert!(!json.contains("hidden"));
        assert!(!json.contains("IsDirty"));

        let target = Model::deserialize(Account, &mut json.as_bytes()).unwrap();
        assert_eq!(target.get(&NAME).unwrap(), "Ada");
        assert_eq!(target.get(&INITIAL).unwrap(), 'z');
        assert_eq!(target.get(&RATIO).unwrap(), 2.0);
        assert_eq!(target.get(&BLOB).unwrap().as_deref(), Some(&[1_u8, 2, 3][..]));
        assert_eq!(target.get(&SECRET).unwrap(), "");
        assert!(!target.is_dirty());
    }

    #[test]
    fn unknown_members_are_skipped() {
        let json = r#"{"version":1,"members":[{"name":"Nope","value":1},{"name":"Name","value":"Bo"}]}"#;
        let target = Model::deserialize(Account, &mut json.as_bytes()).unwrap();
        assert_eq!(target.get(&NAME).unwrap(), "Bo");
    }

    #[test]
    fn malformed_documents_fail() {
        let err = Model::deserialize(Account, &mut "{".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Serialization(SerializationError::Json(_))
        ));
    }

    #[test]
    fn non_finite_floats_survive_a_round_trip() {
        for ratio in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let source = Model::new(Account).unwrap();
            source.set(&RATIO, ratio).unwrap();
            source.set(&NAME, "inf".to_owned()).unwrap();
            let json = source.save_to_string().unwrap();

            let target = Model::deserialize(Account, &mut json.as_bytes()).unwrap();
            let loaded = target.get(&RATIO).unwrap();
            if ratio.is_nan() {
                assert!(loaded.is_nan());
            } else {
                assert_eq!(loaded, ratio);
            }
            assert_eq!(target.get(&NAME).unwrap(), "inf");
        }
    }

    static PEER: LazyLock<Property<Option<Model<Node>>>> =
        LazyLock::new(|| Property::register("Peer", None));
    static OTHER: LazyLock<Property<Option<Model<Node>>>> =
        LazyLock::new(|| Property::register("Other", None));
    static LABEL: LazyLock<Property<String>> =
        LazyLock::new(|| Property::register("Label", String::new()));

    struct Node;

    impl ModelType for Node {
        fn register_properties(reg: &mut TypeRegistration) -> Result<(), PropertyError> {
            reg.register(&PEER)?.register(&OTHER)?.register(&LABEL)?;
            Ok(())
        }
    }

    #[test]
    fn cyclic_object_graphs_fail_to_save() {
        let a = Model::new(Node).unwrap();
        let b = Model::new(Node).unwrap();
        a.set(&PEER, Some(b.clone())).unwrap();
        b.set(&PEER, Some(a.clone())).unwrap();

        let err = a.save_to_string().unwrap_err();
        assert!(matches!(
            err,
            ModelError::Serialization(SerializationError::Cycle { ref property }) if property == "Peer"
        ));

        b.set(&PEER, None).unwrap();
        b.set(&LABEL, "leaf".to_owned()).unwrap();
        let json = a.save_to_string().unwrap();
        assert!(json.contains("leaf"));
    }

    #[test]
    fn shared_objects_without_a_cycle_are_written_in_full() {
        let leaf = Model::new(Node).unwrap();
        leaf.set(&LABEL, "shared".to_owned()).unwrap();
        let root = Model::new(Node).unwrap();
        root.set(&PEER, Some(leaf.clone())).unwrap();
        root.set(&OTHER, Some(leaf)).unwrap();

        let json = root.save_to_string().unwrap();
        assert_eq!(json.matches("shared").count(), 2);
    }
}
