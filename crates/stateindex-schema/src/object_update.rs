//! Object updates: one mutation event against one object type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::kind::Value;

/// The key of an object update.
///
/// Singleton types ignore the key; single-key types expect `Single`;
/// composite-key types expect `Composite` in declared field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKey {
    #[default]
    None,
    Single(Value),
    Composite(Vec<Value>),
}

impl From<Value> for ObjectKey {
    fn from(v: Value) -> Self {
        ObjectKey::Single(v)
    }
}

impl From<Vec<Value>> for ObjectKey {
    fn from(v: Vec<Value>) -> Self {
        ObjectKey::Composite(v)
    }
}

/// The value of an object update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectValue {
    #[default]
    None,
    Single(Value),
    Composite(Vec<Value>),
    /// Only the named value fields changed.
    Partial(ValueUpdates),
}

impl From<Value> for ObjectValue {
    fn from(v: Value) -> Self {
        ObjectValue::Single(v)
    }
}

impl From<Vec<Value>> for ObjectValue {
    fn from(v: Vec<Value>) -> Self {
        ObjectValue::Composite(v)
    }
}

impl From<ValueUpdates> for ObjectValue {
    fn from(v: ValueUpdates) -> Self {
        ObjectValue::Partial(v)
    }
}

/// A partial update: value-field name → new value.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueUpdates(BTreeMap<String, Value>);

impl ValueUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueUpdates {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One mutation of one object, as emitted by the state machine.
///
/// Validated against its [`ObjectType`](crate::ObjectType) before any sink sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub type_name: String,
    #[serde(default)]
    pub key: ObjectKey,
    /// Ignored when `delete` is set.
    #[serde(default)]
    pub value: ObjectValue,
    #[serde(default)]
    pub delete: bool,
}

impl ObjectUpdate {
    /// An insert or update of `key` to `value`.
    pub fn set(
        type_name: impl Into<String>,
        key: impl Into<ObjectKey>,
        value: impl Into<ObjectValue>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            value: value.into(),
            delete: false,
        }
    }

    /// A deletion of `key`.
    pub fn delete(type_name: impl Into<String>, key: impl Into<ObjectKey>) -> Self {
        Self {
            type_name: type_name.into(),
            key: key.into(),
            value: ObjectValue::None,
            delete: true,
        }
    }
}
