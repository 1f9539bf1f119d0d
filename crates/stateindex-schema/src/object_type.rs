//! Object types and validation of keys, values, and updates against them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchemaError;
use crate::field::Field;
use crate::kind::Value;
use crate::object_update::{ObjectKey, ObjectUpdate, ObjectValue, ValueUpdates};

/// Unique constraint metadata over a set of fields.
///
/// Carried by the schema; SQL backends do not emit it yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub field_names: Vec<String>,
}

/// A named object type with ordered key and value fields.
///
/// A type without key fields is a singleton: at most one logical row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    pub name: String,
    #[serde(default)]
    pub key_fields: Vec<Field>,
    #[serde(default)]
    pub value_fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Keep deleted rows, marked as deleted, when the sink also allows it.
    #[serde(default)]
    pub retain_deletions: bool,
}

#[derive(Clone, Copy)]
enum FieldList {
    Key,
    Value,
}

/// Borrowed view over the non-partial shapes of keys and values.
enum Shape<'a> {
    Absent,
    Single(&'a Value),
    Composite(&'a [Value]),
}

impl<'a> From<&'a ObjectKey> for Shape<'a> {
    fn from(key: &'a ObjectKey) -> Self {
        match key {
            ObjectKey::None => Shape::Absent,
            ObjectKey::Single(v) => Shape::Single(v),
            ObjectKey::Composite(vs) => Shape::Composite(vs),
        }
    }
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_key_field(mut self, field: Field) -> Self {
        self.key_fields.push(field);
        self
    }

    pub fn with_value_field(mut self, field: Field) -> Self {
        self.value_fields.push(field);
        self
    }

    pub fn with_retain_deletions(mut self, retain: bool) -> Self {
        self.retain_deletions = retain;
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.key_fields.is_empty()
    }

    /// Key fields followed by value fields.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.key_fields.iter().chain(self.value_fields.iter())
    }

    pub fn value_field(&self, name: &str) -> Option<&Field> {
        self.value_fields.iter().find(|f| f.name == name)
    }

    /// Validates the definition. Checks run name → key fields → value fields →
    /// emptiness → duplicate names → unique constraints; the first failure wins.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyTypeName);
        }

        for field in &self.key_fields {
            field.validate()?;
        }
        for field in &self.value_fields {
            field.validate()?;
        }

        if self.key_fields.is_empty() && self.value_fields.is_empty() {
            return Err(SchemaError::NoFields {
                type_name: self.name.clone(),
            });
        }

        self.check_unique_names(&self.key_fields, "key")?;
        self.check_unique_names(&self.value_fields, "value")?;

        for constraint in &self.unique_constraints {
            for name in &constraint.field_names {
                if !self.fields().any(|f| &f.name == name) {
                    return Err(SchemaError::UnknownConstraintField {
                        type_name: self.name.clone(),
                        field: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_unique_names(&self, fields: &[Field], list: &'static str) -> Result<(), SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    type_name: self.name.clone(),
                    list,
                    field: field.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validates an object key against the key fields.
    pub fn validate_key(&self, key: &ObjectKey) -> Result<(), SchemaError> {
        validate_fields_value(&self.key_fields, key.into(), FieldList::Key)
    }

    /// Validates an object value against the value fields.
    ///
    /// Partial updates are accepted for any number of value fields; every
    /// name they carry must be a declared value field.
    pub fn validate_value(&self, value: &ObjectValue) -> Result<(), SchemaError> {
        let shape = match value {
            ObjectValue::Partial(updates) => return self.validate_value_updates(updates),
            ObjectValue::None => Shape::Absent,
            ObjectValue::Single(v) => Shape::Single(v),
            ObjectValue::Composite(vs) => Shape::Composite(vs),
        };
        validate_fields_value(&self.value_fields, shape, FieldList::Value)
    }

    fn validate_value_updates(&self, updates: &ValueUpdates) -> Result<(), SchemaError> {
        let unexpected: Vec<String> = updates
            .iter()
            .filter(|(name, _)| self.value_field(name).is_none())
            .map(|(name, _)| name.to_string())
            .collect();
        if !unexpected.is_empty() {
            return Err(SchemaError::UnexpectedValues(unexpected));
        }

        for (name, value) in updates.iter() {
            if let Some(field) = self.value_field(name) {
                field.validate_value(value)?;
            }
        }
        Ok(())
    }

    /// Validates `update` against this type. Deletions skip value validation.
    pub fn validate_object_update(&self, update: &ObjectUpdate) -> Result<(), SchemaError> {
        if self.name != update.type_name {
            return Err(SchemaError::TypeNameMismatch {
                expected: self.name.clone(),
                actual: update.type_name.clone(),
            });
        }

        self.validate_key(&update.key)?;

        if !update.delete {
            self.validate_value(&update.value)?;
        }
        Ok(())
    }
}

fn validate_fields_value(fields: &[Field], input: Shape<'_>, list: FieldList) -> Result<(), SchemaError> {
    match fields {
        [] => Ok(()),
        [field] => match input {
            Shape::Single(value) => field.validate_value(value),
            Shape::Absent => field.validate_value(&Value::Null),
            Shape::Composite(values) => Err(SchemaError::InvalidValue {
                field: field.name.clone(),
                reason: format!(
                    "expected a single {} value, got slice of {} values",
                    field.kind,
                    values.len()
                ),
            }),
        },
        _ => {
            let Shape::Composite(values) = input else {
                return Err(SchemaError::ExpectedSlice {
                    count: fields.len(),
                });
            };
            if values.len() != fields.len() {
                return Err(match list {
                    FieldList::Key => SchemaError::KeyFieldCount {
                        expected: fields.len(),
                        actual: values.len(),
                    },
                    FieldList::Value => SchemaError::ValueFieldCount {
                        expected: fields.len(),
                        actual: values.len(),
                    },
                });
            }
            for (position, (field, value)) in fields.iter().zip(values).enumerate() {
                field
                    .check_value(value)
                    .map_err(|reason| SchemaError::InvalidValueAt {
                        position,
                        field: field.name.clone(),
                        reason,
                    })?;
            }
            Ok(())
        }
    }
}
