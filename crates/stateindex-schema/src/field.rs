//! Field and enum definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchemaError;
use crate::kind::{Kind, Value};

/// A named, ordered set of enum labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumDefinition {
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Requires a non-empty name and a non-empty list of distinct, non-empty labels.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidEnum {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("enum definition name cannot be empty"));
        }
        if self.values.is_empty() {
            return Err(invalid("enum definition values cannot be empty"));
        }

        let mut seen = HashSet::with_capacity(self.values.len());
        for value in &self.values {
            if value.is_empty() {
                return Err(invalid("enum definition values cannot contain empty strings"));
            }
            if !seen.insert(value.as_str()) {
                return Err(invalid(&format!("duplicate enum value {value:?}")));
            }
        }
        Ok(())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.values.iter().any(|v| v == label)
    }
}

/// A single key or value column of an object type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: Kind,
    /// Whether `Value::Null` is accepted.
    #[serde(default)]
    pub nullable: bool,
    /// Required when `kind` is [`Kind::Enum`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_definition: Option<EnumDefinition>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            enum_definition: None,
        }
    }

    /// Builds an enum field from its definition.
    pub fn enumeration(name: impl Into<String>, definition: EnumDefinition) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Enum,
            nullable: false,
            enum_definition: Some(definition),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Checks the field definition itself (not a value).
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyFieldName);
        }
        if !self.kind.is_valid() {
            return Err(SchemaError::InvalidKind {
                field: self.name.clone(),
                kind: self.kind.name().to_string(),
            });
        }
        if self.kind == Kind::Enum {
            match &self.enum_definition {
                Some(def) => def.validate()?,
                None => {
                    return Err(SchemaError::MissingEnumDefinition {
                        field: self.name.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Checks `value` against this field's kind, nullability, and enum labels.
    ///
    /// Returns the bare reason so callers can attach field/position context.
    pub fn check_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return if self.nullable {
                Ok(())
            } else {
                Err("expected non-null value".to_string())
            };
        }

        self.kind.validate_value_type(value)?;

        if let (Value::Enum(label), Some(def)) = (value, &self.enum_definition) {
            if !def.contains(label) {
                return Err(format!("{label:?} is not a value of enum {:?}", def.name));
            }
        }
        Ok(())
    }

    /// Like [`Field::check_value`], wrapped in a [`SchemaError::InvalidValue`].
    pub fn validate_value(&self, value: &Value) -> Result<(), SchemaError> {
        self.check_value(value).map_err(|reason| SchemaError::InvalidValue {
            field: self.name.clone(),
            reason,
        })
    }
}
