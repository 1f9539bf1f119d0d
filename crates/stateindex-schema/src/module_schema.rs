//! Module schemas: the full set of object types a state module emits.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::SchemaError;
use crate::field::EnumDefinition;
use crate::kind::Kind;
use crate::object_type::ObjectType;
use crate::object_update::ObjectUpdate;

/// The object types of one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSchema {
    pub object_types: Vec<ObjectType>,
}

impl ModuleSchema {
    pub fn new(object_types: Vec<ObjectType>) -> Self {
        Self { object_types }
    }

    /// Validates every object type, rejects duplicate type names, and rejects
    /// enums that share a name but not a definition.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut type_names = HashSet::with_capacity(self.object_types.len());
        let mut enums: HashMap<&str, &EnumDefinition> = HashMap::new();

        for object_type in &self.object_types {
            object_type.validate()?;

            if !type_names.insert(object_type.name.as_str()) {
                return Err(SchemaError::DuplicateObjectType(object_type.name.clone()));
            }

            for def in object_type
                .fields()
                .filter(|f| f.kind == Kind::Enum)
                .filter_map(|f| f.enum_definition.as_ref())
            {
                match enums.get(def.name.as_str()) {
                    Some(existing) if *existing != def => {
                        return Err(SchemaError::ConflictingEnum(def.name.clone()));
                    }
                    Some(_) => {}
                    None => {
                        enums.insert(def.name.as_str(), def);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.object_types.iter().find(|t| t.name == name)
    }

    /// Every distinct enum definition, in first-seen order.
    pub fn enum_definitions(&self) -> Vec<&EnumDefinition> {
        let mut seen = HashSet::new();
        self.object_types
            .iter()
            .flat_map(|t| t.fields())
            .filter_map(|f| f.enum_definition.as_ref())
            .filter(|def| seen.insert(def.name.as_str()))
            .collect()
    }

    /// Looks up the update's object type and validates the update against it.
    pub fn validate_object_update(&self, update: &ObjectUpdate) -> Result<(), SchemaError> {
        self.object_type(&update.type_name)
            .ok_or_else(|| SchemaError::UnknownObjectType(update.type_name.clone()))?
            .validate_object_update(update)
    }
}
