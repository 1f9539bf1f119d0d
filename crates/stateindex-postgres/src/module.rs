//! Per-module schema management.

use std::collections::HashMap;

use tracing::{debug, info};

use stateindex_schema::{ModuleSchema, ObjectUpdate, SchemaError};

use crate::enums::{create_enum_types_for_fields, EnumRegistry};
use crate::error::PostgresError;
use crate::executor::SqlExecutor;
use crate::options::Options;
use crate::table::TableManager;

/// Owns the tables and enum types of one module.
#[derive(Debug, Clone)]
pub struct ModuleManager {
    module_name: String,
    schema: ModuleSchema,
    tables: HashMap<String, TableManager>,
    enums: EnumRegistry,
}

impl ModuleManager {
    /// Validates `schema` and prepares a table manager per object type.
    pub fn new(
        module_name: impl Into<String>,
        schema: ModuleSchema,
        options: Options,
    ) -> Result<Self, PostgresError> {
        schema.validate()?;
        let module_name = module_name.into();
        let tables = schema
            .object_types
            .iter()
            .map(|t| {
                let tm = TableManager::new(module_name.clone(), t.clone(), options.clone());
                (t.name.clone(), tm)
            })
            .collect();

        Ok(Self {
            module_name,
            schema,
            tables,
            enums: EnumRegistry::new(),
        })
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn schema(&self) -> &ModuleSchema {
        &self.schema
    }

    pub fn table_manager(&self, type_name: &str) -> Option<&TableManager> {
        self.tables.get(type_name)
    }

    pub fn enum_registry(&self) -> &EnumRegistry {
        &self.enums
    }

    /// Creates every enum type, then every table, in schema order.
    pub async fn init_module_schema<E>(&mut self, exec: &mut E) -> Result<(), PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        for object_type in &self.schema.object_types {
            create_enum_types_for_fields(
                exec,
                &self.module_name,
                &mut self.enums,
                object_type.fields(),
            )
            .await?;
        }

        for object_type in &self.schema.object_types {
            if let Some(tm) = self.tables.get(&object_type.name) {
                tm.create_table(exec).await?;
            }
        }

        info!(
            module = %self.module_name,
            tables = self.tables.len(),
            enums = self.enums.len(),
            "module schema initialized"
        );
        Ok(())
    }

    /// Validates `update` and writes it: a delete, or an insert/update.
    pub async fn apply_update<E>(
        &self,
        exec: &mut E,
        update: &ObjectUpdate,
    ) -> Result<(), PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        self.schema.validate_object_update(update)?;
        let tm = self
            .tables
            .get(&update.type_name)
            .ok_or_else(|| SchemaError::UnknownObjectType(update.type_name.clone()))?;

        debug!(
            module = %self.module_name,
            type_name = %update.type_name,
            delete = update.delete,
            "applying object update"
        );
        if update.delete {
            tm.delete(exec, &update.key).await
        } else {
            tm.insert_update(exec, &update.key, &update.value).await
        }
    }
}
