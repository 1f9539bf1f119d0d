//! Postgres enum types for enum-kind fields.
//!
//! Enum types are created lazily, once per enum name. A catalog lookup makes
//! creation idempotent across processes; the [`EnumRegistry`] only saves the
//! catalog round-trip for enums this process has already seen.

use std::collections::HashMap;
use std::fmt::Write;

use tracing::debug;

use stateindex_schema::{EnumDefinition, Field, Kind};

use crate::column::{quote_identifier, quote_literal};
use crate::error::PostgresError;
use crate::executor::SqlExecutor;
use crate::params::SqlParam;

const ENUM_EXISTS_SQL: &str = "SELECT 1 FROM pg_type WHERE typname = $1";

/// Longest identifier PostgreSQL keeps; longer names are silently truncated.
const MAX_IDENTIFIER_BYTES: usize = 63;

/// Module-qualified enum type name, cut to the name PostgreSQL stores so the
/// catalog lookup and the DDL agree.
pub fn enum_type_name(module_name: &str, enum_name: &str) -> String {
    let mut name = format!("{module_name}_{enum_name}");
    if name.len() > MAX_IDENTIFIER_BYTES {
        let mut end = MAX_IDENTIFIER_BYTES;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// Enum definitions already created (or found) by one module manager.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    defined: HashMap<String, EnumDefinition>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defined.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&EnumDefinition> {
        self.defined.get(name)
    }

    pub fn insert(&mut self, def: EnumDefinition) {
        self.defined.insert(def.name.clone(), def);
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

/// Writes `CREATE TYPE "module_enum" AS ENUM ('a', 'b');`.
pub fn create_enum_type_sql(
    w: &mut impl Write,
    module_name: &str,
    def: &EnumDefinition,
) -> Result<(), PostgresError> {
    write!(
        w,
        "CREATE TYPE {} AS ENUM (",
        quote_identifier(&enum_type_name(module_name, &def.name))
    )?;
    for (i, value) in def.values.iter().enumerate() {
        if i > 0 {
            w.write_str(", ")?;
        }
        w.write_str(&quote_literal(value))?;
    }
    w.write_str(");")?;
    Ok(())
}

/// Creates the enum type unless the catalog already has it.
pub async fn create_enum_type<E>(
    exec: &mut E,
    module_name: &str,
    def: &EnumDefinition,
) -> Result<(), PostgresError>
where
    E: SqlExecutor + ?Sized,
{
    let type_name = enum_type_name(module_name, &def.name);
    let exists = exec
        .exists(ENUM_EXISTS_SQL, &[SqlParam::Text(type_name.clone())])
        .await
        .map_err(|e| PostgresError::EnumCatalog {
            type_name: type_name.clone(),
            source: Box::new(e),
        })?;
    if exists {
        debug!(type_name = %type_name, "enum type already exists");
        return Ok(());
    }

    let mut sql = String::new();
    create_enum_type_sql(&mut sql, module_name, def)?;
    debug!(type_name = %type_name, sql = %sql, "creating enum type");
    exec.execute_script(&sql).await
}

/// Creates the enum types of every enum-kind field not yet in `registry`.
pub async fn create_enum_types_for_fields<'a, E, I>(
    exec: &mut E,
    module_name: &str,
    registry: &mut EnumRegistry,
    fields: I,
) -> Result<(), PostgresError>
where
    E: SqlExecutor + ?Sized,
    I: IntoIterator<Item = &'a Field>,
{
    for field in fields {
        if field.kind != Kind::Enum {
            continue;
        }
        let Some(def) = &field.enum_definition else {
            return Err(PostgresError::unsupported(format!(
                "enum field {:?} has no definition",
                field.name
            )));
        };
        // definitions are validated upfront; a known name is the same enum
        if registry.contains(&def.name) {
            continue;
        }

        create_enum_type(exec, module_name, def).await?;
        registry.insert(def.clone());
    }
    Ok(())
}
