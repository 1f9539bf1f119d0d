//! One table per object type.
//!
//! SQL generation is split from execution: every `*_sql*` method writes into
//! a [`std::fmt::Write`] sink and returns its bind parameters, and the async
//! methods run the result through a caller-owned [`SqlExecutor`].
//!
//! Table layout for a type `balance` in module `bank`:
//!
//! ```text
//! CREATE TABLE IF NOT EXISTS "bank_balance" ("address" BYTEA NOT NULL,
//!     "denom" TEXT NOT NULL,
//!     "amount" NUMERIC NOT NULL,
//!     _deleted BOOLEAN NOT NULL DEFAULT FALSE,      -- retained deletions only
//!     PRIMARY KEY ("address", "denom")
//! );
//! ```
//!
//! Singleton types (no key fields) get `_id INTEGER NOT NULL CHECK (_id = 1)`
//! as their key instead.

use std::fmt::Write;

use tracing::debug;

use stateindex_schema::{Field, ObjectKey, ObjectType, ObjectValue, Value};

use crate::column::{quote_identifier, write_column_def, write_placeholder};
use crate::error::PostgresError;
use crate::executor::SqlExecutor;
use crate::options::Options;
use crate::params::SqlParam;

static NULL: Value = Value::Null;

/// Generates and runs the SQL of one object type's table.
#[derive(Debug, Clone)]
pub struct TableManager {
    module_name: String,
    object_type: ObjectType,
    options: Options,
}

type Column<'a> = (&'a Field, &'a Value);

impl TableManager {
    pub fn new(module_name: impl Into<String>, object_type: ObjectType, options: Options) -> Self {
        Self {
            module_name: module_name.into(),
            object_type,
            options,
        }
    }

    /// `{module}_{type}`, unquoted.
    pub fn table_name(&self) -> String {
        format!("{}_{}", self.module_name, self.object_type.name)
    }

    pub fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    /// Soft deletes apply only when both the deployment and the type opt in.
    pub fn retains_deletions(&self) -> bool {
        self.options.retain_deletions && self.object_type.retain_deletions
    }

    // ─── DDL ──────────────────────────────────────────────────────────────────

    pub fn create_table_sql(&self, w: &mut impl Write) -> Result<(), PostgresError> {
        let table = quote_identifier(&self.table_name());
        write!(w, "CREATE TABLE IF NOT EXISTS {table} (")?;

        let singleton = self.object_type.is_singleton();
        if singleton {
            w.write_str("_id INTEGER NOT NULL CHECK (_id = 1),\n\t")?;
        } else {
            for field in &self.object_type.key_fields {
                write_column_def(w, &self.module_name, field)?;
            }
        }

        for field in &self.object_type.value_fields {
            write_column_def(w, &self.module_name, field)?;
        }

        if self.retains_deletions() {
            w.write_str("_deleted BOOLEAN NOT NULL DEFAULT FALSE,\n\t")?;
        }

        let primary_key = if singleton {
            "_id".to_string()
        } else {
            self.object_type
                .key_fields
                .iter()
                .map(|f| quote_identifier(&f.name))
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(w, "PRIMARY KEY ({primary_key})")?;

        // Unique constraints are validated on the schema but not emitted yet;
        // existing chain data is not guaranteed to satisfy them.

        write!(w, "\n);\n\nGRANT SELECT ON TABLE {table} TO PUBLIC;\n")?;
        Ok(())
    }

    pub async fn create_table<E>(&self, exec: &mut E) -> Result<(), PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        let mut sql = String::new();
        self.create_table_sql(&mut sql)?;
        debug!(table = %self.table_name(), sql = %sql, "creating table");
        exec.execute_script(&sql).await
    }

    // ─── Key and value columns ────────────────────────────────────────────────

    fn key_columns<'a>(&'a self, key: &'a ObjectKey) -> Result<Vec<Column<'a>>, PostgresError> {
        self.object_type.validate_key(key)?;
        Ok(match (self.object_type.key_fields.as_slice(), key) {
            ([], _) => vec![],
            ([field], ObjectKey::Single(value)) => vec![(field, value)],
            ([field], _) => vec![(field, &NULL)],
            (fields, ObjectKey::Composite(values)) => fields.iter().zip(values).collect(),
            _ => vec![],
        })
    }

    fn value_columns<'a>(
        &'a self,
        value: &'a ObjectValue,
    ) -> Result<Vec<Column<'a>>, PostgresError> {
        self.object_type.validate_value(value)?;
        let fields = &self.object_type.value_fields;
        Ok(match value {
            ObjectValue::Partial(updates) => fields
                .iter()
                .filter_map(|f| updates.get(&f.name).map(|v| (f, v)))
                .collect(),
            ObjectValue::None if fields.len() == 1 => vec![(&fields[0], &NULL)],
            ObjectValue::None => vec![],
            ObjectValue::Single(v) => fields.first().map(|f| vec![(f, v)]).unwrap_or_default(),
            ObjectValue::Composite(values) => fields.iter().zip(values).collect(),
        })
    }

    fn push_param(
        &self,
        w: &mut impl Write,
        params: &mut Vec<SqlParam>,
        (field, value): Column<'_>,
        index: usize,
    ) -> Result<(), PostgresError> {
        write_placeholder(w, &self.module_name, field, index)?;
        params.push(SqlParam::from_value(field.kind, value)?);
        Ok(())
    }

    // ─── WHERE ────────────────────────────────────────────────────────────────

    /// Writes ` WHERE ...` matching `key`, numbering placeholders from
    /// `start`. Returns the next free placeholder index and the parameters.
    ///
    /// Null key values are matched with `IS NULL` and take no placeholder.
    pub fn where_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
        start: usize,
    ) -> Result<(usize, Vec<SqlParam>), PostgresError> {
        w.write_str(" WHERE ")?;

        if self.object_type.is_singleton() {
            write!(w, "_id = ${start}")?;
            return Ok((start + 1, vec![SqlParam::Int(1)]));
        }

        let mut index = start;
        let mut params = Vec::new();
        for (i, column) in self.key_columns(key)?.into_iter().enumerate() {
            if i > 0 {
                w.write_str(" AND ")?;
            }
            let name = quote_identifier(&column.0.name);
            if column.1.is_null() {
                write!(w, "{name} IS NULL")?;
                continue;
            }
            write!(w, "{name} = ")?;
            self.push_param(w, &mut params, column, index)?;
            index += 1;
        }
        Ok((index, params))
    }

    // ─── Delete ───────────────────────────────────────────────────────────────

    pub fn delete_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
    ) -> Result<Vec<SqlParam>, PostgresError> {
        write!(w, "DELETE FROM {}", quote_identifier(&self.table_name()))?;
        let (_, params) = self.where_sql_and_params(w, key, 1)?;
        w.write_str(";")?;
        Ok(params)
    }

    pub fn retain_delete_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
    ) -> Result<Vec<SqlParam>, PostgresError> {
        write!(
            w,
            "UPDATE {} SET _deleted = TRUE",
            quote_identifier(&self.table_name())
        )?;
        let (_, params) = self.where_sql_and_params(w, key, 1)?;
        w.write_str(";")?;
        Ok(params)
    }

    /// Deletes the row for `key`, or marks it deleted when deletions are retained.
    pub async fn delete<E>(&self, exec: &mut E, key: &ObjectKey) -> Result<(), PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        let mut sql = String::new();
        let params = if self.retains_deletions() {
            self.retain_delete_sql_and_params(&mut sql, key)?
        } else {
            self.delete_sql_and_params(&mut sql, key)?
        };

        debug!(table = %self.table_name(), sql = %sql, params = ?params, "delete");
        exec.execute(&sql, &params).await?;
        Ok(())
    }

    // ─── Exists ───────────────────────────────────────────────────────────────

    pub fn exists_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
    ) -> Result<Vec<SqlParam>, PostgresError> {
        write!(w, "SELECT 1 FROM {}", quote_identifier(&self.table_name()))?;
        let (_, params) = self.where_sql_and_params(w, key, 1)?;
        w.write_str(";")?;
        Ok(params)
    }

    /// Whether a row for `key` exists, soft-deleted rows included.
    pub async fn exists<E>(&self, exec: &mut E, key: &ObjectKey) -> Result<bool, PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        let mut sql = String::new();
        let params = self.exists_sql_and_params(&mut sql, key)?;
        debug!(table = %self.table_name(), sql = %sql, params = ?params, "exists");
        exec.exists(&sql, &params).await
    }

    // ─── Insert / update ──────────────────────────────────────────────────────

    pub fn insert_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
        value: &ObjectValue,
    ) -> Result<Vec<SqlParam>, PostgresError> {
        let mut names = Vec::new();
        let mut placeholders = String::new();
        let mut params = Vec::new();

        if self.object_type.is_singleton() {
            names.push("_id".to_string());
            placeholders.push_str("$1");
            params.push(SqlParam::Int(1));
        }

        let columns = self
            .key_columns(key)?
            .into_iter()
            .chain(self.value_columns(value)?);
        for column in columns {
            if !params.is_empty() {
                placeholders.push_str(", ");
            }
            names.push(quote_identifier(&column.0.name));
            let index = params.len() + 1;
            self.push_param(&mut placeholders, &mut params, column, index)?;
        }

        write!(
            w,
            "INSERT INTO {} ({}) VALUES ({});",
            quote_identifier(&self.table_name()),
            names.join(", "),
            placeholders
        )?;
        Ok(params)
    }

    /// Writes an `UPDATE` of the value columns carried by `value`. Clears the
    /// `_deleted` marker when deletions are retained.
    ///
    /// Writes nothing and returns no parameters when there is nothing to set.
    pub fn update_sql_and_params(
        &self,
        w: &mut impl Write,
        key: &ObjectKey,
        value: &ObjectValue,
    ) -> Result<Vec<SqlParam>, PostgresError> {
        let columns = self.value_columns(value)?;
        let retains = self.retains_deletions();
        if columns.is_empty() && !retains {
            return Ok(vec![]);
        }

        let mut sets = Vec::with_capacity(columns.len() + 1);
        let mut params = Vec::with_capacity(columns.len());
        for column in columns {
            let mut set = format!("{} = ", quote_identifier(&column.0.name));
            let index = params.len() + 1;
            self.push_param(&mut set, &mut params, column, index)?;
            sets.push(set);
        }
        if retains {
            sets.push("_deleted = FALSE".to_string());
        }

        write!(
            w,
            "UPDATE {} SET {}",
            quote_identifier(&self.table_name()),
            sets.join(", ")
        )?;
        let (_, key_params) = self.where_sql_and_params(w, key, params.len() + 1)?;
        params.extend(key_params);
        w.write_str(";")?;
        Ok(params)
    }

    /// Updates the row for `key` if it exists, inserts it otherwise.
    pub async fn insert_update<E>(
        &self,
        exec: &mut E,
        key: &ObjectKey,
        value: &ObjectValue,
    ) -> Result<(), PostgresError>
    where
        E: SqlExecutor + ?Sized,
    {
        let exists = self.exists(exec, key).await?;

        let mut sql = String::new();
        let params = if exists {
            self.update_sql_and_params(&mut sql, key, value)?
        } else {
            self.insert_sql_and_params(&mut sql, key, value)?
        };
        if sql.is_empty() {
            debug!(table = %self.table_name(), "row exists and has no value columns to update");
            return Ok(());
        }

        debug!(table = %self.table_name(), exists, sql = %sql, params = ?params, "insert/update");
        exec.execute(&sql, &params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::recording::RecordingExecutor;
    use stateindex_schema::{EnumDefinition, Kind, ValueUpdates};

    fn object4() -> ObjectType {
        ObjectType::new("object4")
            .with_key_field(Field::new("field1", Kind::Int32))
            .with_value_field(Field::new("field2", Kind::String))
    }

    fn delegation() -> ObjectType {
        ObjectType::new("delegation")
            .with_key_field(Field::new("delegator", Kind::Address))
            .with_key_field(Field::new("validator", Kind::String).nullable())
            .with_value_field(Field::new("shares", Kind::Decimal))
            .with_value_field(Field::new("height", Kind::Uint64))
            .with_retain_deletions(true)
    }

    fn params_singleton() -> ObjectType {
        ObjectType::new("params")
            .with_value_field(Field::new("max_validators", Kind::Uint32))
            .with_retain_deletions(true)
    }

    fn sql_of(
        f: impl FnOnce(&mut String) -> Result<Vec<SqlParam>, PostgresError>,
    ) -> (String, Vec<SqlParam>) {
        let mut sql = String::new();
        let params = f(&mut sql).unwrap();
        (sql, params)
    }

    #[test]
    fn create_table_object4() {
        let tm = TableManager::new("test", object4(), Options::default());
        let mut sql = String::new();
        tm.create_table_sql(&mut sql).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"test_object4\" (\"field1\" INTEGER NOT NULL,\n\t\
             \"field2\" TEXT NOT NULL,\n\t\
             PRIMARY KEY (\"field1\")\n);\n\n\
             GRANT SELECT ON TABLE \"test_object4\" TO PUBLIC;\n"
        );
    }

    #[test]
    fn deleted_column_needs_both_flags() {
        let with_option = Options::default().with_retain_deletions(true);

        let mut sql = String::new();
        TableManager::new("test", object4().with_retain_deletions(true), Options::default())
            .create_table_sql(&mut sql)
            .unwrap();
        assert!(!sql.contains("_deleted"));

        sql.clear();
        TableManager::new("test", object4(), with_option.clone())
            .create_table_sql(&mut sql)
            .unwrap();
        assert!(!sql.contains("_deleted"));

        sql.clear();
        TableManager::new("test", object4().with_retain_deletions(true), with_option)
            .create_table_sql(&mut sql)
            .unwrap();
        assert!(sql.contains("_deleted BOOLEAN NOT NULL DEFAULT FALSE,\n\tPRIMARY KEY"));
    }

    #[test]
    fn create_singleton_table() {
        let tm = TableManager::new(
            "staking",
            params_singleton(),
            Options::default().with_retain_deletions(true),
        );
        let mut sql = String::new();
        tm.create_table_sql(&mut sql).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS \"staking_params\" (_id INTEGER NOT NULL CHECK (_id = 1),\n\t\
             \"max_validators\" BIGINT NOT NULL,\n\t\
             _deleted BOOLEAN NOT NULL DEFAULT FALSE,\n\t\
             PRIMARY KEY (_id)\n);\n\n\
             GRANT SELECT ON TABLE \"staking_params\" TO PUBLIC;\n"
        );
    }

    #[test]
    fn enum_columns_reference_module_type() {
        let t = ObjectType::new("validator")
            .with_key_field(Field::new("operator", Kind::String))
            .with_value_field(Field::enumeration(
                "status",
                EnumDefinition::new("bond_status", ["bonded", "unbonded"]),
            ));
        let mut sql = String::new();
        TableManager::new("staking", t, Options::default())
            .create_table_sql(&mut sql)
            .unwrap();
        assert!(sql.contains("\"status\" \"staking_bond_status\" NOT NULL,"));
    }

    #[test]
    fn hard_delete() {
        let tm = TableManager::new("test", object4(), Options::default());
        let (sql, params) = sql_of(|w| tm.delete_sql_and_params(w, &Value::Int32(7).into()));
        assert_eq!(sql, "DELETE FROM \"test_object4\" WHERE \"field1\" = $1;");
        assert_eq!(params, vec![SqlParam::Int(7)]);
    }

    #[test]
    fn soft_delete_with_null_key_part() {
        let tm = TableManager::new(
            "staking",
            delegation(),
            Options::default().with_retain_deletions(true),
        );
        let key = vec![Value::Address(vec![1, 2]), Value::Null].into();
        let (sql, params) = sql_of(|w| tm.retain_delete_sql_and_params(w, &key));
        assert_eq!(
            sql,
            "UPDATE \"staking_delegation\" SET _deleted = TRUE \
             WHERE \"delegator\" = $1 AND \"validator\" IS NULL;"
        );
        assert_eq!(params, vec![SqlParam::Bytes(vec![1, 2])]);
    }

    #[test]
    fn singleton_where_uses_id() {
        let tm = TableManager::new("staking", params_singleton(), Options::default());
        let (sql, params) = sql_of(|w| tm.delete_sql_and_params(w, &ObjectKey::None));
        assert_eq!(sql, "DELETE FROM \"staking_params\" WHERE _id = $1;");
        assert_eq!(params, vec![SqlParam::Int(1)]);
    }

    #[test]
    fn invalid_key_is_rejected_before_sql() {
        let tm = TableManager::new("test", object4(), Options::default());
        let mut sql = String::new();
        let err = tm
            .delete_sql_and_params(&mut sql, &Value::from("7").into())
            .unwrap_err();
        assert!(matches!(err, PostgresError::Schema(_)));
    }

    #[test]
    fn update_numbers_key_params_after_values() {
        let tm = TableManager::new(
            "staking",
            delegation(),
            Options::default().with_retain_deletions(true),
        );
        let key = vec![Value::Address(vec![9]), Value::from("val1")].into();
        let value = vec![Value::Decimal("1.5".into()), Value::Uint64(10)].into();
        let (sql, params) = sql_of(|w| tm.update_sql_and_params(w, &key, &value));
        assert_eq!(
            sql,
            "UPDATE \"staking_delegation\" SET \"shares\" = $1::NUMERIC, \
             \"height\" = $2::NUMERIC, _deleted = FALSE \
             WHERE \"delegator\" = $3 AND \"validator\" = $4;"
        );
        assert_eq!(
            params,
            vec![
                SqlParam::Text("1.5".into()),
                SqlParam::Text("10".into()),
                SqlParam::Bytes(vec![9]),
                SqlParam::Text("val1".into()),
            ]
        );
    }

    #[test]
    fn partial_update_touches_present_columns() {
        let tm = TableManager::new("staking", delegation(), Options::default());
        let key = vec![Value::Address(vec![9]), Value::from("val1")].into();
        let value = ValueUpdates::new().with("height", Value::Uint64(3)).into();
        let (sql, _) = sql_of(|w| tm.update_sql_and_params(w, &key, &value));
        assert_eq!(
            sql,
            "UPDATE \"staking_delegation\" SET \"height\" = $1::NUMERIC \
             WHERE \"delegator\" = $2 AND \"validator\" = $3;"
        );
    }

    #[test]
    fn insert_singleton() {
        let tm = TableManager::new("staking", params_singleton(), Options::default());
        let (sql, params) =
            sql_of(|w| tm.insert_sql_and_params(w, &ObjectKey::None, &Value::Uint32(100).into()));
        assert_eq!(
            sql,
            "INSERT INTO \"staking_params\" (_id, \"max_validators\") VALUES ($1, $2);"
        );
        assert_eq!(params, vec![SqlParam::Int(1), SqlParam::BigInt(100)]);
    }

    #[tokio::test]
    async fn insert_update_picks_statement_by_existence() {
        let tm = TableManager::new("test", object4(), Options::default());
        let key = Value::Int32(1).into();
        let value = Value::from("hello").into();

        let mut exec = RecordingExecutor::default();
        tm.insert_update(&mut exec, &key, &value).await.unwrap();
        assert_eq!(
            exec.sql(),
            vec![
                "SELECT 1 FROM \"test_object4\" WHERE \"field1\" = $1;",
                "INSERT INTO \"test_object4\" (\"field1\", \"field2\") VALUES ($1, $2);",
            ]
        );

        let mut exec = RecordingExecutor {
            exists_default: true,
            ..Default::default()
        };
        tm.insert_update(&mut exec, &key, &value).await.unwrap();
        assert_eq!(
            exec.sql()[1],
            "UPDATE \"test_object4\" SET \"field2\" = $1 WHERE \"field1\" = $2;"
        );
    }

    #[tokio::test]
    async fn existing_key_only_row_is_left_alone() {
        let t = ObjectType::new("member").with_key_field(Field::new("addr", Kind::Address));
        let tm = TableManager::new("group", t, Options::default());
        let mut exec = RecordingExecutor {
            exists_default: true,
            ..Default::default()
        };
        tm.insert_update(&mut exec, &Value::Address(vec![1]).into(), &ObjectValue::None)
            .await
            .unwrap();
        assert_eq!(exec.statements.len(), 1);
    }

    #[tokio::test]
    async fn delete_picks_strategy() {
        let mut exec = RecordingExecutor::default();
        let key = vec![Value::Address(vec![1]), Value::from("v")].into();

        TableManager::new("staking", delegation(), Options::default())
            .delete(&mut exec, &key)
            .await
            .unwrap();
        TableManager::new(
            "staking",
            delegation(),
            Options::default().with_retain_deletions(true),
        )
        .delete(&mut exec, &key)
        .await
        .unwrap();

        assert_eq!(exec.count_prefix("DELETE FROM"), 1);
        assert_eq!(exec.count_prefix("UPDATE \"staking_delegation\" SET _deleted = TRUE"), 1);
    }
}
