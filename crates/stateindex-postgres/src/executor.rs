//! The caller-owned execution context.
//!
//! Materialization code never begins, commits or rolls back a transaction;
//! it only runs statements through a [`SqlExecutor`] handed in by the caller.

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, Transaction};

use crate::error::PostgresError;
use crate::params::{bind_all, SqlParam};

#[async_trait]
pub trait SqlExecutor: Send {
    /// Runs one or more unparameterized statements (DDL).
    async fn execute_script(&mut self, sql: &str) -> Result<(), PostgresError>;

    /// Runs a parameterized statement and returns the number of rows affected.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, PostgresError>;

    /// Runs a parameterized query and reports whether it returned any row.
    async fn exists(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool, PostgresError>;
}

#[async_trait]
impl SqlExecutor for PgConnection {
    async fn execute_script(&mut self, sql: &str) -> Result<(), PostgresError> {
        // a bare &str runs over the simple query protocol, which accepts
        // several statements at once
        sqlx::Executor::execute(&mut *self, sql).await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, PostgresError> {
        let result = bind_all(sql, params).execute(&mut *self).await?;
        Ok(result.rows_affected())
    }

    async fn exists(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool, PostgresError> {
        let row = bind_all(sql, params).fetch_optional(&mut *self).await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl<'c> SqlExecutor for Transaction<'c, Postgres> {
    async fn execute_script(&mut self, sql: &str) -> Result<(), PostgresError> {
        SqlExecutor::execute_script(&mut **self, sql).await
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, PostgresError> {
        SqlExecutor::execute(&mut **self, sql, params).await
    }

    async fn exists(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool, PostgresError> {
        SqlExecutor::exists(&mut **self, sql, params).await
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! An in-memory executor that records statements.

    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, Default)]
    pub struct RecordingExecutor {
        pub statements: Vec<(String, Vec<SqlParam>)>,
        /// Answers for `exists` queries, matched on the first parameter's text.
        pub existing: HashSet<String>,
        /// Default answer when nothing in `existing` matches.
        pub exists_default: bool,
    }

    impl RecordingExecutor {
        pub fn sql(&self) -> Vec<&str> {
            self.statements.iter().map(|(sql, _)| sql.as_str()).collect()
        }

        pub fn count_prefix(&self, prefix: &str) -> usize {
            self.statements.iter().filter(|(sql, _)| sql.starts_with(prefix)).count()
        }
    }

    #[async_trait]
    impl SqlExecutor for RecordingExecutor {
        async fn execute_script(&mut self, sql: &str) -> Result<(), PostgresError> {
            self.statements.push((sql.to_string(), vec![]));
            Ok(())
        }

        async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<u64, PostgresError> {
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        async fn exists(&mut self, sql: &str, params: &[SqlParam]) -> Result<bool, PostgresError> {
            self.statements.push((sql.to_string(), params.to_vec()));
            let hit = match params.first() {
                Some(SqlParam::Text(s)) => self.existing.contains(s),
                _ => false,
            };
            Ok(hit || self.exists_default)
        }
    }
}
