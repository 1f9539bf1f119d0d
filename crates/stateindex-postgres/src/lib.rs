//! stateindex-postgres: materializes object updates into PostgreSQL.
//!
//! # Architecture
//!
//! ```text
//! PostgresIndexer (Listener)
//!   ├── TransactionSource   (begin / commit / rollback; PgPool)
//!   └── ModuleManager       (one per module)
//!         ├── EnumRegistry  (enum types created by this manager)
//!         └── TableManager  (one per object type: DDL, delete, insert/update)
//!                 └── SqlExecutor (caller-owned connection or transaction)
//! ```
//!
//! Tables are named `{module}_{object type}` and enum types
//! `{module}_{enum}`. All SQL is generated into a `fmt::Write` sink first,
//! so it can be inspected without a database.

pub mod column;
pub mod enums;
pub mod error;
pub mod executor;
pub mod indexer;
pub mod module;
pub mod options;
pub mod params;
pub mod table;

pub use column::{column_type, quote_identifier};
pub use enums::{
    create_enum_type, create_enum_type_sql, create_enum_types_for_fields, enum_type_name,
    EnumRegistry,
};
pub use error::PostgresError;
pub use executor::SqlExecutor;
pub use indexer::{PostgresIndexer, TransactionSource};
pub use module::ModuleManager;
pub use options::Options;
pub use params::{ParamType, SqlParam};
pub use table::TableManager;
