use stateindex_schema::SchemaError;
use thiserror::Error;

/// Errors from generating or executing materialization SQL.
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to write generated SQL")]
    Generation(#[from] std::fmt::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("failed to check if enum type {type_name:?} exists: {source}")]
    EnumCatalog {
        type_name: String,
        #[source]
        source: Box<PostgresError>,
    },
}

impl PostgresError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

impl From<PostgresError> for stateindex_appdata::ListenerError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Schema(e) => Self::Schema(e),
            other => Self::callback(other),
        }
    }
}
