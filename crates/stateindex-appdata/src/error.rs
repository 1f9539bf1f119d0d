//! Error types for listeners and the async listener pipeline.

use stateindex_schema::SchemaError;
use thiserror::Error;

/// Boxed error returned by listener callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by listener callbacks or by the pipeline around them.
///
/// A callback error inside an [`AsyncListener`](crate::AsyncListener) is
/// sticky: it is reported once, at the next commit, and the worker stops.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener callback failed: {0}")]
    Callback(#[source] BoxError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("listener pipeline has been shut down")]
    Shutdown,

    #[error("async listener worker has stopped")]
    WorkerStopped,

    #[error("{0}")]
    Other(String),
}

impl ListenerError {
    /// Wraps any error raised inside a listener callback.
    pub fn callback(err: impl Into<BoxError>) -> Self {
        Self::Callback(err.into())
    }

    /// Returns `true` if the error comes from the pipeline itself
    /// (shutdown or a stopped worker) rather than from a listener.
    pub fn is_pipeline(&self) -> bool {
        matches!(self, Self::Shutdown | Self::WorkerStopped)
    }
}
