use serde::{Deserialize, Serialize};

/// Deployment-wide materialization options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Keep deleted rows behind a `_deleted` marker for object types that
    /// also set `retain_deletions`. Both flags must be on.
    #[serde(default)]
    pub retain_deletions: bool,
}

impl Options {
    pub fn with_retain_deletions(mut self, retain: bool) -> Self {
        self.retain_deletions = retain;
        self
    }
}
