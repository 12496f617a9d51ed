use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: root value must be a JSON object", path.display())]
    InvalidCatalog { path: PathBuf },

    /// A key segment contains the path separator and cannot be flattened unambiguously.
    #[error("key segment `{segment}` under `{parent}` contains the path separator")]
    InvalidKey { parent: String, segment: String },

    /// Two flat keys disagree about whether a path is a leaf or an object.
    #[error("key `{key}` conflicts with an existing value at `{at}`")]
    KeyConflict { key: String, at: String },
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        SyncError::Configuration(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        SyncError::Provider(msg.into())
    }
}
