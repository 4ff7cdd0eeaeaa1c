//! Error types for stagesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry load/save.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure, annotated with the file involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry file exists but is not valid JSON of the expected shape.
    #[error("configuration file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A single entry is missing a required field.
    #[error("configuration file {path}: entry '{id}' is invalid: {reason}")]
    Invalid {
        path: PathBuf,
        id: String,
        reason: String,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while building or applying the [`crate::SyncContext`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--work-root is required. Provide the path to your work directory.")]
    MissingWorkRoot,

    #[error("expected work directory at {path}, but it does not exist")]
    WorkRootNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None` while expanding `~`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("{label} {path} is outside of {root}")]
    OutsideRoot {
        label: String,
        path: PathBuf,
        root: PathBuf,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}
