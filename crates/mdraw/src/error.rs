//! CLI error types.

use std::path::PathBuf;

use mdraw_config::ConfigError;
use mdraw_escape::{EscapeError, UnescapeError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Escape(#[from] EscapeError),

    #[error("{path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: UnescapeError,
    },
}
