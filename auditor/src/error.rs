//! Run-level error types.
//!
//! Domain problems found in the repository are never errors here: they are
//! recorded as [`crate::validation::ValidationError`]s. [`AuditorError`]
//! covers the failures that stop a run from producing a verdict at all.

use crate::config::ConfigError;
use crate::report::ReportError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort an audit run.
#[derive(Debug, Error)]
pub enum AuditorError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The repository root is missing or not a directory.
    #[error("repository root {path} is not a directory")]
    RepositoryNotFound {
        /// Path given for the repository.
        path: Utf8PathBuf,
    },

    /// A reporter failed.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Convenience alias for results with [`AuditorError`].
pub type Result<T> = std::result::Result<T, AuditorError>;
