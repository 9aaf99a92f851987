//! Report generation from a finished, filtered [`ValidationContext`].
//!
//! # Modules
//!
//! - [`json`] - Machine-readable report of both error lists
//! - [`summary`] - Per-kind counts written to the log
//! - [`text`] - The grouped plain-text report tooling scrapes
//!
//! Reporters run strictly after the filter pass and only read the context.
//! Every reporter sorts what it writes, so two runs over an unchanged
//! repository produce byte-identical files.

pub mod json;
pub mod summary;
pub mod text;

use crate::validation::ValidationContext;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use thiserror::Error;

/// Failures while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The report file could not be written.
    #[error("failed to write report {path}")]
    Write {
        /// Report path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The report could not be encoded.
    #[error("failed to encode report {path}")]
    Encode {
        /// Report path.
        path: Utf8PathBuf,
        /// Serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// Consumes the final context.
pub trait Reporter {
    /// Short reporter name used in log lines.
    fn name(&self) -> &'static str;

    /// Produce the report.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the report cannot be produced.
    fn report(&self, ctx: &ValidationContext) -> Result<(), ReportError>;
}

/// Writes `contents` to `path`, creating missing parent directories.
pub(crate) fn write_report(path: &Utf8Path, contents: &str) -> Result<(), ReportError> {
    let write_error = |source| ReportError::Write {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, contents).map_err(write_error)
}

/// Runs reporters in order.
#[derive(Default)]
pub struct ReportingPipeline {
    reporters: Vec<Box<dyn Reporter>>,
}

impl ReportingPipeline {
    /// Create a pipeline running `reporters` in the given order.
    #[must_use]
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    /// Append a reporter.
    #[must_use]
    pub fn with(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Names of the reporters, in execution order.
    #[must_use]
    pub fn reporter_names(&self) -> Vec<&'static str> {
        self.reporters.iter().map(|reporter| reporter.name()).collect()
    }

    /// Run every reporter against `ctx`.
    ///
    /// A failing reporter does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns the first failure once every reporter has run.
    pub fn run(&self, ctx: &ValidationContext) -> Result<(), ReportError> {
        let mut first_failure = None;
        for reporter in &self.reporters {
            debug!("running reporter {}", reporter.name());
            if let Err(err) = reporter.report(ctx) {
                warn!("reporter {} failed: {err}", reporter.name());
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}
