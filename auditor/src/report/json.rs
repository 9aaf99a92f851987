//! JSON report of both error lists.
//!
//! ```json
//! {
//!   "errors": [{ "kind": "ChecksumMissing", "source": "checksum", ... }],
//!   "ignored": []
//! }
//! ```
//!
//! Entries are sorted by kind name, file and message so the output does not
//! depend on the order validators recorded them.

use super::{ReportError, Reporter, write_report};
use crate::validation::{ValidationContext, ValidationError};
use camino::Utf8PathBuf;
use serde::Serialize;

#[derive(Serialize)]
struct Document<'a> {
    errors: Vec<&'a ValidationError>,
    ignored: Vec<&'a ValidationError>,
}

fn sorted(errors: &[ValidationError]) -> Vec<&ValidationError> {
    let mut sorted: Vec<&ValidationError> = errors.iter().collect();
    sorted.sort_by(|left, right| {
        (left.kind().name(), left.file(), left.message())
            .cmp(&(right.kind().name(), right.file(), right.message()))
    });
    sorted
}

/// Render the context's reported and ignored errors as pretty JSON.
///
/// # Errors
///
/// Returns the serialiser error; the document shape makes this
/// unreachable in practice.
pub fn render(ctx: &ValidationContext) -> Result<String, serde_json::Error> {
    let errors = ctx.errors();
    let document = Document {
        errors: sorted(&errors),
        ignored: sorted(ctx.ignored_errors()),
    };
    let mut rendered = serde_json::to_string_pretty(&document)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Writes [`render`] output to a file.
#[derive(Debug, Clone)]
pub struct JsonReporter {
    path: Utf8PathBuf,
}

impl JsonReporter {
    /// Write the report to `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    fn report(&self, ctx: &ValidationContext) -> Result<(), ReportError> {
        let rendered = render(ctx).map_err(|source| ReportError::Encode {
            path: self.path.clone(),
            source,
        })?;
        write_report(&self.path, &rendered)
    }
}
