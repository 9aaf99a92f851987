//! Plain-text report.
//!
//! Errors are grouped by kind. Each group opens with
//! `<kind> (total count N)`, where `N` counts every recorded error of that
//! kind, followed by one line per distinct occurrence with its causes
//! indented four spaces per nesting level. Groups are sorted by kind name
//! and occurrences by message; a blank line separates groups. External
//! tooling scrapes this layout, so it must not change.

use super::{ReportError, Reporter, write_report};
use crate::validation::{ValidationContext, ValidationError};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const INDENT: &str = "    ";

/// Which of the context's lists a [`TextReporter`] renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Errors that remain after filtering.
    Reported,
    /// Errors suppressed by ignore rules.
    Ignored,
}

/// Writes one list of the context as a text report.
#[derive(Debug, Clone)]
pub struct TextReporter {
    path: Utf8PathBuf,
    scope: ReportScope,
}

impl TextReporter {
    /// Report the errors that remain after filtering.
    #[must_use]
    pub fn errors(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            scope: ReportScope::Reported,
        }
    }

    /// Report the errors that ignore rules suppressed.
    #[must_use]
    pub fn ignored(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            scope: ReportScope::Ignored,
        }
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Reporter for TextReporter {
    fn name(&self) -> &'static str {
        match self.scope {
            ReportScope::Reported => "text",
            ReportScope::Ignored => "ignored-text",
        }
    }

    fn report(&self, ctx: &ValidationContext) -> Result<(), ReportError> {
        let rendered = match self.scope {
            ReportScope::Reported => render(&ctx.errors()),
            ReportScope::Ignored => render(ctx.ignored_errors()),
        };
        write_report(&self.path, &rendered)
    }
}

/// Occurrences of one kind: total count and the distinct
/// `(message, causes)` pairs.
#[derive(Default)]
struct Group<'a> {
    total: usize,
    occurrences: BTreeSet<(&'a str, &'a [String])>,
}

/// The text report layout of a list of errors.
struct Layout<'a> {
    groups: BTreeMap<&'static str, Group<'a>>,
}

impl<'a> Layout<'a> {
    fn new(errors: &'a [ValidationError]) -> Self {
        let mut groups: BTreeMap<&'static str, Group<'a>> = BTreeMap::new();
        for error in errors {
            let group = groups.entry(error.kind().name()).or_default();
            group.total += 1;
            group.occurrences.insert((error.message(), error.causes()));
        }
        Self { groups }
    }
}

impl fmt::Display for Layout<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (kind, group)) in self.groups.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{kind} (total count {})", group.total)?;
            for (message, causes) in &group.occurrences {
                writeln!(f, "{message}")?;
                for (depth, cause) in causes.iter().enumerate() {
                    writeln!(f, "{}{cause}", INDENT.repeat(depth + 1))?;
                }
            }
        }
        Ok(())
    }
}

/// Render `errors` in the text report layout.
///
/// An empty list renders as an empty string.
#[must_use]
pub fn render(errors: &[ValidationError]) -> String {
    Layout::new(errors).to_string()
}
