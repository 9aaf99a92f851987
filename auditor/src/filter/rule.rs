//! Declarative suppression rule.

use super::ExceptionFilter;
use super::pattern::{CoordinatePattern, WholeMatch};
use crate::validation::{ErrorKind, ValidationError};

/// Suppresses errors that match every criterion it specifies.
///
/// Unset criteria match anything. A rule built with
/// [`ExceptionFilterRule::default`] therefore ignores every error.
///
/// # Examples
///
/// ```
/// use repository_auditor::filter::ExceptionFilter;
/// use repository_auditor::filter::pattern::WholeMatch;
/// use repository_auditor::filter::rule::ExceptionFilterRule;
/// use repository_auditor::validation::{ErrorKind, ValidationError};
///
/// let rule = ExceptionFilterRule::default()
///     .with_file(WholeMatch::new("org/legacy/.*").unwrap());
/// let error = ValidationError::new(
///     "checksum",
///     "org/legacy/old/1.0/old-1.0.jar",
///     ErrorKind::ChecksumMissing,
///     "missing sha1",
/// );
/// assert!(rule.should_ignore(&error));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExceptionFilterRule {
    kind: Option<ErrorKind>,
    missing: Option<CoordinatePattern>,
    origin: Option<CoordinatePattern>,
    file: Option<WholeMatch>,
    message: Option<WholeMatch>,
}

impl ExceptionFilterRule {
    /// Restrict the rule to errors of exactly `kind`.
    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restrict the rule to errors whose missing coordinate matches.
    #[must_use]
    pub fn with_missing(mut self, pattern: CoordinatePattern) -> Self {
        self.missing = Some(pattern);
        self
    }

    /// Restrict the rule to errors whose originating coordinate matches.
    #[must_use]
    pub fn with_origin(mut self, pattern: CoordinatePattern) -> Self {
        self.origin = Some(pattern);
        self
    }

    /// Restrict the rule to errors whose file path matches.
    #[must_use]
    pub fn with_file(mut self, pattern: WholeMatch) -> Self {
        self.file = Some(pattern);
        self
    }

    /// Restrict the rule to errors whose message matches.
    #[must_use]
    pub fn with_message(mut self, pattern: WholeMatch) -> Self {
        self.message = Some(pattern);
        self
    }
}

/// An unset criterion is a wildcard; a set coordinate criterion fails
/// when the error carries no such coordinate.
fn coordinate_criterion(
    pattern: Option<&CoordinatePattern>,
    coordinate: Option<&crate::coordinate::ArtifactCoordinate>,
) -> bool {
    match (pattern, coordinate) {
        (None, _) => true,
        (Some(pattern), Some(coordinate)) => pattern.matches(coordinate),
        (Some(_), None) => false,
    }
}

impl ExceptionFilter for ExceptionFilterRule {
    fn should_ignore(&self, error: &ValidationError) -> bool {
        self.kind.is_none_or(|kind| kind == error.kind())
            && coordinate_criterion(self.missing.as_ref(), error.missing_coordinate())
            && coordinate_criterion(self.origin.as_ref(), error.originating_coordinate())
            && self
                .file
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(error.file().as_str()))
            && self
                .message
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(error.message()))
    }
}
