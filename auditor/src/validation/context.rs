//! Shared accumulator for one audit run.
//!
//! Validators append [`ValidationError`]s to the [`ValidationContext`]; the
//! filter pass then moves suppressed errors to the ignored list and
//! reporters read both lists. Appends go through a mutex so that the
//! remote comparison workers can record outcomes concurrently.

use super::kind::ErrorKind;
use crate::coordinate::ArtifactCoordinate;
use crate::filter::ExceptionFilter;
use crate::validators::remote::RemoteRepository;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::error::Error as StdError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Tree a recorded file path is relative to.
///
/// Repository and distribution often share relative paths, so an error is
/// identified by its root and its path together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileRoot {
    /// The audited repository.
    #[default]
    Repository,
    /// The prepared distribution bundle.
    Distribution,
}

impl FileRoot {
    /// Whether this is the repository root.
    #[must_use]
    pub const fn is_repository(&self) -> bool {
        matches!(self, Self::Repository)
    }
}

/// One recorded consistency problem.
///
/// Immutable once created; the builder-style `with_*` methods consume and
/// return the value before it is handed to the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    kind: ErrorKind,
    source: String,
    #[serde(skip_serializing_if = "FileRoot::is_repository")]
    root: FileRoot,
    file: Utf8PathBuf,
    message: String,
    causes: Vec<String>,
    #[serde(rename = "missing", skip_serializing_if = "Option::is_none")]
    missing_coordinate: Option<ArtifactCoordinate>,
    #[serde(rename = "origin", skip_serializing_if = "Option::is_none")]
    originating_coordinate: Option<ArtifactCoordinate>,
}

impl ValidationError {
    /// Create an error raised by validator `source` against `file`.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            root: FileRoot::Repository,
            file: file.into(),
            message: message.into(),
            causes: Vec::new(),
            missing_coordinate: None,
            originating_coordinate: None,
        }
    }

    /// Create an error from a Rust error value, keeping its `source()`
    /// chain as nested causes.
    #[must_use]
    pub fn from_error(
        source: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        kind: ErrorKind,
        error: &(dyn StdError + 'static),
    ) -> Self {
        let mut causes = Vec::new();
        let mut next = error.source();
        while let Some(cause) = next {
            causes.push(cause.to_string());
            next = cause.source();
        }
        Self::new(source, file, kind, error.to_string()).with_causes(causes)
    }

    /// Record `file` as relative to `root` instead of the repository.
    #[must_use]
    pub const fn with_root(mut self, root: FileRoot) -> Self {
        self.root = root;
        self
    }

    /// Attach nested causes, outermost first.
    #[must_use]
    pub fn with_causes(mut self, causes: Vec<String>) -> Self {
        self.causes = causes;
        self
    }

    /// Attach the coordinate that could not be found.
    #[must_use]
    pub fn with_missing(mut self, coordinate: ArtifactCoordinate) -> Self {
        self.missing_coordinate = Some(coordinate);
        self
    }

    /// Attach the coordinate whose validation raised the error.
    #[must_use]
    pub fn with_origin(mut self, coordinate: ArtifactCoordinate) -> Self {
        self.originating_coordinate = Some(coordinate);
        self
    }

    /// Discriminator kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Name of the validator that recorded the error.
    #[must_use]
    pub fn source_validator(&self) -> &str {
        &self.source
    }

    /// Tree [`Self::file`] is relative to.
    #[must_use]
    pub const fn root(&self) -> FileRoot {
        self.root
    }

    /// File the error belongs to, relative to [`Self::root`].
    #[must_use]
    pub fn file(&self) -> &Utf8Path {
        &self.file
    }

    fn is_repository_file(&self, file: &Utf8Path) -> bool {
        self.root.is_repository() && self.file == file
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Nested causes, outermost first.
    #[must_use]
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// Coordinate that could not be found, for resolution failures.
    #[must_use]
    pub fn missing_coordinate(&self) -> Option<&ArtifactCoordinate> {
        self.missing_coordinate.as_ref()
    }

    /// Coordinate under validation when the error was raised.
    #[must_use]
    pub fn originating_coordinate(&self) -> Option<&ArtifactCoordinate> {
        self.originating_coordinate.as_ref()
    }
}

/// State shared by every validator and reporter of one run.
#[derive(Debug)]
pub struct ValidationContext {
    repository_root: Utf8PathBuf,
    distribution_root: Option<Utf8PathBuf>,
    cache_root: Option<Utf8PathBuf>,
    remote_repositories: Vec<RemoteRepository>,
    errors: Mutex<Vec<ValidationError>>,
    ignored: Vec<ValidationError>,
}

impl ValidationContext {
    /// Create an empty context for the repository at `repository_root`.
    #[must_use]
    pub fn new(repository_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repository_root: repository_root.into(),
            distribution_root: None,
            cache_root: None,
            remote_repositories: Vec::new(),
            errors: Mutex::new(Vec::new()),
            ignored: Vec::new(),
        }
    }

    /// Set the prepared distribution bundle directory.
    #[must_use]
    pub fn with_distribution(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.distribution_root = Some(root.into());
        self
    }

    /// Set the trusted reference cache directory.
    #[must_use]
    pub fn with_cache(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Set the remote registries to compare against.
    #[must_use]
    pub fn with_remote_repositories(mut self, remotes: Vec<RemoteRepository>) -> Self {
        self.remote_repositories = remotes;
        self
    }

    /// Repository root directory.
    #[must_use]
    pub fn repository_root(&self) -> &Utf8Path {
        &self.repository_root
    }

    /// Distribution bundle directory, if one is audited.
    #[must_use]
    pub fn distribution_root(&self) -> Option<&Utf8Path> {
        self.distribution_root.as_deref()
    }

    /// Trusted cache directory, if configured.
    #[must_use]
    pub fn cache_root(&self) -> Option<&Utf8Path> {
        self.cache_root.as_deref()
    }

    /// Remote registries to compare against.
    #[must_use]
    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ValidationError>> {
        // A worker that panicked mid-append cannot leave a half-pushed
        // element behind, so the list is still usable.
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an error. Safe to call from several threads at once.
    pub fn add_error(&self, error: ValidationError) {
        self.lock().push(error);
    }

    /// Errors already recorded against exactly the repository file `file`.
    #[must_use]
    pub fn errors_for(&self, file: &Utf8Path) -> Vec<ValidationError> {
        self.lock()
            .iter()
            .filter(|error| error.is_repository_file(file))
            .cloned()
            .collect()
    }

    /// Whether any error is recorded against exactly the repository file
    /// `file`.
    #[must_use]
    pub fn has_errors_for(&self, file: &Utf8Path) -> bool {
        self.lock().iter().any(|error| error.is_repository_file(file))
    }

    /// Whether later checks of the repository file `file` should be skipped
    /// because an earlier check found the file itself unreliable.
    ///
    /// Reconciliation findings describe the distribution bundle, not the
    /// file, and never count.
    #[must_use]
    pub fn should_skip(&self, file: &Utf8Path) -> bool {
        self.lock()
            .iter()
            .any(|error| error.is_repository_file(file) && !error.kind().is_reconciliation())
    }

    /// Snapshot of the reported (non-ignored) errors in recording order.
    #[must_use]
    pub fn errors(&self) -> Vec<ValidationError> {
        self.lock().clone()
    }

    /// Number of reported errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.lock().len()
    }

    /// Errors suppressed by the filter pass.
    #[must_use]
    pub fn ignored_errors(&self) -> &[ValidationError] {
        &self.ignored
    }

    /// Move every error `filter` ignores to the ignored list.
    ///
    /// Relative order is preserved in both lists. Nothing is dropped.
    pub fn apply_filter(&mut self, filter: &dyn ExceptionFilter) {
        let errors = self
            .errors
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let (ignored, reported): (Vec<_>, Vec<_>) = errors
            .drain(..)
            .partition(|error| filter.should_ignore(error));
        *errors = reported;
        self.ignored.extend(ignored);
    }

    /// Whether the run passed: no reported errors remain.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    struct IgnoreChecksums;

    impl ExceptionFilter for IgnoreChecksums {
        fn should_ignore(&self, error: &ValidationError) -> bool {
            error.kind() == ErrorKind::ChecksumMissing
        }
    }

    fn error(file: &str, kind: ErrorKind) -> ValidationError {
        ValidationError::new("test", file, kind, format!("{kind} at {file}"))
    }

    #[test]
    fn errors_for_uses_exact_file_match() {
        let ctx = ValidationContext::new("/repo");
        ctx.add_error(error("a/b.jar", ErrorKind::ChecksumMismatch));
        ctx.add_error(error("a/b.jar.sha1", ErrorKind::ChecksumMissing));

        let found = ctx.errors_for(Utf8Path::new("a/b.jar"));

        assert_eq!(found.len(), 1);
        assert!(ctx.has_errors_for(Utf8Path::new("a/b.jar.sha1")));
        assert!(!ctx.has_errors_for(Utf8Path::new("a")));
    }

    #[test]
    fn distribution_paths_never_alias_repository_files() {
        let ctx = ValidationContext::new("/repo");
        ctx.add_error(
            error("a/b.jar", ErrorKind::DistributionCorrupted).with_root(FileRoot::Distribution),
        );

        assert!(ctx.errors_for(Utf8Path::new("a/b.jar")).is_empty());
        assert!(!ctx.has_errors_for(Utf8Path::new("a/b.jar")));
        assert_eq!(ctx.errors()[0].root(), FileRoot::Distribution);
    }

    #[test]
    fn reconciliation_findings_do_not_skip_later_checks() {
        let ctx = ValidationContext::new("/repo");
        ctx.add_error(error("a/b.jar", ErrorKind::DistributionMissing));
        ctx.add_error(error("a/c.jar", ErrorKind::ChecksumMismatch));

        assert!(ctx.has_errors_for(Utf8Path::new("a/b.jar")));
        assert!(!ctx.should_skip(Utf8Path::new("a/b.jar")));
        assert!(ctx.should_skip(Utf8Path::new("a/c.jar")));
    }

    #[test]
    fn apply_filter_moves_instead_of_dropping() {
        let mut ctx = ValidationContext::new("/repo");
        ctx.add_error(error("one", ErrorKind::ChecksumMissing));
        ctx.add_error(error("two", ErrorKind::ChecksumMismatch));
        ctx.add_error(error("three", ErrorKind::ChecksumMissing));

        ctx.apply_filter(&IgnoreChecksums);

        let reported: Vec<_> = ctx.errors().iter().map(|e| e.file().to_string()).collect();
        let ignored: Vec<_> = ctx
            .ignored_errors()
            .iter()
            .map(|e| e.file().to_string())
            .collect();
        assert_eq!(reported, vec!["two"]);
        assert_eq!(ignored, vec!["one", "three"]);
        assert!(!ctx.is_success());
    }

    #[test]
    fn success_ignores_the_ignored_list() {
        let mut ctx = ValidationContext::new("/repo");
        ctx.add_error(error("one", ErrorKind::ChecksumMissing));
        ctx.apply_filter(&IgnoreChecksums);

        assert!(ctx.is_success());
        assert_eq!(ctx.ignored_errors().len(), 1);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let ctx = Arc::new(ValidationContext::new("/repo"));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for index in 0..50 {
                        ctx.add_error(error(
                            &format!("w{worker}/f{index}"),
                            ErrorKind::RemoteMismatch,
                        ));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker finished");
        }

        assert_eq!(ctx.error_count(), 400);
    }

    #[test]
    fn from_error_keeps_source_chain() {
        let inner = std::io::Error::other("disk on fire");
        let outer = crate::report::ReportError::Write {
            path: Utf8PathBuf::from("report.txt"),
            source: inner,
        };

        let recorded = ValidationError::from_error(
            "pipeline",
            "/repo",
            ErrorKind::InternalValidatorFailure,
            &outer,
        );

        assert!(recorded.message().contains("report.txt"));
        assert_eq!(recorded.causes(), ["disk on fire".to_owned()]);
    }
}
