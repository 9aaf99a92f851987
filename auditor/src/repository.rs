//! Repository scanning.
//!
//! Walks a root directory and produces [`RepositoryFile`] entries with paths
//! relative to that root. Scans are sorted by relative path so that every
//! consumer sees the same order on an unchanged tree.

use crate::coordinate::ArtifactCoordinate;
use crate::digest::DigestAlgorithm;
use camino::{Utf8Path, Utf8PathBuf};
use std::io;
use walkdir::WalkDir;

/// Extensions of files that describe other files rather than being
/// artifacts themselves.
const ANCILLARY_EXTENSIONS: &[&str] = &["md5", "sha1", "sha256", "sha512", "asc"];

/// Name of the per-artifact metadata index written by Maven deployers.
const METADATA_FILE_PREFIX: &str = "maven-metadata";

/// One file found under a scanned root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RepositoryFile {
    relative: Utf8PathBuf,
    absolute: Utf8PathBuf,
    coordinate: Option<ArtifactCoordinate>,
}

impl RepositoryFile {
    /// Describe the file at `relative` below `root`.
    ///
    /// The coordinate is derived from the Maven layout of `relative`.
    #[must_use]
    pub fn new(root: &Utf8Path, relative: Utf8PathBuf) -> Self {
        let coordinate = ArtifactCoordinate::from_repository_path(&relative);
        Self {
            absolute: root.join(&relative),
            relative,
            coordinate,
        }
    }

    /// Path relative to the scanned root.
    #[must_use]
    pub fn relative(&self) -> &Utf8Path {
        &self.relative
    }

    /// Absolute (root-joined) path.
    #[must_use]
    pub fn absolute(&self) -> &Utf8Path {
        &self.absolute
    }

    /// Last path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.relative.file_name().unwrap_or_default()
    }

    /// Coordinate parsed from the path, if the path follows the layout.
    #[must_use]
    pub fn coordinate(&self) -> Option<&ArtifactCoordinate> {
        self.coordinate.as_ref()
    }

    /// Compute the content hash with `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub fn content_hash(&self, algorithm: DigestAlgorithm) -> io::Result<String> {
        algorithm.hash_file(self.absolute.as_std_path())
    }

    /// Whether this is a checksum sidecar, signature or metadata index.
    #[must_use]
    pub fn is_ancillary(&self) -> bool {
        let name = self.file_name();
        if name.starts_with(METADATA_FILE_PREFIX) {
            return true;
        }
        self.relative
            .extension()
            .is_some_and(|ext| ANCILLARY_EXTENSIONS.contains(&ext))
    }
}

/// Recursively list the regular files below `root`, sorted by relative
/// path.
///
/// A missing root yields an empty list.
///
/// # Errors
///
/// Returns an I/O error if a directory cannot be read or a path is not
/// valid UTF-8.
pub fn scan(root: &Utf8Path) -> io::Result<Vec<RepositoryFile>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("path is not valid UTF-8: {}", entry.path().display()),
            )
        })?;
        let relative = path
            .strip_prefix(root)
            .map_err(|err| io::Error::other(err.to_string()))?;
        files.push(RepositoryFile::new(root, relative.to_owned()));
    }

    files.sort_by(|left, right| left.relative.cmp(&right.relative));
    Ok(files)
}

/// Selects the "archive-like" files that take part in distribution
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFilter {
    extensions: Vec<String>,
    excluded_classifiers: Vec<String>,
}

impl ArchiveFilter {
    /// Build a filter accepting `extensions` but rejecting files whose stem
    /// ends in `-<classifier>` for any of `excluded_classifiers`.
    #[must_use]
    pub fn new(extensions: Vec<String>, excluded_classifiers: Vec<String>) -> Self {
        Self {
            extensions,
            excluded_classifiers,
        }
    }

    /// Accepted extensions, without the leading dot.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Classifiers whose archives are left out.
    #[must_use]
    pub fn excluded_classifiers(&self) -> &[String] {
        &self.excluded_classifiers
    }

    /// Whether `file_name` is an archive that should be reconciled.
    ///
    /// ```
    /// use repository_auditor::repository::ArchiveFilter;
    ///
    /// let filter = ArchiveFilter::default();
    /// assert!(filter.accepts("widget-1.0.jar"));
    /// assert!(!filter.accepts("widget-1.0-sources.jar"));
    /// assert!(!filter.accepts("widget-1.0.pom"));
    /// ```
    #[must_use]
    pub fn accepts(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|extension| {
            file_name
                .strip_suffix(extension.as_str())
                .and_then(|rest| rest.strip_suffix('.'))
                .is_some_and(|stem| !stem.is_empty() && !self.is_excluded_stem(stem))
        })
    }

    fn is_excluded_stem(&self, stem: &str) -> bool {
        self.excluded_classifiers.iter().any(|classifier| {
            stem.strip_suffix(classifier.as_str())
                .is_some_and(|rest| rest.ends_with('-'))
        })
    }

    /// Scan `root` and keep the files this filter accepts.
    ///
    /// # Errors
    ///
    /// Propagates scan failures from [`scan`].
    pub fn scan(&self, root: &Utf8Path) -> io::Result<Vec<RepositoryFile>> {
        Ok(scan(root)?
            .into_iter()
            .filter(|file| self.accepts(file.file_name()))
            .collect())
    }
}

impl Default for ArchiveFilter {
    fn default() -> Self {
        Self::new(
            ["jar", "war", "ear", "rar", "zip"]
                .map(str::to_owned)
                .to_vec(),
            ["sources", "javadoc", "tests", "test-sources"]
                .map(str::to_owned)
                .to_vec(),
        )
    }
}
