//! `auditor.toml` configuration.
//!
//! The file is optional. Every table and field falls back to its default
//! when omitted; unknown fields are rejected so that typos surface instead
//! of silently disabling a check. Command-line flags override the values
//! loaded here.
//!
//! ```toml
//! [audit]
//! report = "audit-report.txt"
//! max_connections = 16
//!
//! [distribution]
//! path = "target/dist"
//! algorithm = "sha256"
//!
//! [checksums]
//! algorithms = ["sha1", "sha256"]
//!
//! [[remote]]
//! url = "https://repo.example.test/maven2"
//! flavor = "nexus"
//!
//! [[ignore]]
//! kind = "ResolutionFailure"
//! missing = "org.legacy:.*"
//! ```

use crate::digest::DigestAlgorithm;
use crate::filter::pattern::{ClassifierMatch, CoordinatePattern, PatternError, WholeMatch};
use crate::filter::rule::ExceptionFilterRule;
use crate::filter::{ExceptionFilter, FilterChain};
use crate::repository::ArchiveFilter;
use crate::validation::kind::UnknownErrorKind;
use crate::validation::ErrorKind;
use crate::validators::AuditSettings;
use crate::validators::remote::comparator::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_TIMEOUT, RemoteSettings,
};
use crate::validators::remote::{RegistryFlavor, RemoteRepository, RemoteSpecError};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use thiserror::Error;

/// Conventional configuration file name, looked up in the working
/// directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "auditor.toml";

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration {path}")]
    Read {
        /// Configuration path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid configuration {path}")]
    Parse {
        /// Configuration path.
        path: Utf8PathBuf,
        /// TOML diagnostic.
        #[source]
        source: toml::de::Error,
    },

    /// An ignore rule carries an invalid regex.
    #[error("ignore rule {index} has an invalid pattern")]
    Pattern {
        /// Zero-based rule index.
        index: usize,
        /// Regex diagnostic.
        #[source]
        source: PatternError,
    },

    /// An ignore rule names an unknown error kind.
    #[error("ignore rule {index} has an invalid kind")]
    Kind {
        /// Zero-based rule index.
        index: usize,
        /// The unrecognised kind.
        #[source]
        source: UnknownErrorKind,
    },

    /// A remote repository entry is invalid.
    #[error("invalid remote repository")]
    Remote(#[from] RemoteSpecError),

    /// A numeric setting is out of range.
    #[error("{field} must be {requirement}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// What the value must satisfy.
        requirement: &'static str,
    },
}

/// Parsed `auditor.toml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditorConfig {
    /// Report outputs and remote comparison tuning.
    pub audit: AuditSection,
    /// Distribution reconciliation.
    pub distribution: DistributionSection,
    /// Checksum sidecar requirements.
    pub checksums: ChecksumSection,
    /// Remote registries to compare against.
    pub remote: Vec<RemoteEntry>,
    /// Suppression rules.
    pub ignore: Vec<IgnoreEntry>,
}

/// `[audit]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuditSection {
    /// Text report of reported errors.
    pub report: Option<Utf8PathBuf>,
    /// Text report of ignored errors.
    pub ignored_report: Option<Utf8PathBuf>,
    /// JSON report of both lists.
    pub json_report: Option<Utf8PathBuf>,
    /// Concurrent remote connections.
    pub max_connections: usize,
    /// Bound, in seconds, on the whole remote comparison.
    pub remote_timeout_secs: u64,
    /// Bound, in seconds, on each remote request.
    pub request_timeout_secs: u64,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            report: None,
            ignored_report: None,
            json_report: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            remote_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// `[distribution]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DistributionSection {
    /// Prepared distribution bundle.
    pub path: Option<Utf8PathBuf>,
    /// Trusted reference cache.
    pub cache: Option<Utf8PathBuf>,
    /// Archive extensions taking part in reconciliation.
    pub extensions: Vec<String>,
    /// Classifiers excluded from reconciliation.
    pub excluded_classifiers: Vec<String>,
    /// Content digest used for reconciliation.
    pub algorithm: DigestAlgorithm,
}

impl Default for DistributionSection {
    fn default() -> Self {
        let settings = AuditSettings::default();
        Self {
            path: None,
            cache: None,
            extensions: settings.archive_filter.extensions().to_vec(),
            excluded_classifiers: settings.archive_filter.excluded_classifiers().to_vec(),
            algorithm: settings.distribution_algorithm,
        }
    }
}

/// `[checksums]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChecksumSection {
    /// Algorithms whose sidecars every artifact must have.
    pub algorithms: Vec<DigestAlgorithm>,
}

impl Default for ChecksumSection {
    fn default() -> Self {
        Self {
            algorithms: AuditSettings::default().checksum_algorithms,
        }
    }
}

/// One `[[remote]]` entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RemoteEntry {
    /// Registry base URL.
    pub url: String,
    /// Registry implementation.
    #[serde(default)]
    pub flavor: RegistryFlavor,
}

/// One `[[ignore]]` entry. Omitted criteria match anything.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IgnoreEntry {
    /// Exact error kind name.
    pub kind: Option<String>,
    /// Pattern over the missing coordinate.
    pub missing: Option<String>,
    /// Separate pattern over the missing coordinate's classifier.
    pub missing_classifier: Option<String>,
    /// Pattern over the originating coordinate.
    pub origin: Option<String>,
    /// Separate pattern over the originating coordinate's classifier.
    pub origin_classifier: Option<String>,
    /// Pattern over the file path.
    pub file: Option<String>,
    /// Pattern over the message.
    pub message: Option<String>,
}

/// Build a coordinate pattern; without a classifier pattern the legacy
/// single-string conversion decides how the classifier is treated.
fn coordinate_pattern(
    pattern: &str,
    classifier: Option<&str>,
) -> Result<CoordinatePattern, PatternError> {
    match classifier {
        Some(classifier) => Ok(CoordinatePattern::new(
            WholeMatch::new(pattern)?,
            ClassifierMatch::Separate(WholeMatch::new(classifier)?),
        )),
        None => CoordinatePattern::from_legacy(pattern),
    }
}

impl IgnoreEntry {
    /// Convert to a filter rule; `index` identifies the entry in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Kind`] or [`ConfigError::Pattern`] for
    /// invalid criteria.
    pub fn to_rule(&self, index: usize) -> Result<ExceptionFilterRule, ConfigError> {
        let pattern_error = |source| ConfigError::Pattern { index, source };
        let mut rule = ExceptionFilterRule::default();
        if let Some(kind) = &self.kind {
            let kind: ErrorKind = kind
                .parse()
                .map_err(|source| ConfigError::Kind { index, source })?;
            rule = rule.with_kind(kind);
        }
        if let Some(missing) = &self.missing {
            rule = rule.with_missing(
                coordinate_pattern(missing, self.missing_classifier.as_deref())
                    .map_err(pattern_error)?,
            );
        }
        if let Some(origin) = &self.origin {
            rule = rule.with_origin(
                coordinate_pattern(origin, self.origin_classifier.as_deref())
                    .map_err(pattern_error)?,
            );
        }
        if let Some(file) = &self.file {
            rule = rule.with_file(WholeMatch::new(file).map_err(pattern_error)?);
        }
        if let Some(message) = &self.message {
            rule = rule.with_message(WholeMatch::new(message).map_err(pattern_error)?);
        }
        Ok(rule)
    }
}

impl AuditorConfig {
    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Load `path` when given, otherwise `auditor.toml` in the working
    /// directory if it exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Propagates [`AuditorConfig::load`] failures.
    pub fn discover(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None if Utf8Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load(Utf8Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    /// The suppression rules as one filter chain, in file order.
    ///
    /// # Errors
    ///
    /// Returns the first invalid rule's error.
    pub fn filter_chain(&self) -> Result<FilterChain, ConfigError> {
        let filters = self
            .ignore
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .to_rule(index)
                    .map(|rule| Box::new(rule) as Box<dyn ExceptionFilter>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterChain::new(filters))
    }

    /// The configured remote registries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Remote`] for an invalid URL.
    pub fn remote_repositories(&self) -> Result<Vec<RemoteRepository>, ConfigError> {
        self.remote
            .iter()
            .map(|entry| RemoteRepository::new(entry.url.as_str(), entry.flavor).map_err(Into::into))
            .collect()
    }

    /// Validator tuning derived from the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] when a count or timeout is zero.
    pub fn settings(&self) -> Result<AuditSettings, ConfigError> {
        if self.audit.max_connections == 0 {
            return Err(ConfigError::OutOfRange {
                field: "audit.max_connections",
                requirement: "at least 1",
            });
        }
        if self.audit.remote_timeout_secs == 0 || self.audit.request_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "audit timeouts",
                requirement: "at least 1 second",
            });
        }
        Ok(AuditSettings {
            checksum_algorithms: self.checksums.algorithms.clone(),
            archive_filter: ArchiveFilter::new(
                self.distribution.extensions.clone(),
                self.distribution.excluded_classifiers.clone(),
            ),
            distribution_algorithm: self.distribution.algorithm,
            remote: RemoteSettings {
                max_connections: self.audit.max_connections,
                timeout: Duration::from_secs(self.audit.remote_timeout_secs),
                request_timeout: Duration::from_secs(self.audit.request_timeout_secs),
            },
        })
    }
}
