//! Comparison of local artifacts against remote registries.
//!
//! Files already published to a registry must still be byte-identical
//! there. The comparison never downloads artifact bodies: a `HEAD` probe
//! returns response metadata and a registry-specific
//! [`strategy::ChecksumExtractionStrategy`] derives a digest from it.
//!
//! # Sub-modules
//!
//! - [`client`] - The probe transport and its `ureq` implementation.
//! - [`strategy`] - Per-registry digest extraction.
//! - [`comparator`] - The concurrent [`comparator::RemoteComparator`]
//!   validator.

pub mod client;
pub mod comparator;
pub mod strategy;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Registry implementation behind a remote repository URL.
///
/// Each flavour encodes content digests differently in its response
/// headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryFlavor {
    /// Sonatype Nexus.
    #[default]
    Nexus,
    /// JFrog Artifactory.
    Artifactory,
    /// A plain Apache HTTP server exposing a directory tree.
    Apache,
}

impl RegistryFlavor {
    /// Every flavour in declaration order.
    pub const ALL: [Self; 3] = [Self::Nexus, Self::Artifactory, Self::Apache];

    /// Lowercase name used in configuration and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nexus => "nexus",
            Self::Artifactory => "artifactory",
            Self::Apache => "apache",
        }
    }
}

impl fmt::Display for RegistryFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A remote repository specification could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteSpecError {
    /// The URL part was empty.
    #[error("remote repository URL must not be empty")]
    EmptyUrl,
    /// The URL does not use an HTTP scheme.
    #[error("remote repository URL must start with http:// or https://: {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
    },
}

/// One remote registry to compare against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    url: String,
    flavor: RegistryFlavor,
}

impl RemoteRepository {
    /// Describe the registry rooted at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteSpecError`] if `url` is empty or not HTTP(S).
    pub fn new(url: impl Into<String>, flavor: RegistryFlavor) -> Result<Self, RemoteSpecError> {
        let url = url.into();
        let url = url.trim_end_matches('/');
        if url.is_empty() {
            return Err(RemoteSpecError::EmptyUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RemoteSpecError::UnsupportedScheme {
                url: url.to_owned(),
            });
        }
        Ok(Self {
            url: url.to_owned(),
            flavor,
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Registry implementation.
    #[must_use]
    pub const fn flavor(&self) -> RegistryFlavor {
        self.flavor
    }

    /// URL of the file at the `/`-separated `relative` path.
    ///
    /// The path goes before any query string of the base URL.
    #[must_use]
    pub fn artifact_url(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        match self.url.split_once('?') {
            Some((base, query)) => {
                format!("{}/{relative}?{query}", base.trim_end_matches('/'))
            }
            None => format!("{}/{relative}", self.url),
        }
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.flavor, self.url)
    }
}

impl FromStr for RemoteRepository {
    type Err = RemoteSpecError;

    /// Parse `[flavor=]URL`; the flavour defaults to Nexus.
    ///
    /// ```
    /// use repository_auditor::validators::remote::{RegistryFlavor, RemoteRepository};
    ///
    /// let remote: RemoteRepository = "apache=https://repo.example.test/maven2/".parse().unwrap();
    /// assert_eq!(remote.flavor(), RegistryFlavor::Apache);
    /// assert_eq!(remote.url(), "https://repo.example.test/maven2");
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let explicit = value.split_once('=').and_then(|(prefix, url)| {
            RegistryFlavor::ALL
                .into_iter()
                .find(|flavor| flavor.name().eq_ignore_ascii_case(prefix.trim()))
                .map(|flavor| (flavor, url))
        });
        match explicit {
            Some((flavor, url)) => Self::new(url.trim(), flavor),
            None => Self::new(value.trim(), RegistryFlavor::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_flavor("https://repo.test/m2", RegistryFlavor::Nexus, "https://repo.test/m2")]
    #[case::explicit("artifactory=https://repo.test/", RegistryFlavor::Artifactory, "https://repo.test")]
    #[case::case_insensitive("APACHE=http://repo.test", RegistryFlavor::Apache, "http://repo.test")]
    #[case::query_equals(
        "https://repo.test/m2?token=abc",
        RegistryFlavor::Nexus,
        "https://repo.test/m2?token=abc"
    )]
    fn parses_flavor_prefix(
        #[case] input: &str,
        #[case] flavor: RegistryFlavor,
        #[case] url: &str,
    ) {
        let remote: RemoteRepository = input.parse().expect("valid remote");
        assert_eq!(remote.flavor(), flavor);
        assert_eq!(remote.url(), url);
    }

    #[rstest]
    #[case::empty("", RemoteSpecError::EmptyUrl)]
    #[case::flavor_only("nexus=", RemoteSpecError::EmptyUrl)]
    #[case::scheme("ftp://repo.test", RemoteSpecError::UnsupportedScheme { url: "ftp://repo.test".to_owned() })]
    fn rejects_invalid_specs(#[case] input: &str, #[case] expected: RemoteSpecError) {
        assert_eq!(input.parse::<RemoteRepository>(), Err(expected));
    }

    #[rstest]
    #[case::plain("https://repo.test/m2", "https://repo.test/m2/org/a/w-1.jar")]
    #[case::query("https://repo.test/m2?token=abc", "https://repo.test/m2/org/a/w-1.jar?token=abc")]
    #[case::slash_before_query(
        "https://repo.test/m2/?token=abc",
        "https://repo.test/m2/org/a/w-1.jar?token=abc"
    )]
    fn artifact_path_precedes_query_string(#[case] base: &str, #[case] expected: &str) {
        let remote: RemoteRepository = base.parse().expect("valid remote");
        assert_eq!(remote.artifact_url("org/a/w-1.jar"), expected);
    }

    #[test]
    fn artifact_url_joins_with_single_slash() {
        let remote = RemoteRepository::new("https://repo.test/m2/", RegistryFlavor::Nexus)
            .expect("valid remote");
        assert_eq!(
            remote.artifact_url("org/a/w/1/w-1.jar"),
            "https://repo.test/m2/org/a/w/1/w-1.jar"
        );
    }
}
