//! Artifact coordinates and Maven-layout path parsing.
//!
//! A coordinate identifies one artifact file by group, name, extension,
//! optional classifier and version. Its canonical string form is
//! `group:name:extension[:classifier]:version`.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors arising from parsing coordinate strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
    /// The string does not have four or five colon-separated segments.
    #[error("invalid coordinate \"{value}\": expected group:name:extension[:classifier]:version")]
    InvalidFormat {
        /// The rejected coordinate string.
        value: String,
    },

    /// A mandatory segment is empty.
    #[error("invalid coordinate \"{value}\": {segment} must not be empty")]
    EmptySegment {
        /// The rejected coordinate string.
        value: String,
        /// Name of the empty segment.
        segment: &'static str,
    },
}

/// Identifying tuple for a single artifact file.
///
/// # Examples
///
/// ```
/// use repository_auditor::coordinate::ArtifactCoordinate;
///
/// let coordinate: ArtifactCoordinate = "org.acme:widget:jar:sources:1.2".parse().unwrap();
/// assert_eq!(coordinate.classifier(), Some("sources"));
/// assert_eq!(coordinate.to_string(), "org.acme:widget:jar:sources:1.2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct ArtifactCoordinate {
    group: String,
    name: String,
    extension: String,
    classifier: Option<String>,
    version: String,
}

impl ArtifactCoordinate {
    /// Build a coordinate from its parts.
    ///
    /// An empty classifier is normalised to `None`.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        extension: impl Into<String>,
        classifier: Option<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            extension: extension.into(),
            classifier: classifier.filter(|value| !value.is_empty()),
            version: version.into(),
        }
    }

    /// Group identifier, e.g. `org.acme`.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Artifact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File extension, possibly compound (`tar.gz`).
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Classifier, when present.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Canonical form without the classifier segment:
    /// `group:name:extension:version`.
    #[must_use]
    pub fn without_classifier(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group, self.name, self.extension, self.version
        )
    }

    /// Key identifying the artifact regardless of version:
    /// `group:name:extension[:classifier]`.
    #[must_use]
    pub fn versionless_key(&self) -> String {
        match &self.classifier {
            Some(classifier) => format!(
                "{}:{}:{}:{classifier}",
                self.group, self.name, self.extension
            ),
            None => format!("{}:{}:{}", self.group, self.name, self.extension),
        }
    }

    /// Return a copy of this coordinate with a different extension and no
    /// classifier; used to address the model file of an artifact.
    #[must_use]
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            extension: extension.to_owned(),
            classifier: None,
            ..self.clone()
        }
    }

    /// Relative repository path of this coordinate in Maven layout.
    ///
    /// ```
    /// use repository_auditor::coordinate::ArtifactCoordinate;
    ///
    /// let coordinate: ArtifactCoordinate = "org.acme:widget:jar:1.2".parse().unwrap();
    /// assert_eq!(coordinate.repository_path(), "org/acme/widget/1.2/widget-1.2.jar");
    /// ```
    #[must_use]
    pub fn repository_path(&self) -> Utf8PathBuf {
        let mut path: Utf8PathBuf = self.group.split('.').collect();
        path.push(&self.name);
        path.push(&self.version);
        let file_name = match &self.classifier {
            Some(classifier) => format!(
                "{}-{}-{classifier}.{}",
                self.name, self.version, self.extension
            ),
            None => format!("{}-{}.{}", self.name, self.version, self.extension),
        };
        path.push(file_name);
        path
    }

    /// Parse a repository-relative path laid out as
    /// `group/path/name/version/name-version[-classifier].ext`.
    ///
    /// Returns `None` when the path does not follow the layout, for example
    /// checksum files of directories or timestamped snapshot files.
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use repository_auditor::coordinate::ArtifactCoordinate;
    ///
    /// let path = Utf8Path::new("org/acme/widget/1.2/widget-1.2-dist.tar.gz");
    /// let coordinate = ArtifactCoordinate::from_repository_path(path).unwrap();
    /// assert_eq!(coordinate.to_string(), "org.acme:widget:tar.gz:dist:1.2");
    /// ```
    #[must_use]
    pub fn from_repository_path(path: &Utf8Path) -> Option<Self> {
        let components: Vec<&str> = path
            .components()
            .filter_map(|component| match component {
                Utf8Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();
        let (file_name, rest) = components.split_last()?;
        let (version, rest) = rest.split_last()?;
        let (name, group_parts) = rest.split_last()?;
        if group_parts.is_empty() {
            return None;
        }

        let prefix = format!("{name}-{version}");
        let remainder = file_name.strip_prefix(prefix.as_str())?;
        let (classifier, extension) = if let Some(ext) = remainder.strip_prefix('.') {
            (None, ext)
        } else {
            let tail = remainder.strip_prefix('-')?;
            let (classifier, ext) = tail.split_once('.')?;
            (Some(classifier.to_owned()), ext)
        };
        if extension.is_empty() {
            return None;
        }

        Some(Self::new(
            group_parts.join("."),
            *name,
            extension,
            classifier,
            *version,
        ))
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(classifier) => write!(
                f,
                "{}:{}:{}:{classifier}:{}",
                self.group, self.name, self.extension, self.version
            ),
            None => f.write_str(&self.without_classifier()),
        }
    }
}

impl From<ArtifactCoordinate> for String {
    fn from(value: ArtifactCoordinate) -> Self {
        value.to_string()
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = CoordinateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = value.split(':').collect();
        let (group, name, extension, classifier, version) = match segments.as_slice() {
            [group, name, extension, version] => (*group, *name, *extension, None, *version),
            [group, name, extension, classifier, version] => (
                *group,
                *name,
                *extension,
                Some((*classifier).to_owned()),
                *version,
            ),
            _ => {
                return Err(CoordinateError::InvalidFormat {
                    value: value.to_owned(),
                });
            }
        };

        for (segment, content) in [
            ("group", group),
            ("name", name),
            ("extension", extension),
            ("version", version),
        ] {
            if content.is_empty() {
                return Err(CoordinateError::EmptySegment {
                    value: value.to_owned(),
                    segment,
                });
            }
        }

        Ok(Self::new(group, name, extension, classifier, version))
    }
}
