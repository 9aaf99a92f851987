//! Whole-string regex patterns and structured coordinate patterns.

use crate::coordinate::ArtifactCoordinate;
use regex::Regex;
use std::fmt;
use thiserror::Error;

/// A pattern failed to compile.
#[derive(Debug, Clone, Error)]
#[error("invalid pattern \"{pattern}\"")]
pub struct PatternError {
    /// The rejected pattern text.
    pub pattern: String,
    /// Regex compiler diagnostic.
    #[source]
    pub source: regex::Error,
}

/// A regex that must match the whole candidate string.
#[derive(Debug, Clone)]
pub struct WholeMatch {
    source: String,
    regex: Regex,
}

impl WholeMatch {
    /// Compile `pattern`, anchoring it at both ends.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| PatternError {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// Whether the whole of `candidate` matches.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for WholeMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// How a [`CoordinatePattern`] treats the classifier segment.
#[derive(Debug, Clone)]
pub enum ClassifierMatch {
    /// Match against `group:name:extension:version`; the classifier is not
    /// considered.
    Ignored,
    /// Match against the full canonical string, classifier included when
    /// the coordinate has one.
    Embedded,
    /// Match the classifier-less string with the main pattern and the
    /// classifier (empty when absent) with this pattern.
    Separate(WholeMatch),
}

/// Pattern over the canonical string form of an [`ArtifactCoordinate`].
#[derive(Debug, Clone)]
pub struct CoordinatePattern {
    coordinate: WholeMatch,
    classifier: ClassifierMatch,
}

impl CoordinatePattern {
    /// Build a pattern with explicit classifier handling.
    #[must_use]
    pub fn new(coordinate: WholeMatch, classifier: ClassifierMatch) -> Self {
        Self {
            coordinate,
            classifier,
        }
    }

    /// Convert a single-string pattern as written in older ignore lists.
    ///
    /// Those lists never said whether a pattern covered the classifier;
    /// it was inferred from the number of `:` separators, four or more
    /// meaning a five-segment `group:name:extension:classifier:version`
    /// pattern. That inference is fragile (a `:` inside a character class
    /// counts too) and is kept only here, for compatibility. New
    /// configuration should state the classifier handling explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern is not a valid regex.
    ///
    /// ```
    /// use repository_auditor::coordinate::ArtifactCoordinate;
    /// use repository_auditor::filter::pattern::CoordinatePattern;
    ///
    /// let with_classifier = CoordinatePattern::from_legacy("org.acme:.*:jar:sources:.*").unwrap();
    /// let sources: ArtifactCoordinate = "org.acme:widget:jar:sources:1.0".parse().unwrap();
    /// assert!(with_classifier.matches(&sources));
    /// ```
    pub fn from_legacy(pattern: &str) -> Result<Self, PatternError> {
        let classifier = if pattern.matches(':').count() >= 4 {
            ClassifierMatch::Embedded
        } else {
            ClassifierMatch::Ignored
        };
        Ok(Self::new(WholeMatch::new(pattern)?, classifier))
    }

    /// Whether `coordinate` matches this pattern.
    #[must_use]
    pub fn matches(&self, coordinate: &ArtifactCoordinate) -> bool {
        match &self.classifier {
            ClassifierMatch::Ignored => self.coordinate.is_match(&coordinate.without_classifier()),
            ClassifierMatch::Embedded => self.coordinate.is_match(&coordinate.to_string()),
            ClassifierMatch::Separate(classifier) => {
                self.coordinate.is_match(&coordinate.without_classifier())
                    && classifier.is_match(coordinate.classifier().unwrap_or_default())
            }
        }
    }
}
