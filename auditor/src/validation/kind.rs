//! Error kind discriminator.
//!
//! Every recorded error carries one [`ErrorKind`] set when it is created.
//! Filters and reports compare kinds by value; there is no notion of one
//! kind refining another.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Discriminator tag of a [`super::ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// A dependency of an artifact could not be resolved.
    ResolutionFailure,
    /// A dependency managed by a bill of materials could not be resolved.
    BomResolutionFailure,
    /// Two bills of materials manage one artifact at different versions.
    BomAmbiguousVersion,
    /// A bill of materials manages a version the repository does not ship.
    BomUnusedVersion,
    /// A model file could not be read.
    ModelFailure,
    /// An artifact has no checksum sidecar for a required algorithm.
    ChecksumMissing,
    /// A checksum sidecar disagrees with the artifact content.
    ChecksumMismatch,
    /// Repository content is absent from the distribution.
    DistributionMissing,
    /// Distribution content is absent from both repository and cache.
    DistributionRedundant,
    /// The same content appears more than once in the distribution.
    DistributionDuplicate,
    /// Distribution content matches the repository under another name.
    DistributionMisnomer,
    /// A distribution file differs from the same-named repository file.
    DistributionCorrupted,
    /// A remote registry does not hold the artifact.
    RemoteNotFound,
    /// A remote registry serves different content.
    RemoteMismatch,
    /// The remote comparison could not be carried out.
    RemoteTransportFailure,
    /// A validator failed unexpectedly.
    InternalValidatorFailure,
}

impl ErrorKind {
    /// Every kind, in report order.
    pub const ALL: [Self; 16] = [
        Self::BomAmbiguousVersion,
        Self::BomResolutionFailure,
        Self::BomUnusedVersion,
        Self::ChecksumMismatch,
        Self::ChecksumMissing,
        Self::DistributionCorrupted,
        Self::DistributionDuplicate,
        Self::DistributionMisnomer,
        Self::DistributionMissing,
        Self::DistributionRedundant,
        Self::InternalValidatorFailure,
        Self::ModelFailure,
        Self::RemoteMismatch,
        Self::RemoteNotFound,
        Self::RemoteTransportFailure,
        Self::ResolutionFailure,
    ];

    /// Whether this kind reports a distribution reconciliation defect.
    #[must_use]
    pub const fn is_reconciliation(self) -> bool {
        matches!(
            self,
            Self::DistributionMissing
                | Self::DistributionRedundant
                | Self::DistributionDuplicate
                | Self::DistributionMisnomer
                | Self::DistributionCorrupted
        )
    }

    /// Stable name used in reports and configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResolutionFailure => "ResolutionFailure",
            Self::BomResolutionFailure => "BomResolutionFailure",
            Self::BomAmbiguousVersion => "BomAmbiguousVersion",
            Self::BomUnusedVersion => "BomUnusedVersion",
            Self::ModelFailure => "ModelFailure",
            Self::ChecksumMissing => "ChecksumMissing",
            Self::ChecksumMismatch => "ChecksumMismatch",
            Self::DistributionMissing => "DistributionMissing",
            Self::DistributionRedundant => "DistributionRedundant",
            Self::DistributionDuplicate => "DistributionDuplicate",
            Self::DistributionMisnomer => "DistributionMisnomer",
            Self::DistributionCorrupted => "DistributionCorrupted",
            Self::RemoteNotFound => "RemoteNotFound",
            Self::RemoteMismatch => "RemoteMismatch",
            Self::RemoteTransportFailure => "RemoteTransportFailure",
            Self::InternalValidatorFailure => "InternalValidatorFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unrecognised kind name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error kind \"{0}\"")]
pub struct UnknownErrorKind(pub String);

impl FromStr for ErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == value)
            .ok_or_else(|| UnknownErrorKind(value.to_owned()))
    }
}
