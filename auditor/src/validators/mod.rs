//! The checks run by the audit.
//!
//! # Modules
//!
//! - [`bom`] - Bill-of-materials version checks
//! - [`checksum`] - Checksum sidecar verification
//! - [`dependency`] - Dependency resolution through a [`dependency::Resolver`]
//! - [`distribution`] - Distribution bundle reconciliation
//! - [`model`] - Project model reading through a [`model::ModelReader`]
//! - [`remote`] - Comparison with remote registries

pub mod bom;
pub mod checksum;
pub mod dependency;
pub mod distribution;
pub mod model;
pub mod remote;

use crate::digest::DigestAlgorithm;
use crate::repository::ArchiveFilter;
use crate::validation::Validator;
use bom::BomValidator;
use checksum::ChecksumValidator;
use dependency::{DependencyValidator, Resolver};
use distribution::DistributionValidator;
use model::{ModelReader, ModelValidator};
use remote::comparator::{RemoteComparator, RemoteSettings};
use std::sync::Arc;

/// Tuning shared by the built-in validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSettings {
    /// Algorithms whose checksum sidecars are required.
    pub checksum_algorithms: Vec<DigestAlgorithm>,
    /// Files that take part in distribution reconciliation.
    pub archive_filter: ArchiveFilter,
    /// Digest used to reconcile the distribution.
    pub distribution_algorithm: DigestAlgorithm,
    /// Remote comparison tuning.
    pub remote: RemoteSettings,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            checksum_algorithms: vec![DigestAlgorithm::Sha1],
            archive_filter: ArchiveFilter::default(),
            distribution_algorithm: DigestAlgorithm::Sha256,
            remote: RemoteSettings::default(),
        }
    }
}

/// External collaborators the model-based validators need.
///
/// Validators whose collaborators are absent are left out of the pipeline.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Project model parser.
    pub model_reader: Option<Arc<dyn ModelReader>>,
    /// Dependency graph resolver.
    pub resolver: Option<Arc<dyn Resolver>>,
}

/// The built-in validators in execution order.
///
/// Checksums run first because every later check trusts file content;
/// models come before the checks that consume them; the network-bound
/// remote comparison runs last and skips everything already flagged.
#[must_use]
pub fn default_validators(
    settings: &AuditSettings,
    collaborators: &Collaborators,
) -> Vec<Box<dyn Validator>> {
    let mut validators: Vec<Box<dyn Validator>> = vec![Box::new(ChecksumValidator::new(
        settings.checksum_algorithms.clone(),
    ))];
    if let Some(reader) = &collaborators.model_reader {
        validators.push(Box::new(ModelValidator::new(Arc::clone(reader))));
        if let Some(resolver) = &collaborators.resolver {
            validators.push(Box::new(DependencyValidator::new(
                Arc::clone(reader),
                Arc::clone(resolver),
            )));
            validators.push(Box::new(BomValidator::new(
                Arc::clone(reader),
                Arc::clone(resolver),
            )));
        }
    }
    validators.push(Box::new(DistributionValidator::new(
        settings.archive_filter.clone(),
        settings.distribution_algorithm,
    )));
    validators.push(Box::new(RemoteComparator::new(settings.remote)));
    validators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubModelReader, StubResolver};
    use rstest::rstest;

    fn names(validators: &[Box<dyn Validator>]) -> Vec<&'static str> {
        validators.iter().map(|validator| validator.name()).collect()
    }

    #[rstest]
    #[case::no_collaborators(false, false, vec!["checksum", "distribution", "remote"])]
    #[case::reader_only(true, false, vec!["checksum", "model", "distribution", "remote"])]
    #[case::resolver_without_reader(false, true, vec!["checksum", "distribution", "remote"])]
    #[case::all(
        true,
        true,
        vec!["checksum", "model", "dependency", "bom", "distribution", "remote"]
    )]
    fn default_order_depends_on_collaborators(
        #[case] with_reader: bool,
        #[case] with_resolver: bool,
        #[case] expected: Vec<&'static str>,
    ) {
        let collaborators = Collaborators {
            model_reader: with_reader
                .then(|| Arc::new(StubModelReader::new()) as Arc<dyn ModelReader>),
            resolver: with_resolver.then(|| Arc::new(StubResolver::new()) as Arc<dyn Resolver>),
        };

        let validators = default_validators(&AuditSettings::default(), &collaborators);

        assert_eq!(names(&validators), expected);
    }
}
