//! Distribution bundle reconciliation.
//!
//! Verifies that a prepared distribution directory holds exactly the
//! archives the repository implies. Repository, distribution and trusted
//! cache are scanned through one [`ArchiveFilter`], hashed with one fixed
//! algorithm and handed to [`reconcile::reconcile`].

pub mod reconcile;

use crate::digest::DigestAlgorithm;
use crate::repository::{ArchiveFilter, RepositoryFile};
use crate::validation::{ValidationContext, ValidationError, Validator, ValidatorFailure};
use camino::Utf8Path;
use log::{debug, info};
use reconcile::{HashedFile, reconcile};

/// Validator comparing the repository against a distribution bundle.
#[derive(Debug, Clone)]
pub struct DistributionValidator {
    filter: ArchiveFilter,
    algorithm: DigestAlgorithm,
}

impl DistributionValidator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "distribution";

    /// Create a validator hashing with `algorithm` the files `filter`
    /// accepts.
    #[must_use]
    pub const fn new(filter: ArchiveFilter, algorithm: DigestAlgorithm) -> Self {
        Self { filter, algorithm }
    }

    fn hashed(&self, root: &Utf8Path) -> Result<Vec<HashedFile>, ValidatorFailure> {
        let files = self
            .filter
            .scan(root)
            .map_err(ValidatorFailure::io(root))?;
        files
            .iter()
            .map(|file| self.hash(file))
            .collect()
    }

    fn hash(&self, file: &RepositoryFile) -> Result<HashedFile, ValidatorFailure> {
        let hash = file
            .content_hash(self.algorithm)
            .map_err(ValidatorFailure::io(file.absolute()))?;
        Ok(HashedFile::new(file.relative(), hash))
    }
}

impl Default for DistributionValidator {
    fn default() -> Self {
        Self::new(ArchiveFilter::default(), DigestAlgorithm::Sha256)
    }
}

impl Validator for DistributionValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        let Some(distribution_root) = ctx.distribution_root() else {
            debug!("no distribution configured; skipping reconciliation");
            return Ok(());
        };

        let repository = self.hashed(ctx.repository_root())?;
        let distribution = self.hashed(distribution_root)?;
        let cache = match ctx.cache_root() {
            Some(cache_root) => self.hashed(cache_root)?,
            None => Vec::new(),
        };
        info!(
            "reconciling {} repository, {} distribution and {} cached archive(s) by {}",
            repository.len(),
            distribution.len(),
            cache.len(),
            self.algorithm
        );

        for defect in reconcile(&repository, &distribution, &cache) {
            ctx.add_error(
                ValidationError::new(Self::NAME, defect.file(), defect.kind(), defect.to_string())
                    .with_root(defect.root()),
            );
        }
        Ok(())
    }
}
