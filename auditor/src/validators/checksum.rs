//! Checksum sidecar verification.
//!
//! Every artifact must be accompanied by a `<file>.<algorithm>` sidecar for
//! each required algorithm, and the sidecar must hold the digest of the
//! artifact content. Errors are recorded against the artifact so later
//! validators skip it.

use crate::digest::{DigestAlgorithm, parse_sidecar};
use crate::repository::{RepositoryFile, scan};
use crate::validation::{ErrorKind, ValidationContext, ValidationError, Validator, ValidatorFailure};
use camino::Utf8PathBuf;
use log::debug;
use std::fs;

/// Validator checking checksum sidecars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumValidator {
    algorithms: Vec<DigestAlgorithm>,
}

impl ChecksumValidator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "checksum";

    /// Require a sidecar for each of `algorithms`.
    #[must_use]
    pub fn new(algorithms: Vec<DigestAlgorithm>) -> Self {
        Self { algorithms }
    }

    /// Algorithms whose sidecars are required.
    #[must_use]
    pub fn algorithms(&self) -> &[DigestAlgorithm] {
        &self.algorithms
    }

    fn check(
        &self,
        ctx: &ValidationContext,
        file: &RepositoryFile,
        algorithm: DigestAlgorithm,
    ) -> Result<(), ValidatorFailure> {
        let extension = algorithm.sidecar_extension();
        let sidecar = Utf8PathBuf::from(format!("{}.{extension}", file.absolute()));
        let relative = file.relative();
        if !sidecar.is_file() {
            ctx.add_error(record(
                file,
                ErrorKind::ChecksumMissing,
                format!("{relative} has no {algorithm} checksum file"),
            ));
            return Ok(());
        }

        let contents = fs::read_to_string(&sidecar).map_err(ValidatorFailure::io(&sidecar))?;
        let Some(expected) = parse_sidecar(&contents) else {
            ctx.add_error(record(
                file,
                ErrorKind::ChecksumMismatch,
                format!("{relative}.{extension} is empty"),
            ));
            return Ok(());
        };
        let actual = file
            .content_hash(algorithm)
            .map_err(ValidatorFailure::io(file.absolute()))?;
        if actual != expected {
            ctx.add_error(record(
                file,
                ErrorKind::ChecksumMismatch,
                format!("{relative} has {algorithm} {actual} but {relative}.{extension} says {expected}"),
            ));
        }
        Ok(())
    }
}

impl Default for ChecksumValidator {
    fn default() -> Self {
        Self::new(vec![DigestAlgorithm::Sha1])
    }
}

fn record(file: &RepositoryFile, kind: ErrorKind, message: String) -> ValidationError {
    let error = ValidationError::new(ChecksumValidator::NAME, file.relative(), kind, message);
    match file.coordinate() {
        Some(coordinate) => error.with_origin(coordinate.clone()),
        None => error,
    }
}

impl Validator for ChecksumValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        let root = ctx.repository_root();
        let files = scan(root).map_err(ValidatorFailure::io(root))?;
        let artifacts: Vec<&RepositoryFile> =
            files.iter().filter(|file| !file.is_ancillary()).collect();
        debug!(
            "verifying {} checksum(s) for {} artifact(s)",
            self.algorithms.len(),
            artifacts.len()
        );
        for file in artifacts {
            for algorithm in &self.algorithms {
                self.check(ctx, file, *algorithm)?;
            }
        }
        Ok(())
    }
}
