//! Dependency resolution checks.
//!
//! Graph resolution is delegated to a [`Resolver`]; this module only turns
//! its failures into recorded errors carrying the missing and requesting
//! coordinates, which is what ignore rules match on.

use super::model::{ModelReader, POM_PACKAGING, readable_models};
use super::remote::RemoteRepository;
use crate::coordinate::ArtifactCoordinate;
use crate::validation::{ErrorKind, ValidationContext, ValidationError, Validator, ValidatorFailure};
use camino::Utf8Path;
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Artifacts a successful resolution produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFiles {
    /// Every resolved coordinate, the root included.
    pub coordinates: Vec<ArtifactCoordinate>,
}

/// Resolution stopped at coordinates that could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not resolve dependencies of {requesting}")]
pub struct ResolutionFailure {
    /// Coordinates that could not be found.
    pub missing: Vec<ArtifactCoordinate>,
    /// Coordinate whose resolution was requested.
    pub requesting: ArtifactCoordinate,
    /// Chain of coordinates from `requesting` to the failure.
    pub path: Vec<ArtifactCoordinate>,
}

impl ResolutionFailure {
    /// Rendered dependency path, `a -> b -> c`.
    #[must_use]
    pub fn path_display(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// One error per missing coordinate, recorded against `file`.
    ///
    /// A failure naming no missing coordinate still yields one error.
    pub(crate) fn to_errors(
        &self,
        source: &'static str,
        file: &Utf8Path,
        kind: ErrorKind,
    ) -> Vec<ValidationError> {
        let causes = if self.path.is_empty() {
            Vec::new()
        } else {
            vec![format!("dependency path: {}", self.path_display())]
        };
        if self.missing.is_empty() {
            return vec![
                ValidationError::new(source, file, kind, self.to_string())
                    .with_causes(causes)
                    .with_origin(self.requesting.clone()),
            ];
        }
        self.missing
            .iter()
            .map(|missing| {
                ValidationError::new(
                    source,
                    file,
                    kind,
                    format!("could not resolve {missing} required by {}", self.requesting),
                )
                .with_causes(causes.clone())
                .with_missing(missing.clone())
                .with_origin(self.requesting.clone())
            })
            .collect()
    }
}

/// Resolves dependency graphs.
#[cfg_attr(test, mockall::automock)]
pub trait Resolver {
    /// Resolve `coordinate` and its transitive dependencies, consulting
    /// the repository under audit and `remotes`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionFailure`] naming what could not be found.
    fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        remotes: &[RemoteRepository],
    ) -> Result<ResolvedFiles, ResolutionFailure>;
}

/// Validator resolving every non-aggregator model of the repository.
pub struct DependencyValidator {
    reader: Arc<dyn ModelReader>,
    resolver: Arc<dyn Resolver>,
}

impl DependencyValidator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "dependency";

    /// Read models with `reader` and resolve them with `resolver`.
    #[must_use]
    pub fn new(reader: Arc<dyn ModelReader>, resolver: Arc<dyn Resolver>) -> Self {
        Self { reader, resolver }
    }
}

impl Validator for DependencyValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        for (file, model) in readable_models(ctx, self.reader.as_ref())? {
            if model.packaging == POM_PACKAGING {
                continue;
            }
            let artifact = model.coordinate.with_extension(&model.packaging);
            match self.resolver.resolve(&artifact, ctx.remote_repositories()) {
                Ok(resolved) => debug!(
                    "{artifact} resolved to {} artifact(s)",
                    resolved.coordinates.len()
                ),
                Err(failure) => {
                    for error in
                        failure.to_errors(Self::NAME, file.relative(), ErrorKind::ResolutionFailure)
                    {
                        ctx.add_error(error);
                    }
                }
            }
        }
        Ok(())
    }
}
