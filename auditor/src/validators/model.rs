//! Project model reading.
//!
//! The model reader is an external collaborator: this crate only defines
//! its boundary ([`ModelReader`]) and records its failures. Model files are
//! the `.pom` files of the repository.

use crate::coordinate::ArtifactCoordinate;
use crate::repository::{RepositoryFile, scan};
use crate::validation::{ErrorKind, ValidationContext, ValidationError, Validator, ValidatorFailure};
use camino::Utf8PathBuf;
use log::debug;
use std::sync::Arc;
use thiserror::Error;

/// Extension of model files.
pub const MODEL_EXTENSION: &str = "pom";

/// Packaging of aggregator and bill-of-materials models.
pub const POM_PACKAGING: &str = "pom";

/// The parts of a project model the validators consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectModel {
    /// Coordinate the model declares for itself.
    pub coordinate: ArtifactCoordinate,
    /// Packaging type, such as `jar` or `pom`.
    pub packaging: String,
    /// Direct dependencies.
    pub dependencies: Vec<ArtifactCoordinate>,
    /// Versions pinned by a dependency management section.
    pub managed_dependencies: Vec<ArtifactCoordinate>,
}

impl ProjectModel {
    /// Model of `coordinate` with `packaging` and no dependencies.
    #[must_use]
    pub fn new(coordinate: ArtifactCoordinate, packaging: impl Into<String>) -> Self {
        Self {
            coordinate,
            packaging: packaging.into(),
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
        }
    }

    /// Whether this model is a bill of materials: `pom` packaging with a
    /// dependency management section.
    #[must_use]
    pub fn is_bom(&self) -> bool {
        self.packaging == POM_PACKAGING && !self.managed_dependencies.is_empty()
    }
}

/// A model file could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read model {path}: {reason}")]
pub struct ModelError {
    /// Model file, relative to the repository root.
    pub path: Utf8PathBuf,
    /// Reader diagnostic.
    pub reason: String,
}

/// Parses model files.
#[cfg_attr(test, mockall::automock)]
pub trait ModelReader {
    /// Read the model stored in `file`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the file is not a readable model.
    fn read(&self, file: &RepositoryFile) -> Result<ProjectModel, ModelError>;
}

/// Model files of the repository that no earlier check found unreliable.
pub(crate) fn model_files(ctx: &ValidationContext) -> Result<Vec<RepositoryFile>, ValidatorFailure> {
    let root = ctx.repository_root();
    Ok(scan(root)
        .map_err(ValidatorFailure::io(root))?
        .into_iter()
        .filter(|file| file.relative().extension() == Some(MODEL_EXTENSION))
        .filter(|file| !ctx.should_skip(file.relative()))
        .collect())
}

/// Readable models of the repository that no earlier check found
/// unreliable.
///
/// Unreadable models are skipped; [`ModelValidator`] reports them.
pub(crate) fn readable_models(
    ctx: &ValidationContext,
    reader: &dyn ModelReader,
) -> Result<Vec<(RepositoryFile, ProjectModel)>, ValidatorFailure> {
    Ok(model_files(ctx)?
        .into_iter()
        .filter_map(|file| match reader.read(&file) {
            Ok(model) => Some((file, model)),
            Err(err) => {
                debug!("skipping {}: {err}", file.relative());
                None
            }
        })
        .collect())
}

/// Validator recording unreadable models and models stored at the wrong
/// location.
pub struct ModelValidator {
    reader: Arc<dyn ModelReader>,
}

impl ModelValidator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "model";

    /// Read models through `reader`.
    #[must_use]
    pub fn new(reader: Arc<dyn ModelReader>) -> Self {
        Self { reader }
    }
}

impl Validator for ModelValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        for file in model_files(ctx)? {
            let relative = file.relative();
            match self.reader.read(&file) {
                Err(err) => ctx.add_error(ValidationError::from_error(
                    Self::NAME,
                    relative,
                    ErrorKind::ModelFailure,
                    &err,
                )),
                Ok(model) => {
                    let expected = model.coordinate.with_extension(MODEL_EXTENSION);
                    if file.coordinate() != Some(&expected) {
                        ctx.add_error(
                            ValidationError::new(
                                Self::NAME,
                                relative,
                                ErrorKind::ModelFailure,
                                format!(
                                    "{relative} declares {} but belongs at {}",
                                    model.coordinate,
                                    expected.repository_path()
                                ),
                            )
                            .with_origin(model.coordinate),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
