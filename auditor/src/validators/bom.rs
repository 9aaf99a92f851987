//! Bill-of-materials checks.
//!
//! A bill of materials pins versions for downstream consumers. Every pinned
//! version must resolve, a coordinate must not be pinned to different
//! versions by different BOMs shipped together, and a pinned version should
//! be the one the repository actually ships.

use super::dependency::Resolver;
use super::model::{ModelReader, ProjectModel, readable_models};
use crate::coordinate::ArtifactCoordinate;
use crate::repository::{RepositoryFile, scan};
use crate::validation::{ErrorKind, ValidationContext, ValidationError, Validator, ValidatorFailure};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Validator for the repository's bills of materials.
pub struct BomValidator {
    reader: Arc<dyn ModelReader>,
    resolver: Arc<dyn Resolver>,
}

/// Version pinned by one BOM.
struct Pin<'a> {
    managed: &'a ArtifactCoordinate,
    bom: &'a RepositoryFile,
    model: &'a ProjectModel,
}

impl BomValidator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "bom";

    /// Read models with `reader` and resolve pinned versions with `resolver`.
    #[must_use]
    pub fn new(reader: Arc<dyn ModelReader>, resolver: Arc<dyn Resolver>) -> Self {
        Self { reader, resolver }
    }

    fn check_resolution(&self, ctx: &ValidationContext, file: &RepositoryFile, bom: &ProjectModel) {
        for managed in &bom.managed_dependencies {
            if let Err(failure) = self.resolver.resolve(managed, ctx.remote_repositories()) {
                let errors =
                    failure.to_errors(Self::NAME, file.relative(), ErrorKind::BomResolutionFailure);
                for error in errors {
                    ctx.add_error(error.with_origin(bom.coordinate.clone()));
                }
            }
        }
    }
}

/// Versions of each artifact present in the repository, keyed by
/// [`ArtifactCoordinate::versionless_key`].
fn shipped_versions(files: &[RepositoryFile]) -> BTreeMap<String, BTreeSet<&str>> {
    let mut shipped: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    for coordinate in files.iter().filter_map(RepositoryFile::coordinate) {
        shipped
            .entry(coordinate.versionless_key())
            .or_default()
            .insert(coordinate.version());
    }
    shipped
}

fn check_ambiguity(ctx: &ValidationContext, key: &str, pins: &[Pin<'_>]) {
    let versions: BTreeSet<&str> = pins.iter().map(|pin| pin.managed.version()).collect();
    if versions.len() < 2 {
        return;
    }
    let Some(first) = pins.first() else {
        return;
    };
    let detail: Vec<String> = pins
        .iter()
        .map(|pin| format!("{} in {}", pin.managed.version(), pin.model.coordinate))
        .collect();
    ctx.add_error(
        ValidationError::new(
            BomValidator::NAME,
            first.bom.relative(),
            ErrorKind::BomAmbiguousVersion,
            format!("{key} is managed at {} different versions", versions.len()),
        )
        .with_causes(detail)
        .with_origin(first.model.coordinate.clone()),
    );
}

fn check_usage(ctx: &ValidationContext, pin: &Pin<'_>, shipped: &BTreeSet<&str>) {
    let managed = pin.managed;
    if shipped.contains(managed.version()) {
        return;
    }
    let available: Vec<&str> = shipped.iter().copied().collect();
    ctx.add_error(
        ValidationError::new(
            BomValidator::NAME,
            pin.bom.relative(),
            ErrorKind::BomUnusedVersion,
            format!(
                "{} manages {managed} but the repository ships {}",
                pin.model.coordinate,
                available.join(", ")
            ),
        )
        .with_missing(managed.clone())
        .with_origin(pin.model.coordinate.clone()),
    );
}

impl Validator for BomValidator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        let boms: Vec<(RepositoryFile, ProjectModel)> = readable_models(ctx, self.reader.as_ref())?
            .into_iter()
            .filter(|(_, model)| model.is_bom())
            .collect();
        if boms.is_empty() {
            return Ok(());
        }
        let root = ctx.repository_root();
        let files = scan(root).map_err(ValidatorFailure::io(root))?;
        let shipped = shipped_versions(&files);

        let mut pins: BTreeMap<String, Vec<Pin<'_>>> = BTreeMap::new();
        for (file, bom) in &boms {
            self.check_resolution(ctx, file, bom);
            for managed in &bom.managed_dependencies {
                pins.entry(managed.versionless_key()).or_default().push(Pin {
                    managed,
                    bom: file,
                    model: bom,
                });
            }
        }

        for (key, key_pins) in &pins {
            if let Some(versions) = shipped.get(key) {
                for pin in key_pins {
                    check_usage(ctx, pin, versions);
                }
            }
            check_ambiguity(ctx, key, key_pins);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StubModelReader, StubResolver, TempTree};

    const BOM_A: &str = "org/acme/bom-a/1.0/bom-a-1.0.pom";
    const BOM_B: &str = "org/acme/bom-b/1.0/bom-b-1.0.pom";

    fn coordinate(value: &str) -> ArtifactCoordinate {
        value.parse().expect("valid coordinate")
    }

    fn bom(name: &str, managed: &[&str]) -> ProjectModel {
        let mut model = ProjectModel::new(coordinate(&format!("org.acme:{name}:pom:1.0")), "pom");
        model.managed_dependencies = managed.iter().map(|value| coordinate(value)).collect();
        model
    }

    fn run(tree: &TempTree, reader: StubModelReader, resolver: StubResolver) -> Vec<ValidationError> {
        let ctx = ValidationContext::new(tree.root());
        BomValidator::new(Arc::new(reader), Arc::new(resolver))
            .validate(&ctx)
            .expect("validation completes");
        ctx.errors()
    }

    fn tree_with(files: &[&str]) -> TempTree {
        let tree = TempTree::new();
        for file in files {
            tree.write(file, "content");
        }
        tree
    }

    #[test]
    fn consistent_bom_records_nothing() {
        let tree = tree_with(&[BOM_A, "org/acme/widget/1.0/widget-1.0.jar"]);
        let reader = StubModelReader::new().with_model(BOM_A, bom("bom-a", &["org.acme:widget:jar:1.0"]));

        assert!(run(&tree, reader, StubResolver::new()).is_empty());
    }

    #[test]
    fn unresolvable_pin_is_a_bom_resolution_failure() {
        let tree = tree_with(&[BOM_A]);
        let reader = StubModelReader::new().with_model(BOM_A, bom("bom-a", &["org.gone:lib:jar:3.0"]));
        let resolver = StubResolver::new().missing("org.gone:lib:jar:3.0");

        let errors = run(&tree, reader, resolver);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::BomResolutionFailure);
        assert_eq!(
            errors[0].missing_coordinate(),
            Some(&coordinate("org.gone:lib:jar:3.0"))
        );
        assert_eq!(
            errors[0].originating_coordinate(),
            Some(&coordinate("org.acme:bom-a:pom:1.0"))
        );
    }

    #[test]
    fn conflicting_pins_are_ambiguous() {
        let tree = tree_with(&[BOM_A, BOM_B]);
        let reader = StubModelReader::new()
            .with_model(BOM_A, bom("bom-a", &["org.acme:widget:jar:1.0"]))
            .with_model(BOM_B, bom("bom-b", &["org.acme:widget:jar:2.0"]));

        let errors = run(&tree, reader, StubResolver::new());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::BomAmbiguousVersion);
        assert_eq!(errors[0].file().as_str(), BOM_A);
        assert_eq!(
            errors[0].causes(),
            [
                "1.0 in org.acme:bom-a:pom:1.0".to_owned(),
                "2.0 in org.acme:bom-b:pom:1.0".to_owned()
            ]
        );
    }

    #[test]
    fn pin_to_unshipped_version_is_unused() {
        let tree = tree_with(&[BOM_A, "org/acme/widget/1.1/widget-1.1.jar"]);
        let reader = StubModelReader::new().with_model(BOM_A, bom("bom-a", &["org.acme:widget:jar:1.0"]));

        let errors = run(&tree, reader, StubResolver::new());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::BomUnusedVersion);
        assert!(errors[0].message().ends_with("ships 1.1"));
    }

    #[test]
    fn pins_for_external_artifacts_are_not_unused() {
        let tree = tree_with(&[BOM_A]);
        let reader = StubModelReader::new().with_model(BOM_A, bom("bom-a", &["org.other:lib:jar:1.0"]));

        assert!(run(&tree, reader, StubResolver::new()).is_empty());
    }
}
