//! Shared fixtures for the behavioural tests.

use camino::Utf8PathBuf;
use repository_auditor::digest::DigestAlgorithm;
use repository_auditor::test_utils::TempTree;
use rstest::fixture;

/// Relative path of the repository inside a [`Workspace`].
pub const REPOSITORY: &str = "repo";

/// A temporary workspace holding a repository and its sibling trees.
pub struct Workspace {
    /// Backing temporary directory.
    pub tree: TempTree,
}

impl Workspace {
    /// Absolute repository root.
    pub fn repository(&self) -> Utf8PathBuf {
        self.tree.child(REPOSITORY)
    }

    /// Absolute path of `name` next to the repository.
    pub fn path(&self, name: &str) -> Utf8PathBuf {
        self.tree.child(name)
    }

    /// Write an artifact with a correct SHA-1 sidecar.
    pub fn publish(&self, relative: &str, contents: &str) {
        self.publish_unsigned(relative, contents);
        self.tree.write(
            &format!("{REPOSITORY}/{relative}.sha1"),
            &DigestAlgorithm::Sha1.hash_bytes(contents.as_bytes()),
        );
    }

    /// Write an artifact without any sidecar.
    pub fn publish_unsigned(&self, relative: &str, contents: &str) {
        self.tree.write(&format!("{REPOSITORY}/{relative}"), contents);
    }

    /// Write a file outside the repository, e.g. into a distribution.
    pub fn write(&self, relative: &str, contents: &str) {
        self.tree.write(relative, contents);
    }
}

/// A workspace with one correctly signed artifact and its model.
#[fixture]
pub fn workspace() -> Workspace {
    let workspace = Workspace {
        tree: TempTree::new(),
    };
    workspace.publish("org/acme/widget/1.0/widget-1.0.jar", "widget");
    workspace.publish("org/acme/widget/1.0/widget-1.0.pom", "<project/>");
    workspace
}
