//! Shared test utilities for the auditor crate.
#![expect(
    clippy::expect_used,
    reason = "fixtures abort the calling test when setup fails"
)]

use crate::coordinate::ArtifactCoordinate;
use crate::repository::RepositoryFile;
use crate::validators::dependency::{ResolutionFailure, ResolvedFiles, Resolver};
use crate::validators::model::{ModelError, ModelReader, ProjectModel};
use crate::validators::remote::RemoteRepository;
use crate::validators::remote::client::{ProbeClient, ProbeError, ProbeResponse};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// A temporary directory tree removed when dropped.
#[derive(Debug)]
pub struct TempTree {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl TempTree {
    /// Creates an empty tree.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or its path is not UTF-8.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir creation succeeds");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).expect("utf-8 temp dir");
        Self { _dir: dir, root }
    }

    /// Root of the tree.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Path of a directory below the root, for sibling trees such as a
    /// distribution next to the repository.
    pub fn child(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Writes `contents` to `relative`, creating parent directories.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write file");
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A probe client answering from a fixed table.
///
/// Unknown URLs answer 404. Every call is recorded. Responses are delayed
/// by the configured delay plus a small per-URL jitter so that concurrent
/// probes complete out of submission order.
#[derive(Debug, Default)]
pub struct StubProbeClient {
    responses: BTreeMap<String, Result<ProbeResponse, ProbeError>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl StubProbeClient {
    /// Creates a client that answers 404 for everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `url` with `response`.
    #[must_use]
    pub fn respond(mut self, url: &str, response: ProbeResponse) -> Self {
        self.responses.insert(url.to_owned(), Ok(response));
        self
    }

    /// Fails requests for `url` with `error`.
    #[must_use]
    pub fn fail(mut self, url: &str, error: ProbeError) -> Self {
        self.responses.insert(url.to_owned(), Err(error));
        self
    }

    /// Delays every answer by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// URLs probed so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn jitter(url: &str) -> Duration {
    let spread = url.bytes().fold(0_u64, |acc, byte| acc.wrapping_mul(31).wrapping_add(u64::from(byte)));
    Duration::from_micros(spread % 2_000)
}

impl ProbeClient for StubProbeClient {
    fn probe(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        thread::sleep(self.delay + jitter(url));
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(ProbeError::NotFound {
                    url: url.to_owned(),
                })
            })
    }
}

/// A model reader answering from a table keyed by relative path.
///
/// Paths without an entry fail to read.
#[derive(Debug, Default)]
pub struct StubModelReader {
    models: BTreeMap<Utf8PathBuf, ProjectModel>,
}

impl StubModelReader {
    /// Creates a reader that knows no models.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `model` for the file at `relative`.
    #[must_use]
    pub fn with_model(mut self, relative: &str, model: ProjectModel) -> Self {
        self.models.insert(Utf8PathBuf::from(relative), model);
        self
    }
}

impl ModelReader for StubModelReader {
    fn read(&self, file: &RepositoryFile) -> Result<ProjectModel, ModelError> {
        self.models
            .get(file.relative())
            .cloned()
            .ok_or_else(|| ModelError {
                path: file.relative().to_owned(),
                reason: "no model stubbed".to_owned(),
            })
    }
}

/// A resolver that fails for a fixed set of coordinates and resolves
/// everything else to itself.
#[derive(Debug, Default)]
pub struct StubResolver {
    missing: BTreeSet<String>,
}

impl StubResolver {
    /// Creates a resolver that resolves everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes resolution of `coordinate` fail, naming it as missing.
    #[must_use]
    pub fn missing(mut self, coordinate: &str) -> Self {
        self.missing.insert(coordinate.to_owned());
        self
    }
}

impl Resolver for StubResolver {
    fn resolve(
        &self,
        coordinate: &ArtifactCoordinate,
        _remotes: &[RemoteRepository],
    ) -> Result<ResolvedFiles, ResolutionFailure> {
        if self.missing.contains(&coordinate.to_string()) {
            return Err(ResolutionFailure {
                missing: vec![coordinate.clone()],
                requesting: coordinate.clone(),
                path: vec![coordinate.clone()],
            });
        }
        Ok(ResolvedFiles {
            coordinates: vec![coordinate.clone()],
        })
    }
}
