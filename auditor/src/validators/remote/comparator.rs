//! Bounded-concurrency comparison of repository files with remote copies.
//!
//! Every (file, remote) pair becomes one probe. All probes are queued up
//! front and drained by `min(max_connections, probes)` scoped worker
//! threads sharing one client. The calling thread waits for completions
//! until the configured deadline; past it, a cancellation flag makes the
//! workers record every probe still queued as cancelled instead of sending
//! it. Workers are always joined before the client is dropped, so every
//! probe is recorded exactly once and nothing outlives the step.

use super::RemoteRepository;
use super::client::{HttpProbeClient, ProbeClient, ProbeError};
use super::strategy::{ExtractionError, strategy_for};
use crate::repository::{RepositoryFile, scan};
use crate::validation::{ErrorKind, ValidationContext, ValidationError, Validator, ValidatorFailure};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default number of concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;
/// Default bound on the whole comparison step.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
/// Default bound on a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning for the comparison step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSettings {
    /// Worker threads and pooled connections.
    pub max_connections: usize,
    /// Bound on the wait for all probes.
    pub timeout: Duration,
    /// Bound on each request, in flight probes included.
    pub request_timeout: Duration,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Why a probe could not be classified as found, missing or different.
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// The request failed or returned an unexpected status.
    #[error(transparent)]
    Probe(#[from] ProbeError),
    /// No digest could be derived from the response or the local file.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// The step deadline passed before the probe was sent.
    #[error("probe cancelled after the {}s comparison timeout", timeout.as_secs())]
    Cancelled {
        /// The deadline that expired.
        timeout: Duration,
    },
}

/// Result of one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Remote and local digests agree.
    Matched,
    /// The remote does not hold the file.
    NotFound,
    /// Remote and local digests differ.
    Mismatch {
        /// Local digest.
        local: String,
        /// Remote digest.
        remote: String,
    },
    /// The comparison could not be carried out.
    Failed(ComparisonError),
}

/// Per-outcome probe counts of one comparison step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonSummary {
    /// Probes whose digests agreed.
    pub matched: usize,
    /// Probes answered with 404.
    pub not_found: usize,
    /// Probes whose digests differed.
    pub mismatched: usize,
    /// Probes that failed or were cancelled.
    pub failed: usize,
}

impl ComparisonSummary {
    fn record(&mut self, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Matched => self.matched += 1,
            ProbeOutcome::NotFound => self.not_found += 1,
            ProbeOutcome::Mismatch { .. } => self.mismatched += 1,
            ProbeOutcome::Failed(_) => self.failed += 1,
        }
    }

    /// Number of probes accounted for.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.matched + self.not_found + self.mismatched + self.failed
    }
}

impl fmt::Display for ComparisonSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched, {} not found, {} mismatched, {} failed",
            self.matched, self.not_found, self.mismatched, self.failed
        )
    }
}

/// One file checked against one remote.
#[derive(Debug)]
struct Probe<'a> {
    file: &'a RepositoryFile,
    remote: &'a RemoteRepository,
    url: String,
}

impl<'a> Probe<'a> {
    fn new(file: &'a RepositoryFile, remote: &'a RemoteRepository) -> Self {
        let relative: Vec<&str> = file
            .relative()
            .components()
            .map(|component| component.as_str())
            .collect();
        Self {
            url: remote.artifact_url(&relative.join("/")),
            file,
            remote,
        }
    }

    fn run(&self, client: &dyn ProbeClient) -> ProbeOutcome {
        let response = match client
            .probe(&self.url)
            .and_then(|response| response.into_success(&self.url))
        {
            Ok(response) => response,
            Err(ProbeError::NotFound { .. }) => return ProbeOutcome::NotFound,
            Err(err) => return ProbeOutcome::Failed(err.into()),
        };

        let strategy = strategy_for(self.remote.flavor());
        let digests = strategy.remote_digest(&response).and_then(|remote| {
            strategy
                .local_digest(self.file.absolute())
                .map(|local| (local, remote))
        });
        match digests {
            Ok((local, remote)) if local.eq_ignore_ascii_case(&remote) => ProbeOutcome::Matched,
            Ok((local, remote)) => ProbeOutcome::Mismatch { local, remote },
            Err(err) => ProbeOutcome::Failed(err.into()),
        }
    }

    fn error_for(&self, outcome: &ProbeOutcome) -> Option<ValidationError> {
        let relative = self.file.relative();
        let url = &self.url;
        let error = match outcome {
            ProbeOutcome::Matched => return None,
            ProbeOutcome::NotFound => ValidationError::new(
                RemoteComparator::NAME,
                relative,
                ErrorKind::RemoteNotFound,
                format!("{relative} is not published at {url}"),
            ),
            ProbeOutcome::Mismatch { local, remote } => ValidationError::new(
                RemoteComparator::NAME,
                relative,
                ErrorKind::RemoteMismatch,
                format!("{url} serves different content (local digest {local}, remote digest {remote})"),
            ),
            ProbeOutcome::Failed(err) => ValidationError::new(
                RemoteComparator::NAME,
                relative,
                ErrorKind::RemoteTransportFailure,
                format!("could not compare {relative} with {url}"),
            )
            .with_causes(error_chain(err)),
        };
        Some(match self.file.coordinate() {
            Some(coordinate) => error.with_origin(coordinate.clone()),
            None => error,
        })
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut next = err.source();
    while let Some(cause) = next {
        chain.push(cause.to_string());
        next = cause.source();
    }
    chain
}

type ClientFactory = Box<dyn Fn(&RemoteSettings) -> Arc<dyn ProbeClient>>;

/// Validator comparing repository files with their published copies.
pub struct RemoteComparator {
    settings: RemoteSettings,
    connect: ClientFactory,
}

impl RemoteComparator {
    /// Validator name recorded on its errors.
    pub const NAME: &'static str = "remote";

    /// Compare over HTTP; a fresh connection pool is created for every run.
    #[must_use]
    pub fn new(settings: RemoteSettings) -> Self {
        Self {
            settings,
            connect: Box::new(|settings| {
                Arc::new(HttpProbeClient::new(
                    settings.max_connections,
                    settings.request_timeout,
                ))
            }),
        }
    }

    /// Compare through `client` instead of HTTP.
    #[must_use]
    pub fn with_client(settings: RemoteSettings, client: Arc<dyn ProbeClient>) -> Self {
        Self {
            settings,
            connect: Box::new(move |_| Arc::clone(&client)),
        }
    }

    /// Configured tuning.
    #[must_use]
    pub const fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    /// Probe every candidate file against every remote in `ctx`, recording
    /// each non-matching outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorFailure::Io`] if the repository cannot be scanned.
    pub fn compare(&self, ctx: &ValidationContext) -> Result<ComparisonSummary, ValidatorFailure> {
        let remotes = ctx.remote_repositories();
        if remotes.is_empty() {
            debug!("no remote repositories configured; skipping comparison");
            return Ok(ComparisonSummary::default());
        }

        let root = ctx.repository_root();
        let files: Vec<RepositoryFile> = scan(root)
            .map_err(ValidatorFailure::io(root))?
            .into_iter()
            .filter(|file| !file.is_ancillary() && !ctx.should_skip(file.relative()))
            .collect();
        let probes: Vec<Probe<'_>> = remotes
            .iter()
            .flat_map(|remote| files.iter().map(move |file| Probe::new(file, remote)))
            .collect();
        if probes.is_empty() {
            return Ok(ComparisonSummary::default());
        }

        let workers = self.settings.max_connections.clamp(1, probes.len());
        info!(
            "comparing {} file(s) against {} remote(s) with {workers} worker(s)",
            files.len(),
            remotes.len()
        );
        let client = (self.connect)(&self.settings);
        let summary = run_probes(ctx, client.as_ref(), probes, workers, self.settings.timeout);
        drop(client);
        Ok(summary)
    }
}

impl Validator for RemoteComparator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn validate(&self, ctx: &ValidationContext) -> Result<(), ValidatorFailure> {
        let summary = self.compare(ctx)?;
        if summary.total() > 0 {
            info!("remote comparison: {summary}");
        }
        Ok(())
    }
}

fn run_probes(
    ctx: &ValidationContext,
    client: &dyn ProbeClient,
    probes: Vec<Probe<'_>>,
    workers: usize,
    timeout: Duration,
) -> ComparisonSummary {
    let total = probes.len();
    let queue = Mutex::new(VecDeque::from(probes));
    let cancelled = AtomicBool::new(false);
    let (done_tx, done_rx) = mpsc::channel::<ProbeOutcome>();
    let mut summary = ComparisonSummary::default();

    thread::scope(|scope| {
        for _ in 0..workers {
            let done = done_tx.clone();
            let queue = &queue;
            let cancelled = &cancelled;
            scope.spawn(move || work(ctx, client, queue, cancelled, &done, timeout));
        }
        drop(done_tx);

        let deadline = Instant::now().checked_add(timeout);
        while summary.total() < total {
            let remaining = deadline.map_or(Duration::MAX, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            match done_rx.recv_timeout(remaining) {
                Ok(outcome) => summary.record(&outcome),
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "remote comparison timed out after {}s with {} of {total} probe(s) done",
                        timeout.as_secs(),
                        summary.total()
                    );
                    cancelled.store(true, Ordering::Release);
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    for outcome in done_rx.try_iter() {
        summary.record(&outcome);
    }
    summary
}

fn work(
    ctx: &ValidationContext,
    client: &dyn ProbeClient,
    queue: &Mutex<VecDeque<Probe<'_>>>,
    cancelled: &AtomicBool,
    done: &mpsc::Sender<ProbeOutcome>,
    timeout: Duration,
) {
    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(probe) = next else {
            break;
        };

        let outcome = if cancelled.load(Ordering::Acquire) {
            ProbeOutcome::Failed(ComparisonError::Cancelled { timeout })
        } else {
            probe.run(client)
        };
        if let Some(error) = probe.error_for(&outcome) {
            ctx.add_error(error);
        }
        if done.send(outcome).is_err() {
            break;
        }
    }
}
