//! Command-line argument definitions.
//!
//! Flags override the values loaded from `auditor.toml`; [`Cli::plan`]
//! merges the two into an [`AuditPlan`].

use crate::audit::AuditPlan;
use crate::config::{AuditorConfig, ConfigError};
use crate::validators::remote::RemoteRepository;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

/// Audit a Maven-layout repository for consistency.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "repository-auditor")]
#[command(version, about)]
#[command(long_about = concat!(
    "Audit a Maven-layout artifact repository before it is published.\n\n",
    "Every artifact is checked against its checksum sidecars. With --distribution ",
    "the prepared bundle is reconciled with the repository by content hash, and ",
    "with --remote each artifact is compared with the copy a registry already ",
    "serves.\n\n",
    "Findings that are known and accepted can be suppressed with [[ignore]] rules ",
    "in auditor.toml; suppressed findings are still written to --ignored-report.\n\n",
    "Exit status is 0 when no findings remain, 1 when findings remain and 2 when ",
    "the audit itself could not run.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Check checksums only:\n",
    "    $ repository-auditor target/staging\n\n",
    "  Reconcile a distribution using a trusted cache:\n",
    "    $ repository-auditor target/staging --distribution target/dist --cache ~/.m2/repository\n\n",
    "  Compare with two registries:\n",
    "    $ repository-auditor target/staging --remote https://repo1.example/maven2 \\\n",
    "        --remote artifactory=https://art.example/libs-release\n",
))]
pub struct Cli {
    /// Repository root to audit.
    #[arg(value_name = "REPOSITORY")]
    pub repository: Utf8PathBuf,

    /// Distribution bundle to reconcile with the repository.
    #[arg(short, long, value_name = "DIR")]
    pub distribution: Option<Utf8PathBuf>,

    /// Trusted local cache consulted during reconciliation.
    #[arg(short, long, value_name = "DIR")]
    pub cache: Option<Utf8PathBuf>,

    /// Remote registry as `[flavor=]URL` (repeatable; replaces configured remotes).
    #[arg(long = "remote", value_name = "[FLAVOR=]URL")]
    pub remotes: Vec<RemoteRepository>,

    /// Write the text report of remaining findings here.
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<Utf8PathBuf>,

    /// Write the text report of suppressed findings here.
    #[arg(long, value_name = "FILE")]
    pub ignored_report: Option<Utf8PathBuf>,

    /// Write a JSON report of both lists here.
    #[arg(long, value_name = "FILE")]
    pub json_report: Option<Utf8PathBuf>,

    /// Configuration file [default: ./auditor.toml when present].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Concurrent connections used for remote comparison.
    #[arg(long, value_name = "N")]
    pub max_connections: Option<NonZeroUsize>,

    /// Bound, in seconds, on the whole remote comparison.
    #[arg(long, value_name = "SECS")]
    pub remote_timeout: Option<NonZeroU64>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log filter directive for the selected verbosity.
    ///
    /// ```
    /// use repository_auditor::cli::Cli;
    ///
    /// let cli = Cli { verbosity: 1, ..Cli::default() };
    /// assert_eq!(cli.log_filter(), "debug");
    /// ```
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// The configuration file to load, if any.
    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config.as_deref()
    }

    /// Merge `config` with these flags; flags win.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration's settings or remotes
    /// are invalid.
    pub fn plan(&self, config: &AuditorConfig) -> Result<AuditPlan, ConfigError> {
        let mut settings = config.settings()?;
        if let Some(max_connections) = self.max_connections {
            settings.remote.max_connections = max_connections.get();
        }
        if let Some(timeout) = self.remote_timeout {
            settings.remote.timeout = Duration::from_secs(timeout.get());
        }
        let remotes = if self.remotes.is_empty() {
            config.remote_repositories()?
        } else {
            self.remotes.clone()
        };
        let pick = |flag: &Option<Utf8PathBuf>, configured: &Option<Utf8PathBuf>| {
            flag.clone().or_else(|| configured.clone())
        };

        Ok(AuditPlan {
            repository: self.repository.clone(),
            distribution: pick(&self.distribution, &config.distribution.path),
            cache: pick(&self.cache, &config.distribution.cache),
            remotes,
            settings,
            report: pick(&self.report, &config.audit.report),
            ignored_report: pick(&self.ignored_report, &config.audit.ignored_report),
            json_report: pick(&self.json_report, &config.audit.json_report),
        })
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
