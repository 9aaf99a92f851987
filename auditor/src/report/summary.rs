//! Per-kind counts of a finished run, written to the log.

use super::{ReportError, Reporter};
use crate::validation::{ErrorKind, ValidationContext};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// Reported and ignored counts for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCount {
    /// Errors left after filtering.
    pub reported: usize,
    /// Errors suppressed by ignore rules.
    pub ignored: usize,
}

/// Counts of a run, keyed by kind name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    counts: BTreeMap<&'static str, KindCount>,
}

impl AuditSummary {
    /// Count the context's reported and ignored errors.
    #[must_use]
    pub fn from_context(ctx: &ValidationContext) -> Self {
        let mut counts: BTreeMap<&'static str, KindCount> = BTreeMap::new();
        for error in ctx.errors() {
            counts.entry(error.kind().name()).or_default().reported += 1;
        }
        for error in ctx.ignored_errors() {
            counts.entry(error.kind().name()).or_default().ignored += 1;
        }
        Self { counts }
    }

    /// Counts for `kind`; zero when nothing of that kind was recorded.
    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> KindCount {
        self.counts.get(kind.name()).copied().unwrap_or_default()
    }

    /// Total reported errors.
    #[must_use]
    pub fn reported(&self) -> usize {
        self.counts.values().map(|count| count.reported).sum()
    }

    /// Total ignored errors.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.counts.values().map(|count| count.ignored).sum()
    }

    /// Kinds with at least one recorded error, in name order.
    pub fn kinds(&self) -> impl Iterator<Item = (&'static str, KindCount)> + '_ {
        self.counts.iter().map(|(name, count)| (*name, *count))
    }
}

impl fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s) reported, {} ignored",
            self.reported(),
            self.ignored()
        )
    }
}

/// Logs an [`AuditSummary`]; a warning when errors remain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryReporter;

impl Reporter for SummaryReporter {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn report(&self, ctx: &ValidationContext) -> Result<(), ReportError> {
        let summary = AuditSummary::from_context(ctx);
        for (kind, count) in summary.kinds() {
            info!("{kind}: {} reported, {} ignored", count.reported, count.ignored);
        }
        if summary.reported() > 0 {
            warn!("audit failed: {summary}");
        } else {
            info!("audit passed: {summary}");
        }
        Ok(())
    }
}
