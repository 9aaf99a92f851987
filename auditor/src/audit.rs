//! One audit run, from a resolved plan to written reports.
//!
//! The run is strictly phased: every validator runs, then the ignore rules
//! partition the accumulated errors once, then the reporters read the final
//! context. Nothing is reported before all validators have finished.

use crate::error::{AuditorError, Result};
use crate::filter::FilterChain;
use crate::report::json::JsonReporter;
use crate::report::summary::SummaryReporter;
use crate::report::text::TextReporter;
use crate::report::ReportingPipeline;
use crate::validation::{ValidationContext, ValidationPipeline};
use crate::validators::remote::RemoteRepository;
use crate::validators::{AuditSettings, Collaborators, default_validators};
use camino::Utf8PathBuf;
use log::info;

/// Everything a run needs to know, after configuration and command-line
/// overrides have been merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPlan {
    /// Repository under audit.
    pub repository: Utf8PathBuf,
    /// Prepared distribution bundle, if reconciliation is wanted.
    pub distribution: Option<Utf8PathBuf>,
    /// Trusted reference cache for reconciliation.
    pub cache: Option<Utf8PathBuf>,
    /// Remote registries to compare against.
    pub remotes: Vec<RemoteRepository>,
    /// Validator tuning.
    pub settings: AuditSettings,
    /// Text report of reported errors.
    pub report: Option<Utf8PathBuf>,
    /// Text report of ignored errors.
    pub ignored_report: Option<Utf8PathBuf>,
    /// JSON report.
    pub json_report: Option<Utf8PathBuf>,
}

impl AuditPlan {
    /// A plan auditing `repository` with default settings and no reports.
    #[must_use]
    pub fn new(repository: impl Into<Utf8PathBuf>) -> Self {
        Self {
            repository: repository.into(),
            distribution: None,
            cache: None,
            remotes: Vec::new(),
            settings: AuditSettings::default(),
            report: None,
            ignored_report: None,
            json_report: None,
        }
    }

    /// A fresh context for this plan.
    #[must_use]
    pub fn context(&self) -> ValidationContext {
        let mut ctx = ValidationContext::new(self.repository.clone())
            .with_remote_repositories(self.remotes.clone());
        if let Some(distribution) = &self.distribution {
            ctx = ctx.with_distribution(distribution.clone());
        }
        if let Some(cache) = &self.cache {
            ctx = ctx.with_cache(cache.clone());
        }
        ctx
    }

    /// Reporters for the configured outputs; the summary is always logged.
    #[must_use]
    pub fn reporters(&self) -> ReportingPipeline {
        let mut reporting = ReportingPipeline::default();
        if let Some(path) = &self.report {
            reporting = reporting.with(Box::new(TextReporter::errors(path.clone())));
        }
        if let Some(path) = &self.ignored_report {
            reporting = reporting.with(Box::new(TextReporter::ignored(path.clone())));
        }
        if let Some(path) = &self.json_report {
            reporting = reporting.with(Box::new(JsonReporter::new(path.clone())));
        }
        reporting.with(Box::new(SummaryReporter))
    }
}

/// Validators, ignore rules and reporters of one run.
pub struct Audit {
    validators: ValidationPipeline,
    filter: FilterChain,
    reporting: ReportingPipeline,
}

impl Audit {
    /// Assemble a run from its three phases.
    #[must_use]
    pub fn new(
        validators: ValidationPipeline,
        filter: FilterChain,
        reporting: ReportingPipeline,
    ) -> Self {
        Self {
            validators,
            filter,
            reporting,
        }
    }

    /// The built-in validators and the plan's reporters.
    #[must_use]
    pub fn from_plan(plan: &AuditPlan, filter: FilterChain, collaborators: &Collaborators) -> Self {
        Self::new(
            ValidationPipeline::new(default_validators(&plan.settings, collaborators)),
            filter,
            plan.reporters(),
        )
    }

    /// Run every phase over `ctx` and hand back the final context.
    ///
    /// # Errors
    ///
    /// Returns [`AuditorError::RepositoryNotFound`] before validating a
    /// missing repository, or the first reporter failure.
    pub fn run(&self, mut ctx: ValidationContext) -> Result<ValidationContext> {
        let root = ctx.repository_root();
        if !root.is_dir() {
            return Err(AuditorError::RepositoryNotFound {
                path: root.to_owned(),
            });
        }
        info!(
            "auditing {root} with validators: {}",
            self.validators.validator_names().join(", ")
        );

        self.validators.execute(&ctx);
        ctx.apply_filter(&self.filter);
        info!(
            "{} error(s) reported, {} ignored by {} rule(s)",
            ctx.error_count(),
            ctx.ignored_errors().len(),
            self.filter.len()
        );

        self.reporting.run(&ctx)?;
        Ok(ctx)
    }
}
