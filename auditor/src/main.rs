//! Repository auditor CLI entrypoint.
//!
//! Loads configuration, runs the audit and maps the verdict to the exit
//! status: 0 when no findings remain, 1 when findings remain, 2 when the
//! audit could not run.

use clap::Parser;
use repository_auditor::audit::Audit;
use repository_auditor::cli::Cli;
use repository_auditor::config::AuditorConfig;
use repository_auditor::error::Result;
use repository_auditor::report::summary::AuditSummary;
use repository_auditor::report::text;
use repository_auditor::validators::Collaborators;
use std::error::Error as _;
use std::io::Write;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Exit status when findings remain after filtering.
const EXIT_FINDINGS: i32 = 1;
/// Exit status when the audit itself failed.
const EXIT_FAILURE: i32 = 2;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `-v`/`-q`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Run the audit; `Ok(true)` when no findings remain.
fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<bool> {
    let config = AuditorConfig::discover(cli.config_path())?;
    let plan = cli.plan(&config)?;
    let filter = config.filter_chain()?;
    let audit = Audit::from_plan(&plan, filter, &Collaborators::default());

    let ctx = audit.run(plan.context())?;

    if plan.report.is_none() && !ctx.is_success() {
        write_stderr_line(stderr, text::render(&ctx.errors()).trim_end());
    }
    write_stderr_line(stderr, AuditSummary::from_context(&ctx));
    Ok(ctx.is_success())
}

fn exit_code_for_run_result(result: Result<bool>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(true) => 0,
        Ok(false) => EXIT_FINDINGS,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            let mut cause = err.source();
            while let Some(inner) = cause {
                write_stderr_line(stderr, format!("  caused by: {inner}"));
                cause = inner.source();
            }
            EXIT_FAILURE
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
