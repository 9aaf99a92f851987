//! The summary reporter's log output.

use logtest::Logger;
use repository_auditor::report::Reporter;
use repository_auditor::report::summary::SummaryReporter;
use repository_auditor::validation::{ErrorKind, ValidationContext, ValidationError};

#[test]
fn failing_run_is_logged_as_a_warning_with_per_kind_counts() {
    let mut logger = Logger::start();
    let ctx = ValidationContext::new("/repo");
    ctx.add_error(ValidationError::new(
        "checksum",
        "a.jar",
        ErrorKind::ChecksumMissing,
        "a.jar has no sha1 checksum file",
    ));

    SummaryReporter.report(&ctx).expect("summary logged");

    let mut per_kind = false;
    let mut verdict = None;
    while let Some(record) = logger.pop() {
        let message = record.args().to_string();
        if message == "ChecksumMissing: 1 reported, 0 ignored" {
            per_kind = true;
        }
        if message.starts_with("audit failed") {
            verdict = Some(record.level());
        }
    }

    assert!(per_kind, "expected per-kind count to be logged");
    assert_eq!(verdict, Some(log::Level::Warn));
}
