//! Remote comparison against a stubbed registry, run through the full
//! validation, filtering and reporting phases.

mod support;

use camino::Utf8Path;
use repository_auditor::audit::Audit;
use repository_auditor::config::AuditorConfig;
use repository_auditor::digest::DigestAlgorithm;
use repository_auditor::report::ReportingPipeline;
use repository_auditor::report::json::JsonReporter;
use repository_auditor::test_utils::StubProbeClient;
use repository_auditor::validation::{
    ErrorKind, FileRoot, ValidationContext, ValidationPipeline, Validator,
};
use repository_auditor::validators::checksum::ChecksumValidator;
use repository_auditor::validators::remote::RemoteRepository;
use repository_auditor::validators::distribution::DistributionValidator;
use repository_auditor::validators::remote::client::{ProbeClient, ProbeError, ProbeResponse};
use repository_auditor::validators::remote::comparator::{RemoteComparator, RemoteSettings};
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use support::{Workspace, workspace};

const REGISTRY: &str = "https://repo.test/maven2";

fn nexus_etag(contents: &str) -> ProbeResponse {
    let sha1 = DigestAlgorithm::Sha1.hash_bytes(contents.as_bytes());
    ProbeResponse::new(200).with_header("ETag", format!("\"{{SHA1{{{sha1}}}}}\""))
}

fn url(relative: &str) -> String {
    format!("{REGISTRY}/{relative}")
}

fn audit(client: StubProbeClient, ignore: &str, json: Option<&Utf8Path>) -> Audit {
    let config: AuditorConfig = toml::from_str(ignore).expect("valid configuration");
    let settings = RemoteSettings {
        max_connections: 4,
        timeout: Duration::from_secs(30),
        ..RemoteSettings::default()
    };
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(ChecksumValidator::default()),
        Box::new(RemoteComparator::with_client(settings, Arc::new(client))),
    ];
    let reporting = json.map_or_else(ReportingPipeline::default, |path| {
        ReportingPipeline::default().with(Box::new(JsonReporter::new(path)))
    });
    Audit::new(
        ValidationPipeline::new(validators),
        config.filter_chain().expect("valid ignore rules"),
        reporting,
    )
}

fn context(workspace: &Workspace) -> ValidationContext {
    let remote: RemoteRepository = REGISTRY.parse().expect("valid remote");
    ValidationContext::new(workspace.repository()).with_remote_repositories(vec![remote])
}

#[rstest]
fn published_content_matches(workspace: Workspace) {
    let client = StubProbeClient::new()
        .respond(&url("org/acme/widget/1.0/widget-1.0.jar"), nexus_etag("widget"))
        .respond(&url("org/acme/widget/1.0/widget-1.0.pom"), nexus_etag("<project/>"));

    let ctx = audit(client, "", None)
        .run(context(&workspace))
        .expect("audit completes");

    assert!(ctx.is_success());
}

#[rstest]
fn unpublished_models_can_be_ignored_while_mismatches_remain(workspace: Workspace) {
    workspace.publish("org/acme/gadget/1.0/gadget-1.0.jar", "gadget v2");
    let client = StubProbeClient::new()
        .respond(&url("org/acme/widget/1.0/widget-1.0.jar"), nexus_etag("widget"))
        .respond(&url("org/acme/gadget/1.0/gadget-1.0.jar"), nexus_etag("gadget v1"));
    let json = workspace.path("report.json");

    let ctx = audit(
        client,
        "[[ignore]]\nkind = \"RemoteNotFound\"\nfile = \".*\\\\.pom\"\n",
        Some(json.as_path()),
    )
    .run(context(&workspace))
    .expect("audit completes");

    let errors = ctx.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::RemoteMismatch);
    assert_eq!(errors[0].file().as_str(), "org/acme/gadget/1.0/gadget-1.0.jar");
    assert_eq!(ctx.ignored_errors().len(), 1);
    assert_eq!(ctx.ignored_errors()[0].kind(), ErrorKind::RemoteNotFound);

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&json).expect("report written")).expect("JSON");
    assert_eq!(report["errors"][0]["kind"], "RemoteMismatch");
    assert_eq!(report["ignored"][0]["kind"], "RemoteNotFound");
}

#[rstest]
fn files_failing_checksums_are_not_probed(workspace: Workspace) {
    workspace.publish_unsigned("org/acme/gadget/1.0/gadget-1.0.jar", "gadget");
    let client = Arc::new(
        StubProbeClient::new()
            .respond(&url("org/acme/widget/1.0/widget-1.0.jar"), nexus_etag("widget"))
            .respond(&url("org/acme/widget/1.0/widget-1.0.pom"), nexus_etag("<project/>")),
    );
    let shared: Arc<dyn ProbeClient> = client.clone();
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(ChecksumValidator::default()),
        Box::new(RemoteComparator::with_client(RemoteSettings::default(), shared)),
    ];

    let ctx = Audit::new(
        ValidationPipeline::new(validators),
        Default::default(),
        ReportingPipeline::default(),
    )
    .run(context(&workspace))
    .expect("audit completes");

    assert_eq!(ctx.error_count(), 1);
    assert_eq!(ctx.errors()[0].kind(), ErrorKind::ChecksumMissing);
    assert!(client.calls().iter().all(|called| !called.contains("gadget")));
    assert_eq!(client.calls().len(), 2);
}

#[rstest]
fn transport_failures_are_recorded_once_per_probe(workspace: Workspace) {
    let jar = url("org/acme/widget/1.0/widget-1.0.jar");
    let client = StubProbeClient::new()
        .fail(
            &jar,
            ProbeError::Transport {
                url: jar.clone(),
                reason: "connection reset".to_owned(),
            },
        )
        .respond(&url("org/acme/widget/1.0/widget-1.0.pom"), nexus_etag("<project/>"));

    let ctx = audit(client, "", None)
        .run(context(&workspace))
        .expect("audit completes");

    let errors = ctx.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::RemoteTransportFailure);
    assert!(errors[0].causes().iter().any(|cause| cause.contains("connection reset")));
}

#[rstest]
fn distribution_defects_do_not_hide_remote_mismatches(workspace: Workspace) {
    workspace.write("dist/org/acme/widget/1.0/widget-1.0.jar", "repackaged widget");
    let client = StubProbeClient::new()
        .respond(
            &url("org/acme/widget/1.0/widget-1.0.jar"),
            ProbeResponse::new(200)
                .with_header("ETag", "\"{SHA1{0000000000000000000000000000000000000000}}\""),
        )
        .respond(&url("org/acme/widget/1.0/widget-1.0.pom"), nexus_etag("<project/>"));
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(ChecksumValidator::default()),
        Box::new(DistributionValidator::default()),
        Box::new(RemoteComparator::with_client(
            RemoteSettings::default(),
            Arc::new(client),
        )),
    ];

    let ctx = Audit::new(
        ValidationPipeline::new(validators),
        Default::default(),
        ReportingPipeline::default(),
    )
    .run(context(&workspace).with_distribution(workspace.path("dist")))
    .expect("audit completes");

    let recorded: Vec<(ErrorKind, FileRoot)> = ctx
        .errors()
        .iter()
        .map(|error| (error.kind(), error.root()))
        .collect();
    assert_eq!(
        recorded,
        [
            (ErrorKind::DistributionMissing, FileRoot::Repository),
            (ErrorKind::DistributionRedundant, FileRoot::Distribution),
            (ErrorKind::DistributionCorrupted, FileRoot::Distribution),
            (ErrorKind::RemoteMismatch, FileRoot::Repository),
        ]
    );
    assert_eq!(
        ctx.errors()[3].file().as_str(),
        "org/acme/widget/1.0/widget-1.0.jar"
    );
}
