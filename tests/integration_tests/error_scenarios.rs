//! Error scenario integration tests
//!
//! Tests failure modes and how far they reach:
//! 1. Per-record probe failures stay inside their bucket
//! 2. Unreadable input files are skipped
//! 3. A failing stage aborts the run with its name attached

use sourcesift::error::{Error, SiftErrorTrait};
use sourcesift::pipeline::{Pipeline, PipelineContext, Stage};
use sourcesift::storage::SourceLoader;
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{sample_batch, NOVEL_SITE_HTML};
use crate::common::{closed_port_uri, mock_record, test_config, write_sources};

// ============================================================================
// Per-record failures
// ============================================================================

#[tokio::test]
async fn test_probe_failures_never_abort_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(NOVEL_SITE_HTML, "text/html")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let closed = closed_port_uri();

    let mut ctx = PipelineContext::new();
    ctx.valid = vec![
        mock_record(&server.uri(), "/", "slow", "slow.com"),
        mock_record(&closed, "/", "closed", "closed.com"),
        mock_record("ftp://files.example.com", "", "wrong scheme", "example.com"),
    ];

    let report = assert_ok!(
        Pipeline::new(vec![Stage::UrlCheck])
            .run(&mut ctx, &test_config())
            .await
    );

    assert_eq!(report.counts.unreachable, 3);
    assert!(ctx.valid.is_empty());
    assert!(ctx.unreachable.iter().all(|r| r.respond_time.is_none()));
}

#[test]
fn test_broken_input_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    write_sources(temp.path(), "good.json", &sample_batch());
    std::fs::write(temp.path().join("bad.json"), r#"[{"bookSourceUrl": 1}]"#).unwrap();

    let loaded = assert_ok!(SourceLoader::new(temp.path()).load());

    assert_eq!(loaded.records.len(), sample_batch().len());
    assert_eq!(loaded.skipped.len(), 1);
}

// ============================================================================
// Stage failures
// ============================================================================

#[tokio::test]
async fn test_unwritable_output_aborts_at_save() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    write_sources(&input, "batch.json", &sample_batch());

    // A regular file where the output directory should be.
    let output = temp.path().join("output");
    std::fs::write(&output, "not a directory").unwrap();

    let mut config = test_config();
    config.pipeline.url_check = false;
    config.output.input_dir = input;
    config.output.output_dir = output;

    let mut ctx = PipelineContext::new();
    let err = assert_err!(Pipeline::standard().run(&mut ctx, &config).await);

    match &err {
        Error::Stage { stage, .. } => assert_eq!(*stage, "save"),
        other => panic!("expected a stage error, got {other:?}"),
    }
    assert!(err.to_string().starts_with("Stage 'save' failed"));
    assert!(!err.is_recoverable());

    // Earlier stages did their work before the abort.
    assert_eq!(ctx.no_domain.len(), 1);
}

#[tokio::test]
async fn test_failed_stage_stops_later_stages() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input-file");
    std::fs::write(&input, "a file, not a directory").unwrap();

    let mut config = test_config();
    config.pipeline.url_check = false;
    config.output.input_dir = input;
    config.output.output_dir = temp.path().join("output");

    let mut ctx = PipelineContext::new();
    let err = assert_err!(Pipeline::standard().run(&mut ctx, &config).await);

    assert!(matches!(err, Error::Stage { stage: "load", .. }));
    assert!(!temp.path().join("output").exists(), "save never ran");
}
