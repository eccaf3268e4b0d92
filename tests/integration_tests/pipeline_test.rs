//! End-to-end pipeline integration tests
//!
//! Tests the complete workflow:
//! 1. Loading import files
//! 2. Classification and URL resolution
//! 3. Endpoint probing (mocked)
//! 4. Domain deduplication
//! 5. Bucket output

use sourcesift::models::BucketCounts;
use sourcesift::pipeline::{Pipeline, PipelineContext, Stage, StageOutcome};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{sample_batch, NOVEL_SITE_HTML, PARKED_HTML};
use crate::common::{mock_record, read_bucket, test_config, write_sources};

async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str, delay_ms: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw(body.to_string(), "text/html; charset=utf-8")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(server)
        .await;
}

// ============================================================================
// Directory-to-directory runs
// ============================================================================

#[tokio::test]
async fn test_offline_run_writes_every_bucket() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    write_sources(&input, "batch.json", &sample_batch());

    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("stale.json"), "[]").unwrap();

    let mut config = test_config();
    config.pipeline.url_check = false;
    config.output.input_dir = input;
    config.output.output_dir = output.clone();

    let mut ctx = PipelineContext::new();
    let report = Pipeline::standard().run(&mut ctx, &config).await.unwrap();

    assert_eq!(
        report.counts,
        BucketCounts {
            no_domain: 1,
            unreachable: 0,
            duplicates: 1,
            unique: 3,
        }
    );
    assert_eq!(
        report.stage("url-check").map(|s| &s.outcome),
        Some(&StageOutcome::Skipped)
    );

    assert!(!output.join("stale.json").exists(), "output is cleared first");
    assert!(!output.join("unreachable.json").exists(), "empty buckets write nothing");

    let no_domain = read_bucket(&output.join("no-domain.json"));
    assert_eq!(no_domain[0]["bookSourceName"], "局域网书源");
    assert_eq!(no_domain[0]["bookSourceUrl"], "http://192.168.1.20:8080/api");

    let duplicates = read_bucket(&output.join("duplicates.json"));
    assert_eq!(duplicates.len(), 1);

    let novels = read_bucket(&output.join("小说.json"));
    assert_eq!(novels.len(), 2);
    let qidian = novels
        .iter()
        .find(|r| r["bookSourceName"] == "起点中文网")
        .unwrap();
    assert_eq!(qidian["bookSourceUrl"], "https://www.qidian.com");
    assert_eq!(qidian["bookSourceGroup"], "正版");
    assert_eq!(qidian["ruleSearch"]["bookList"], "class.list@tag.li");
    assert!(qidian.get("domain").is_none());

    let comics = read_bucket(&output.join("漫画.json"));
    assert_eq!(comics[0]["bookSourceGroup"], "漫画");
    assert_eq!(comics[0]["bookSourceUrl"], "https://manhua.example.org");
}

#[tokio::test]
async fn test_primary_category_layout() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    write_sources(&input, "batch.json", &sample_batch());

    let mut config = test_config();
    config.pipeline.url_check = false;
    config.pipeline.dedup_by_domain = false;
    config.classify.store_primary_category = true;
    config.output.input_dir = input;
    config.output.output_dir = output.clone();

    let mut ctx = PipelineContext::new();
    Pipeline::standard().run(&mut ctx, &config).await.unwrap();

    let premium = read_bucket(&output.join("小说").join("精品.json"));
    assert_eq!(premium[0]["bookSourceName"], "笔趣阁 精品");
    assert_eq!(read_bucket(&output.join("小说").join("正版.json")).len(), 1);
    // No category matched: filed under the type label.
    assert_eq!(read_bucket(&output.join("小说").join("小说.json")).len(), 1);
    assert_eq!(read_bucket(&output.join("漫画").join("漫画.json")).len(), 1);
}

#[tokio::test]
async fn test_classify_only_leaves_output_alone() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input");
    let output = temp.path().join("output");
    write_sources(&input, "batch.json", &sample_batch());

    let mut config = test_config();
    config.output.input_dir = input;
    config.output.output_dir = output.clone();

    let mut ctx = PipelineContext::new();
    let report = Pipeline::classify_only().run(&mut ctx, &config).await.unwrap();

    assert_eq!(report.stages.len(), 2);
    assert!(report.ran("load"));
    assert!(report.ran("classify"));
    assert_eq!(ctx.valid.len(), 4);
    assert_eq!(ctx.no_domain.len(), 1);
    assert!(!output.exists());
}

// ============================================================================
// Probing through the pipeline
// ============================================================================

#[tokio::test]
async fn test_probe_and_dedupe_against_mock_server() {
    let server = MockServer::start().await;
    mount_page(&server, "/fast", 200, NOVEL_SITE_HTML, 20).await;
    mount_page(&server, "/slow", 200, NOVEL_SITE_HTML, 300).await;
    mount_page(&server, "/parked", 200, PARKED_HTML, 0).await;
    mount_page(&server, "/gone", 404, "", 0).await;
    mount_page(&server, "/other", 200, NOVEL_SITE_HTML, 0).await;

    let uri = server.uri();
    let mut ctx = PipelineContext::new();
    ctx.valid = vec![
        mock_record(&uri, "/slow", "slow mirror", "biquge.info"),
        mock_record(&uri, "/fast", "fast mirror", "biquge.info"),
        mock_record(&uri, "/parked", "parked", "parked.net"),
        mock_record(&uri, "/gone", "gone", "gone.org"),
        mock_record(&uri, "/other", "other", "qidian.com"),
    ];

    let pipeline = Pipeline::new(vec![Stage::UrlCheck, Stage::Dedupe]);
    let report = pipeline.run(&mut ctx, &test_config()).await.unwrap();

    assert_eq!(
        report.counts,
        BucketCounts {
            no_domain: 0,
            unreachable: 2,
            duplicates: 1,
            unique: 2,
        }
    );

    let unique: Vec<_> = ctx.valid.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(unique, vec!["fast mirror", "other"]);
    assert_eq!(ctx.duplicates[0].name, "slow mirror");

    let unreachable: Vec<_> = ctx.unreachable.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(unreachable, vec!["gone", "parked"]);
    assert!(ctx.unreachable.iter().all(|r| r.respond_time.is_some()));
}

#[tokio::test]
async fn test_reachable_sorted_by_name_then_latency() {
    let server = MockServer::start().await;
    mount_page(&server, "/b", 200, NOVEL_SITE_HTML, 200).await;
    mount_page(&server, "/a", 200, NOVEL_SITE_HTML, 50).await;
    mount_page(&server, "/same-slow", 200, NOVEL_SITE_HTML, 250).await;
    mount_page(&server, "/same-fast", 200, NOVEL_SITE_HTML, 0).await;

    let uri = server.uri();
    let mut ctx = PipelineContext::new();
    ctx.valid = vec![
        mock_record(&uri, "/b", "b", "b.com"),
        mock_record(&uri, "/same-slow", "Same", "s1.com"),
        mock_record(&uri, "/a", "A", "a.com"),
        mock_record(&uri, "/same-fast", "same", "s2.com"),
    ];

    let pipeline = Pipeline::new(vec![Stage::UrlCheck]);
    pipeline.run(&mut ctx, &test_config()).await.unwrap();

    let order: Vec<_> = ctx.valid.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["A", "b", "same", "Same"]);
}

#[tokio::test]
async fn test_worker_ceiling_is_respected() {
    let server = MockServer::start().await;
    mount_page(&server, "/page", 200, NOVEL_SITE_HTML, 300).await;

    let uri = server.uri();
    let mut ctx = PipelineContext::new();
    ctx.valid = (0..6)
        .map(|i| mock_record(&uri, "/page", &format!("s{i}"), &format!("d{i}.com")))
        .collect();

    let mut config = test_config();
    config.http.max_workers = 2;

    let started = Instant::now();
    Pipeline::new(vec![Stage::UrlCheck])
        .run(&mut ctx, &config)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(ctx.valid.len(), 6);
    // Six 300ms probes through two workers take at least three rounds.
    assert!(elapsed >= Duration::from_millis(850), "elapsed {elapsed:?}");
}
