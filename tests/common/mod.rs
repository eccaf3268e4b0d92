//! Common test utilities

#![allow(dead_code)]

use sourcesift::config::Config;
use sourcesift::models::SourceRecord;
use std::path::Path;

/// Configuration tuned for tests: short timeouts, no proxies, small pool
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.http.timeout_secs = 2.0;
    config.http.read_timeout_secs = 1.0;
    config.http.max_workers = 8;
    config.http.trust_env = false;
    config.pipeline.progress_every = 0;
    config
}

/// A record pointing at a mock server path, already resolved
///
/// Mock servers listen on an IP literal, which the resolver rejects, so the
/// domain is set by hand.
pub fn mock_record(base_uri: &str, path: &str, name: &str, domain: &str) -> SourceRecord {
    SourceRecord {
        domain: domain.to_string(),
        ..SourceRecord::new(format!("{base_uri}{path}"), name)
    }
}

/// Base URI of a local port nothing listens on
///
/// The port is taken from a listener that is dropped right away, so a connect
/// to it is refused.
pub fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// A record with a latency, as left behind by the prober
pub fn timed_record(domain: &str, name: &str, respond_ms: u64) -> SourceRecord {
    SourceRecord {
        domain: domain.to_string(),
        respond_time: Some(respond_ms),
        ..SourceRecord::new(format!("https://{domain}"), name)
    }
}

/// Write records as one input file
pub fn write_sources(dir: &Path, file: &str, records: &[serde_json::Value]) {
    std::fs::create_dir_all(dir).unwrap();
    let content = serde_json::to_string_pretty(records).unwrap();
    std::fs::write(dir.join(file), content).unwrap();
}

/// Read an output file back as JSON values
pub fn read_bucket(path: &Path) -> Vec<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("missing {}: {e}", path.display()));
    serde_json::from_str(&content).unwrap()
}

/// Minimal HTML page containing `body`
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>{body}</body>\n</html>"
    )
}
