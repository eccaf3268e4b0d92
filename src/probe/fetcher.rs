//! Single-endpoint probe
//!
//! One GET per record, redirects followed up to the configured cap, no retry.
//! Transport failures are absorbed here and turned into a failing verdict;
//! nothing a single probe does can abort the run.

use reqwest::{header::CONTENT_TYPE, redirect, Client, Response};
use std::time::Instant;

use crate::config::Config;
use crate::error::{Error, Result, SiftErrorTrait};
use crate::models::SourceRecord;
use crate::probe::validate::{ContentValidator, FailReason, PageSnapshot, Verdict};
use crate::utils::{duration_ms, format_bytes};
use crate::utils::error::ProbeError;

/// HTTP prober for source endpoints
///
/// The underlying client is shared by every worker of a run, so connection
/// pools and TLS sessions are reused across probes.
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    /// HTTP client with timeouts, redirect cap and TLS policy applied
    client: Client,

    /// Content heuristic applied to every response
    validator: ContentValidator,

    /// Number of body bytes read for HTML pages
    max_body_bytes: usize,

    /// Replace the display name with the page title on a pass
    rename_from_title: bool,
}

impl EndpointProbe {
    /// Build a probe from the `[http]` and `[filter]` sections
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an out-of-range timeout and `Error::Http`
    /// if the HTTP client cannot be created
    pub fn new(config: &Config) -> Result<Self> {
        let http = &config.http;
        let request_timeout = config
            .request_timeout()
            .map_err(|e| Error::config(e.to_string()))?;
        let read_timeout = config
            .read_timeout()
            .map_err(|e| Error::config(e.to_string()))?;

        let mut builder = Client::builder()
            .user_agent(http.user_agent.as_str())
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .read_timeout(read_timeout)
            .redirect(redirect::Policy::limited(http.max_redirects))
            .danger_accept_invalid_certs(!http.verify_tls)
            .gzip(true);

        if !http.trust_env {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            validator: ContentValidator::new(&config.filter, http.max_body_bytes),
            max_body_bytes: http.max_body_bytes,
            rename_from_title: http.rename_from_title,
        })
    }

    /// Probe one record
    ///
    /// Sets `respond_time` whenever a response was received, whatever the
    /// verdict. On a transport failure the field ends up unset.
    pub async fn probe(&self, record: &mut SourceRecord) -> Verdict {
        // A latency carried over from an imported file is not a measurement.
        record.respond_time = None;
        let started = Instant::now();

        match self.fetch(&record.url).await {
            Ok(page) => {
                let respond_ms = duration_ms(started.elapsed());
                record.respond_time = Some(respond_ms);

                let assessment = self.validator.assess(&page, self.rename_from_title);
                if let Some(title) = assessment.title {
                    tracing::trace!(url = %record.url, old = %record.name, new = %title, "Renamed from title");
                    record.name = title;
                }

                tracing::debug!(
                    url = %record.url,
                    status = page.status,
                    body = %format_bytes(page.body.len() as u64),
                    respond_ms,
                    verdict = %assessment.verdict,
                    "Probed"
                );
                assessment.verdict
            }
            Err(e) => {
                tracing::debug!(
                    url = %record.url,
                    kind = e.kind(),
                    category = e.category().description(),
                    error = %e,
                    "Probe failed"
                );
                Verdict::Fail(FailReason::Network(e.kind()))
            }
        }
    }

    /// Send the request and read as much of the body as the heuristic needs
    async fn fetch(&self, url: &str) -> std::result::Result<PageSnapshot, ProbeError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        // Non-200 responses fail on status alone.
        let body = if status != 200 {
            Vec::new()
        } else if content_type.to_ascii_lowercase().contains("json") {
            response.bytes().await?.to_vec()
        } else {
            read_capped(&mut response, self.max_body_bytes).await?
        };

        Ok(PageSnapshot {
            status,
            content_type,
            body,
        })
    }
}

/// Read at most `cap` body bytes, stopping the transfer once the cap is hit
async fn read_capped(
    response: &mut Response,
    cap: usize,
) -> std::result::Result<Vec<u8>, ProbeError> {
    let mut body = Vec::with_capacity(cap.min(16 * 1024));

    while let Some(chunk) = response.chunk().await? {
        let remaining = cap - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
        if body.len() >= cap {
            break;
        }
    }

    Ok(body)
}
