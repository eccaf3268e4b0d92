//! Bounded worker pool for endpoint probes
//!
//! ```text
//! ┌──────────┐  job channel   ┌──────────────┐  result channel  ┌───────────┐
//! │ Producer │───────────────▶│ N probe      │─────────────────▶│ Collector │
//! │  task    │                │ workers      │                  │ (caller)  │
//! └──────────┘                └──────────────┘                  └───────────┘
//! ```
//!
//! Workers share one receiver behind a mutex, so at most `N` probes are in
//! flight no matter how large the batch is. Results arrive in completion
//! order; the buckets are sorted once collection is done.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{sort_for_output, SourceRecord};
use crate::probe::fetcher::EndpointProbe;
use crate::probe::validate::Verdict;
use crate::utils::format_elapsed;

/// Message from the producer to a probe worker
#[derive(Debug)]
struct ProbeJob {
    job_id: usize,
    record: SourceRecord,
}

/// Message from a probe worker to the collector
#[derive(Debug)]
struct ProbeOutcome {
    job_id: usize,
    record: SourceRecord,
    verdict: Verdict,
}

/// Records partitioned by probe verdict
#[derive(Debug, Default)]
pub struct ProbeResults {
    /// Passed the content heuristic, sorted for output
    pub reachable: Vec<SourceRecord>,

    /// Failed at transport or content level, sorted for output
    pub unreachable: Vec<SourceRecord>,

    /// Failure counts by reason label
    pub fail_reasons: BTreeMap<&'static str, usize>,
}

impl ProbeResults {
    /// Total number of probed records
    pub fn total(&self) -> usize {
        self.reachable.len() + self.unreachable.len()
    }
}

/// Fans probes out over a fixed number of workers
#[derive(Debug, Clone)]
pub struct ConcurrentProber {
    probe: Arc<EndpointProbe>,
    max_workers: usize,
    progress_every: usize,
}

impl ConcurrentProber {
    pub fn new(probe: EndpointProbe, max_workers: usize) -> Self {
        Self {
            probe: Arc::new(probe),
            max_workers: max_workers.max(1),
            progress_every: 100,
        }
    }

    /// Log progress every `n` completions (0 disables progress lines)
    pub fn with_progress_every(mut self, n: usize) -> Self {
        self.progress_every = n;
        self
    }

    /// Probe every record and partition the batch
    pub async fn run(&self, records: Vec<SourceRecord>) -> ProbeResults {
        let total = records.len();
        if total == 0 {
            return ProbeResults::default();
        }

        let workers = self.max_workers.min(total);
        let started = Instant::now();
        tracing::info!(total, workers, "Starting probes");

        let (job_tx, job_rx) = mpsc::channel::<ProbeJob>(workers * 2);
        let (result_tx, mut result_rx) = mpsc::channel::<ProbeOutcome>(workers * 2);

        let handles = self.spawn_workers(workers, job_rx, result_tx);

        // Feeding from a separate task keeps both bounded channels draining.
        let producer = tokio::spawn(async move {
            for (job_id, record) in records.into_iter().enumerate() {
                if job_tx.send(ProbeJob { job_id, record }).await.is_err() {
                    tracing::error!("Probe job channel closed");
                    break;
                }
            }
        });

        let mut results = ProbeResults::default();
        let mut completed = 0usize;

        while let Some(outcome) = result_rx.recv().await {
            completed += 1;

            match outcome.verdict {
                Verdict::Pass(_) => results.reachable.push(outcome.record),
                Verdict::Fail(reason) => {
                    tracing::trace!(job_id = outcome.job_id, reason = reason.kind(), "Unreachable");
                    *results.fail_reasons.entry(reason.kind()).or_default() += 1;
                    results.unreachable.push(outcome.record);
                }
            }

            if self.progress_every > 0 && completed % self.progress_every == 0 {
                tracing::info!(
                    completed,
                    total,
                    reachable = results.reachable.len(),
                    "Probe progress"
                );
            }
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Probe worker panicked");
            }
        }
        if let Err(e) = producer.await {
            tracing::error!(error = %e, "Probe producer panicked");
        }

        sort_for_output(&mut results.reachable);
        sort_for_output(&mut results.unreachable);

        tracing::info!(
            total,
            reachable = results.reachable.len(),
            unreachable = results.unreachable.len(),
            elapsed = %format_elapsed(started.elapsed()),
            "Probes completed"
        );

        results
    }

    fn spawn_workers(
        &self,
        workers: usize,
        job_rx: mpsc::Receiver<ProbeJob>,
        result_tx: mpsc::Sender<ProbeOutcome>,
    ) -> Vec<JoinHandle<()>> {
        let job_rx = Arc::new(tokio::sync::Mutex::new(job_rx));
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let probe = Arc::clone(&self.probe);

            let handle = tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = job_rx.lock().await;
                        rx.recv().await
                    };

                    let Some(ProbeJob { job_id, mut record }) = job else {
                        break;
                    };

                    let verdict = probe.probe(&mut record).await;

                    let outcome = ProbeOutcome {
                        job_id,
                        record,
                        verdict,
                    };
                    if result_tx.send(outcome).await.is_err() {
                        tracing::error!(worker_id, "Probe result channel closed");
                        break;
                    }
                }

                tracing::trace!(worker_id, "Probe worker shutting down");
            });

            handles.push(handle);
        }

        handles
    }
}
