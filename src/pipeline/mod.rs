//! Stage orchestration
//!
//! A run is a fixed, ordered list of stages over one shared context. Each
//! stage takes what it needs out of the context, works on it synchronously
//! (the prober being the only concurrent part), and puts its output back
//! before the next stage starts.
//!
//! ```text
//! Load ─▶ Classify ─▶ UrlCheck ─▶ Dedupe ─▶ Save
//!              │           │          │
//!         no-domain   unreachable  duplicates
//! ```
//!
//! A stage whose toggle is off is skipped. A stage that returns an error
//! aborts the run.

pub mod stages;

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};

use crate::classify::DomainCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Bucket, BucketCounts, SourceRecord};
use crate::utils::{duration_ms, format_elapsed};

pub use stages::{ClassifyStage, DedupeStage, LoadStage, SaveStage, UrlCheckStage};

/// Working state shared by the stages of one run
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// Loaded, not yet classified
    pub sources: Vec<SourceRecord>,

    /// Records still in play: resolved, then reachable, then unique
    pub valid: Vec<SourceRecord>,

    pub no_domain: Vec<SourceRecord>,
    pub unreachable: Vec<SourceRecord>,
    pub duplicates: Vec<SourceRecord>,

    /// URL resolution memo, lives for the run
    pub domain_cache: DomainCache,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from records already in memory instead of the input directory
    pub fn with_sources(sources: Vec<SourceRecord>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    /// Records currently in a bucket; `valid` stands for the unique bucket
    pub fn bucket(&self, bucket: Bucket) -> &[SourceRecord] {
        match bucket {
            Bucket::NoDomain => &self.no_domain,
            Bucket::Unreachable => &self.unreachable,
            Bucket::Duplicate => &self.duplicates,
            Bucket::Unique => &self.valid,
        }
    }

    /// Current bucket sizes; records still in `valid` count as unique
    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            no_domain: self.no_domain.len(),
            unreachable: self.unreachable.len(),
            duplicates: self.duplicates.len(),
            unique: self.valid.len(),
        }
    }
}

/// One step of a run
#[async_trait]
pub trait PipelineStage: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Whether the stage runs under this configuration
    fn enabled(&self, _config: &Config) -> bool {
        true
    }

    /// Run the stage, returning a one-line summary
    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String>;
}

/// The closed set of stages a pipeline is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Classify,
    UrlCheck,
    Dedupe,
    Save,
}

#[async_trait]
impl PipelineStage for Stage {
    fn name(&self) -> &'static str {
        match self {
            Self::Load => LoadStage.name(),
            Self::Classify => ClassifyStage.name(),
            Self::UrlCheck => UrlCheckStage.name(),
            Self::Dedupe => DedupeStage.name(),
            Self::Save => SaveStage.name(),
        }
    }

    fn enabled(&self, config: &Config) -> bool {
        match self {
            Self::Load => LoadStage.enabled(config),
            Self::Classify => ClassifyStage.enabled(config),
            Self::UrlCheck => UrlCheckStage.enabled(config),
            Self::Dedupe => DedupeStage.enabled(config),
            Self::Save => SaveStage.enabled(config),
        }
    }

    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String> {
        match self {
            Self::Load => LoadStage.run(ctx, config).await,
            Self::Classify => ClassifyStage.run(ctx, config).await,
            Self::UrlCheck => UrlCheckStage.run(ctx, config).await,
            Self::Dedupe => DedupeStage.run(ctx, config).await,
            Self::Save => SaveStage.run(ctx, config).await,
        }
    }
}

/// What happened to one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Ran { summary: String },
    Skipped,
}

/// Per-stage entry of a [`PipelineReport`]
#[derive(Debug, Clone)]
pub struct StageReport {
    pub name: &'static str,
    pub outcome: StageOutcome,
    pub elapsed: Duration,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub total_elapsed: Duration,
    pub counts: BucketCounts,
}

impl PipelineReport {
    /// Look up a stage entry by name
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Whether the named stage actually ran
    pub fn ran(&self, name: &str) -> bool {
        self.stage(name)
            .is_some_and(|s| matches!(s.outcome, StageOutcome::Ran { .. }))
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            match &stage.outcome {
                StageOutcome::Ran { summary } => writeln!(
                    f,
                    "[{}] {} ({})",
                    stage.name,
                    summary,
                    format_elapsed(stage.elapsed)
                )?,
                StageOutcome::Skipped => writeln!(f, "[{}] skipped", stage.name)?,
            }
        }
        write!(f, "{} in {}", self.counts, format_elapsed(self.total_elapsed))
    }
}

/// Ordered list of stages
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Load, classify, probe, deduplicate, save
    pub fn standard() -> Self {
        Self::new(vec![
            Stage::Load,
            Stage::Classify,
            Stage::UrlCheck,
            Stage::Dedupe,
            Stage::Save,
        ])
    }

    /// The core stages, for records supplied through the context
    pub fn in_memory() -> Self {
        Self::new(vec![Stage::Classify, Stage::UrlCheck, Stage::Dedupe])
    }

    /// Load and classify only; nothing touches the network or the output
    pub fn classify_only() -> Self {
        Self::new(vec![Stage::Load, Stage::Classify])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every enabled stage in order
    ///
    /// # Errors
    ///
    /// Returns `Error::Stage` for the first stage that fails; later stages
    /// do not run
    pub async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<PipelineReport> {
        let total_start = Instant::now();
        let mut report = PipelineReport::default();

        for stage in &self.stages {
            let name = stage.name();

            if !stage.enabled(config) {
                tracing::debug!(stage = name, "Stage disabled, skipping");
                report.stages.push(StageReport {
                    name,
                    outcome: StageOutcome::Skipped,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            tracing::info!(stage = name, "Starting stage");
            let start = Instant::now();
            let result = stage.run(ctx, config).await;
            let elapsed = start.elapsed();

            match result {
                Ok(summary) => {
                    tracing::info!(
                        stage = name,
                        elapsed_ms = duration_ms(elapsed),
                        "{summary}"
                    );
                    report.stages.push(StageReport {
                        name,
                        outcome: StageOutcome::Ran { summary },
                        elapsed,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        stage = name,
                        elapsed_ms = duration_ms(elapsed),
                        error = %e,
                        "Stage failed"
                    );
                    return Err(Error::stage(name, e));
                }
            }
        }

        report.total_elapsed = total_start.elapsed();
        report.counts = ctx.counts();

        tracing::info!(
            unique = report.counts.unique,
            duplicates = report.counts.duplicates,
            unreachable = report.counts.unreachable,
            no_domain = report.counts.no_domain,
            elapsed = %format_elapsed(report.total_elapsed),
            "Pipeline completed"
        );

        Ok(report)
    }
}
