//! The five standard stages

use async_trait::async_trait;
use std::mem;

use crate::classify::ClassificationEngine;
use crate::config::Config;
use crate::dedup::deduplicate_by_domain;
use crate::error::Result;
use crate::models::{sort_for_output, Bucket};
use crate::pipeline::{PipelineContext, PipelineStage};
use crate::probe::{ConcurrentProber, EndpointProbe};
use crate::storage::{BucketWriter, SourceLoader};

/// Reads the input directory into `sources`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStage;

#[async_trait]
impl PipelineStage for LoadStage {
    fn name(&self) -> &'static str {
        "load"
    }

    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String> {
        let loader = SourceLoader::new(&config.output.input_dir);
        let loaded = loader.load()?;

        let summary = format!(
            "loaded {} records from {} files in {} ({} skipped)",
            loaded.records.len(),
            loaded.files.len(),
            loader.input_dir().display(),
            loaded.skipped.len()
        );
        ctx.sources.extend(loaded.records);

        Ok(summary)
    }
}

/// Tags every record and splits off the ones without a domain
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyStage;

#[async_trait]
impl PipelineStage for ClassifyStage {
    fn name(&self) -> &'static str {
        "classify"
    }

    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String> {
        let engine = ClassificationEngine::new(&config.classify)?;
        let sources = mem::take(&mut ctx.sources);

        let mut batch = engine.classify_batch(sources, &mut ctx.domain_cache);
        sort_for_output(&mut batch.resolved);
        sort_for_output(&mut batch.no_domain);

        tracing::debug!(
            distinct_urls = ctx.domain_cache.len(),
            cache_hits = ctx.domain_cache.hits(),
            "Domain cache"
        );

        let summary = format!(
            "probe-eligible {}, no-domain {}",
            batch.resolved.len(),
            batch.no_domain.len()
        );
        ctx.valid.extend(batch.resolved);
        ctx.no_domain.extend(batch.no_domain);

        Ok(summary)
    }
}

/// Probes every record with a domain; failures move to `unreachable`
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlCheckStage;

#[async_trait]
impl PipelineStage for UrlCheckStage {
    fn name(&self) -> &'static str {
        "url-check"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.pipeline.url_check
    }

    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String> {
        let probe = EndpointProbe::new(config)?;
        let prober = ConcurrentProber::new(probe, config.http.max_workers)
            .with_progress_every(config.pipeline.progress_every);

        let results = prober.run(mem::take(&mut ctx.valid)).await;

        if !results.fail_reasons.is_empty() {
            tracing::info!(reasons = ?results.fail_reasons, "Unreachable by reason");
        }

        let summary = format!(
            "probed {}: reachable {}, unreachable {}",
            results.total(),
            results.reachable.len(),
            results.unreachable.len()
        );
        ctx.valid = results.reachable;
        ctx.unreachable.extend(results.unreachable);

        Ok(summary)
    }
}

/// Keeps the fastest record per domain
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupeStage;

#[async_trait]
impl PipelineStage for DedupeStage {
    fn name(&self) -> &'static str {
        "dedupe"
    }

    fn enabled(&self, config: &Config) -> bool {
        config.pipeline.dedup_by_domain
    }

    async fn run(&self, ctx: &mut PipelineContext, _config: &Config) -> Result<String> {
        let outcome = deduplicate_by_domain(mem::take(&mut ctx.valid));
        tracing::debug!(ratio = %format!("{:.3}", outcome.dedup_ratio()), "Duplicate share");

        let summary = format!(
            "kept {}, duplicates {}",
            outcome.unique.len(),
            outcome.duplicates.len()
        );
        ctx.valid = outcome.unique;
        ctx.duplicates.extend(outcome.duplicates);

        Ok(summary)
    }
}

/// Writes every bucket to the output directory
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveStage;

#[async_trait]
impl PipelineStage for SaveStage {
    fn name(&self) -> &'static str {
        "save"
    }

    async fn run(&self, ctx: &mut PipelineContext, config: &Config) -> Result<String> {
        let writer = BucketWriter::new(config);
        writer.prepare()?;

        let counts = ctx.counts();
        let mut files = Vec::new();
        for bucket in Bucket::all() {
            let records = ctx.bucket(bucket);
            let written = match bucket {
                Bucket::Unique => writer.write_unique(records)?,
                _ => writer.write_bucket(bucket, records)?,
            };
            tracing::debug!(%bucket, records = counts.get(bucket), files = written.len(), "Wrote bucket");
            files.extend(written);
        }

        Ok(format!(
            "wrote {} files to {}",
            files.len(),
            writer.output_dir().display()
        ))
    }
}
