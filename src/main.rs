use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sourcesift::config::Config;
use sourcesift::error::SiftErrorTrait;
use sourcesift::pipeline::{Pipeline, PipelineContext, PipelineReport};

#[derive(Parser)]
#[command(
    name = "sourcesift",
    version,
    about = "Classify, probe and deduplicate content-source descriptors",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: load, classify, probe, deduplicate, save
    Run {
        /// Input directory with source files
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip endpoint probing
        #[arg(long, default_value = "false")]
        no_check: bool,

        /// Skip domain deduplication
        #[arg(long, default_value = "false")]
        no_dedup: bool,

        /// Number of concurrent probes
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Load and classify only, then print tag statistics
    Classify {
        /// Input directory with source files
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Write the default configuration as TOML
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "sourcesift.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env();

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Run {
            input,
            output,
            no_check,
            no_dedup,
            workers,
        } => {
            if let Some(input) = input {
                config.output.input_dir = input;
            }
            if let Some(output) = output {
                config.output.output_dir = output;
            }
            if let Some(workers) = workers {
                config.http.max_workers = workers;
            }
            config.pipeline.url_check &= !no_check;
            config.pipeline.dedup_by_domain &= !no_dedup;
            config.validate()?;

            tracing::info!(
                input = %config.output.input_dir.display(),
                output = %config.output.output_dir.display(),
                workers = config.http.max_workers,
                url_check = config.pipeline.url_check,
                dedup = config.pipeline.dedup_by_domain,
                "Starting run"
            );

            let mut ctx = PipelineContext::new();
            let report = run_pipeline(&Pipeline::standard(), &mut ctx, &config).await?;
            println!("{report}");
        }

        Commands::Classify { input } => {
            if let Some(input) = input {
                config.output.input_dir = input;
            }
            config.validate()?;

            let mut ctx = PipelineContext::new();
            run_pipeline(&Pipeline::classify_only(), &mut ctx, &config).await?;
            print_classification(&ctx, &config);
        }

        Commands::InitConfig { path, force } => {
            init_config(&path, force)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("sourcesift=debug,info")
        } else {
            EnvFilter::new(format!("sourcesift={level},warn"))
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to install tracing subscriber")?;
        }
    }

    Ok(())
}

async fn run_pipeline(
    pipeline: &Pipeline,
    ctx: &mut PipelineContext,
    config: &Config,
) -> Result<PipelineReport> {
    match pipeline.run(ctx, config).await {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!(
                category = e.category().description(),
                recoverable = e.is_recoverable(),
                "Run aborted"
            );
            Err(e.into())
        }
    }
}

fn print_classification(ctx: &PipelineContext, config: &Config) {
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_tag: BTreeMap<&str, usize> = BTreeMap::new();

    for record in ctx.valid.iter().chain(&ctx.no_domain) {
        let label = config
            .classify
            .type_label(record.type_id)
            .map_or_else(|| format!("type-{}", record.type_id), str::to_string);
        *by_type.entry(label).or_default() += 1;

        for tag in &record.tags {
            *by_tag.entry(tag.as_str()).or_default() += 1;
        }
    }

    println!(
        "Classified {} records ({} with a domain, {} without)",
        ctx.valid.len() + ctx.no_domain.len(),
        ctx.valid.len(),
        ctx.no_domain.len()
    );

    println!("By type:");
    for (label, count) in &by_type {
        println!("  {label}: {count}");
    }

    println!("By tag:");
    for (tag, count) in &by_tag {
        println!("  {tag}: {count}");
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let rendered = Config::default().to_toml()?;
    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
