//! Starload pipeline binary.
//!
//! Entry points for the external scheduler: `run` executes one load graph
//! pass, `plan` prints the graph without touching the warehouse, `mirror`
//! seeds the staging bucket from the public source bucket.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use starload_pipeline::config::{self, AppConfig, StagingConfig};
use starload_pipeline::pipeline;
use starload_pipeline::runner::GraphRunner;
use starload_tasks::storage::mirror_bucket;
use starload_tasks::RunContext;

#[derive(Parser)]
#[command(name = "starload")]
#[command(version, about = "Star-schema warehouse load pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one pipeline run
    /// Examples:
    ///     starload run
    ///     STARLOAD_MAX_CONCURRENT=2 starload run
    #[command(verbatim_doc_comment)]
    Run,
    /// Print the task graph without executing it
    /// Example:
    ///     starload plan
    #[command(verbatim_doc_comment)]
    Plan,
    /// Mirror the source data into the staging bucket
    /// Example:
    ///     STARLOAD_STAGING_MIRROR_SOURCE_BUCKET=public-source starload mirror
    #[command(verbatim_doc_comment)]
    Mirror,
}

/// Initialize tracing/logging.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,starload_pipeline=debug,starload_tasks=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load staging configuration, falling back to defaults with a warning.
fn load_staging() -> StagingConfig {
    StagingConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load staging config, using defaults");
        StagingConfig::default()
    })
}

async fn run_pipeline() -> Result<()> {
    let app_config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });
    let staging = load_staging();
    let warehouse = config::warehouse_from_env()?;

    let pool = warehouse.create_pool()?;
    let mut ctx = RunContext::new(pool).with_staging_credentials(staging.credentials());
    if let Some(region) = &staging.region {
        ctx = ctx.with_staging_region(region);
    }

    tracing::info!(
        run_id = %ctx.run_id,
        bucket = %staging.bucket,
        max_concurrent = app_config.max_concurrent,
        debug = app_config.debug,
        "Starting pipeline run"
    );

    let graph = pipeline::build_graph(&staging);
    let runner = GraphRunner::new(app_config.max_concurrent);
    let report = runner.run(&graph, &ctx).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        anyhow::bail!(
            "run {} failed at node '{}'",
            report.run_id,
            report.first_failure.as_deref().unwrap_or("unknown")
        );
    }

    Ok(())
}

fn print_plan() -> Result<()> {
    let staging = load_staging();
    let graph = pipeline::build_graph(&staging);
    graph.validate()?;

    println!("Plan ({} nodes):", graph.node_count());
    for id in graph.topological_order()? {
        let upstream: Vec<&str> = graph
            .upstream(id)
            .into_iter()
            .map(|u| graph.node_name(u))
            .collect();
        if upstream.is_empty() {
            println!("  {}", graph.node_name(id));
        } else {
            println!("  {}  <- {}", graph.node_name(id), upstream.join(", "));
        }
    }

    Ok(())
}

async fn run_mirror() -> Result<()> {
    let staging = load_staging();
    let mirror = staging.mirror_config();

    tracing::info!(
        source = %mirror.source_bucket,
        destination = %mirror.destination_bucket,
        "Starting mirror"
    );

    let report = mirror_bucket(&mirror).await?;
    println!("Mirrored {} objects", report.objects_copied);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting starload");

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_pipeline().await,
        Commands::Plan => print_plan(),
        Commands::Mirror => run_mirror().await,
    }
}
