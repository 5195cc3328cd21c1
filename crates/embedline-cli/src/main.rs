use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AutotuneArgs, BenchArgs, ConsolidateArgs, EmbedArgs, VerifyArgs};

const DEFAULT_FILTER: &str =
    "embedline=info,embedline_pipeline=info,embedline_tune=info,embedline_store=info";

#[derive(Parser)]
#[command(name = "embedline")]
#[command(about = "Tweet embedding pipeline: embed, benchmark, autotune and compact shards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed documents from an NDJSON file or a SQLite store into Parquet shards
    Embed(EmbedArgs),
    /// Benchmark an endpoint with synthetic documents
    Bench(BenchArgs),
    /// Grid-search batch size and concurrency against a latency target
    Autotune(AutotuneArgs),
    /// Merge small Parquet shards into larger files
    Consolidate(ConsolidateArgs),
    /// Print row count and schema of a Parquet file
    Verify(VerifyArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Embed(args) => commands::embed::run(args).await,
        Commands::Bench(args) => commands::bench::run(args).await,
        Commands::Autotune(args) => commands::autotune::run(args).await,
        Commands::Consolidate(args) => commands::consolidate::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
    }
}
