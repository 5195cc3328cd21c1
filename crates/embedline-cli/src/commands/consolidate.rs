use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use embedline_store::consolidate::{ConsolidateConfig, consolidate};

use super::parse_positive;

#[derive(Debug, Args)]
pub struct ConsolidateArgs {
    /// Directory holding the small shards
    #[arg(long, default_value = "/mnt/sdb_mount_point/embeddings/shards")]
    pub source_dir: PathBuf,

    /// Directory for the merged files, created if missing
    #[arg(long, default_value = "/mnt/sdb_mount_point/embeddings/consolidated")]
    pub output_dir: PathBuf,

    /// Shards merged into each output file
    #[arg(long, alias = "chunk-size", default_value = "10000", value_parser = parse_positive)]
    pub files_per_chunk: usize,

    #[arg(long, default_value = "65536", value_parser = parse_positive)]
    pub row_group_size: usize,
}

pub async fn run(args: ConsolidateArgs) -> Result<()> {
    let config = ConsolidateConfig::default()
        .with_files_per_chunk(args.files_per_chunk)
        .with_row_group_size(args.row_group_size);
    let ConsolidateArgs {
        source_dir,
        output_dir,
        ..
    } = args;

    let report = tokio::task::spawn_blocking(move || consolidate(&source_dir, &output_dir, &config))
        .await
        .context("consolidation task panicked")??;

    tracing::info!(
        files = report.files_found,
        outputs = report.outputs.len(),
        rows = report.rows_written,
        failed_chunks = report.failed_chunks,
        "consolidation complete"
    );
    Ok(())
}
