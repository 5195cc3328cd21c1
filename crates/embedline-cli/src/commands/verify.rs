use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use embedline_store::inspect::inspect_shard;

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Parquet file to check
    pub file: PathBuf,
}

pub async fn run(args: VerifyArgs) -> Result<()> {
    let path = args.file.clone();
    let result = tokio::task::spawn_blocking(move || inspect_shard(&path))
        .await
        .context("verification task panicked")?;

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!(file = %args.file.display(), error = %e, "failed to read or verify parquet file");
            return Err(e).with_context(|| format!("verifying {}", args.file.display()));
        }
    };

    tracing::info!(
        file = %summary.path.display(),
        rows = summary.num_rows,
        row_groups = summary.num_row_groups,
        embedding_dim = ?summary.embedding_dim(),
        "verified"
    );
    for field in summary.schema.fields() {
        tracing::info!(
            name = %field.name(),
            data_type = %field.data_type(),
            nullable = field.is_nullable(),
            "column"
        );
    }
    Ok(())
}
