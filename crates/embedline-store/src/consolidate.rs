use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{Result, StoreError};
use crate::writer::{atomic_move, write_parquet};

/// Settings for merging many small shards into fewer large files.
#[derive(Debug, Clone)]
pub struct ConsolidateConfig {
    /// Number of input shards merged into each output file.
    pub files_per_chunk: usize,
    /// Maximum rows per Parquet row group in the output.
    pub row_group_size: usize,
}

impl Default for ConsolidateConfig {
    fn default() -> Self {
        Self {
            files_per_chunk: 10_000,
            row_group_size: 65_536,
        }
    }
}

impl ConsolidateConfig {
    pub fn with_files_per_chunk(mut self, n: usize) -> Self {
        self.files_per_chunk = n;
        self
    }

    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_size = rows;
        self
    }
}

/// Outcome of a consolidation pass.
#[derive(Debug, Clone, Default)]
pub struct ConsolidateReport {
    pub files_found: usize,
    pub outputs: Vec<PathBuf>,
    pub rows_written: usize,
    pub failed_chunks: usize,
}

/// List `*.parquet` files directly under `dir`, sorted by path.
pub fn list_shards(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_parquet = path.extension().is_some_and(|ext| ext == "parquet");
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if is_parquet && !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Output file name for the `index`-th consolidated file.
pub fn consolidated_file_name(index: usize) -> String {
    format!("consolidated-part-{index:05}.parquet")
}

fn read_shard(path: &Path) -> Result<Vec<RecordBatch>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::from)
}

fn merge_chunk(files: &[PathBuf], output: &Path, row_group_size: usize) -> Result<usize> {
    let mut batches = Vec::new();
    for file in files {
        batches.extend(read_shard(file)?);
    }
    let schema = batches
        .first()
        .map(|b| b.schema())
        .ok_or(StoreError::EmptyBatch)?;
    if let Some(bad) = batches.iter().find(|b| b.schema() != schema) {
        return Err(StoreError::Schema(format!(
            "shard schema mismatch: {:?} vs {:?}",
            schema.fields(),
            bad.schema().fields()
        )));
    }

    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = output.with_file_name(format!(".{name}.tmp"));
    let rows = match write_parquet(&batches, &tmp, Some(row_group_size)) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
    };
    atomic_move(&tmp, output)?;
    Ok(rows)
}

/// Merge the shards in `source_dir` into `consolidated-part-NNNNN.parquet`
/// files under `output_dir`.
///
/// A chunk that fails to read or write is logged and skipped; its output
/// index is reused by the next chunk that succeeds.
pub fn consolidate(
    source_dir: &Path,
    output_dir: &Path,
    config: &ConsolidateConfig,
) -> Result<ConsolidateReport> {
    if !output_dir.exists() {
        std::fs::create_dir_all(output_dir)?;
        tracing::info!(dir = %output_dir.display(), "created output directory");
    }

    let files = list_shards(source_dir)?;
    let mut report = ConsolidateReport {
        files_found: files.len(),
        ..Default::default()
    };
    if files.is_empty() {
        tracing::warn!(dir = %source_dir.display(), "no parquet files found");
        return Ok(report);
    }
    tracing::info!(files = files.len(), "found shards to consolidate");

    for (chunk_no, chunk) in files.chunks(config.files_per_chunk.max(1)).enumerate() {
        tracing::info!(chunk = chunk_no + 1, files = chunk.len(), "processing chunk");
        let output = output_dir.join(consolidated_file_name(report.outputs.len()));
        match merge_chunk(chunk, &output, config.row_group_size.max(1)) {
            Ok(rows) => {
                tracing::info!(path = %output.display(), rows, "wrote consolidated file");
                report.rows_written += rows;
                report.outputs.push(output);
            }
            Err(e) => {
                tracing::error!(chunk = chunk_no + 1, error = %e, "failed to consolidate chunk");
                report.failed_chunks += 1;
            }
        }
    }

    tracing::info!(
        outputs = report.outputs.len(),
        failed = report.failed_chunks,
        "consolidation complete"
    );
    Ok(report)
}
