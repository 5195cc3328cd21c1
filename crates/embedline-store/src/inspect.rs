use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::Result;

/// Metadata read back from a shard without decoding its rows.
#[derive(Debug, Clone)]
pub struct ShardSummary {
    pub path: PathBuf,
    pub num_rows: i64,
    pub num_row_groups: usize,
    pub schema: SchemaRef,
}

impl ShardSummary {
    /// Width of the `embedding` column, if the shard has one.
    pub fn embedding_dim(&self) -> Option<i32> {
        match self.schema.field_with_name("embedding").ok()?.data_type() {
            arrow::datatypes::DataType::FixedSizeList(_, dim) => Some(*dim),
            _ => None,
        }
    }
}

/// Read a shard's footer and report its row count and schema.
pub fn inspect_shard(path: &Path) -> Result<ShardSummary> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let metadata = builder.metadata();
    Ok(ShardSummary {
        path: path.to_path_buf(),
        num_rows: metadata.file_metadata().num_rows(),
        num_row_groups: metadata.num_row_groups(),
        schema: builder.schema().clone(),
    })
}
