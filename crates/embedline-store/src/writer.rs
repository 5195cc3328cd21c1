use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, FixedSizeListArray, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use embedline_core::vector::EmbeddingVector;

use crate::error::{Result, StoreError};

/// Build the Arrow schema for an embeddings shard: `id` plus a fixed-width
/// `embedding` list of `dim` 32-bit floats.
pub fn embeddings_schema(dim: i32) -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, false)), dim),
            false,
        ),
    ])
}

/// Convert parallel id / vector slices into an Arrow RecordBatch.
pub fn embeddings_to_record_batch(ids: &[&str], vectors: &[EmbeddingVector]) -> Result<RecordBatch> {
    if ids.len() != vectors.len() {
        return Err(StoreError::Schema(format!(
            "{} ids for {} vectors",
            ids.len(),
            vectors.len()
        )));
    }
    let Some(first) = vectors.first() else {
        return Err(StoreError::EmptyBatch);
    };
    let dim = first.dimension();
    if dim == 0 {
        return Err(StoreError::Schema("embedding dimension is zero".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.dimension() != dim) {
        return Err(StoreError::Schema(format!(
            "mixed embedding dimensions: {dim} and {}",
            bad.dimension()
        )));
    }
    let dim = i32::try_from(dim)
        .map_err(|_| StoreError::Schema(format!("embedding dimension {dim} too large")))?;

    let schema = Arc::new(embeddings_schema(dim));
    let id_col: ArrayRef = Arc::new(StringArray::from(ids.to_vec()));
    let values = Float32Array::from(
        vectors
            .iter()
            .flat_map(|v| v.as_slice().iter().copied())
            .collect::<Vec<_>>(),
    );
    let item = Arc::new(Field::new("item", DataType::Float32, false));
    let embedding_col: ArrayRef = Arc::new(FixedSizeListArray::try_new(
        item,
        dim,
        Arc::new(values),
        None,
    )?);

    Ok(RecordBatch::try_new(schema, vec![id_col, embedding_col])?)
}

/// Write record batches to a Parquet file with ZSTD compression.
pub fn write_parquet<'a>(
    batches: impl IntoIterator<Item = &'a RecordBatch>,
    path: &Path,
    max_row_group_size: Option<usize>,
) -> Result<usize> {
    let mut batches = batches.into_iter().peekable();
    let Some(first) = batches.peek() else {
        return Err(StoreError::EmptyBatch);
    };
    let schema = first.schema();

    let mut props = WriterProperties::builder().set_compression(Compression::ZSTD(Default::default()));
    if let Some(rows) = max_row_group_size {
        props = props.set_max_row_group_size(rows);
    }

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props.build()))?;
    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;
    Ok(rows)
}

/// Move `from` to `to` so that `to` only ever appears complete.
///
/// Falls back to copy-then-rename through a hidden file next to `to` when the
/// two paths are on different filesystems.
pub fn atomic_move(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => copy_into_place(from, to),
        Err(e) => Err(e.into()),
    }
}

/// Copy `from` to a hidden partial file beside `to`, rename it into place
/// and remove `from`. A failed copy or rename leaves no partial file behind.
fn copy_into_place(from: &Path, to: &Path) -> Result<()> {
    let partial = hidden_sibling(to, "partial");
    if let Err(e) = std::fs::copy(from, &partial).and_then(|_| std::fs::rename(&partial, to)) {
        let _ = std::fs::remove_file(&partial);
        return Err(e.into());
    }
    std::fs::remove_file(from)?;
    Ok(())
}

fn hidden_sibling(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Shard file name for a batch whose ids run from `first_id` to `last_id`.
pub fn shard_file_name(first_id: &str, last_id: &str) -> String {
    format!("part-{}-{}.parquet", sanitize(first_id), sanitize(last_id))
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write one batch of embeddings as a shard: first to `tmp_dir`, then moved
/// into `final_dir` under its id-range name. Returns the final path.
pub fn write_shard(
    ids: &[&str],
    vectors: &[EmbeddingVector],
    tmp_dir: &Path,
    final_dir: &Path,
) -> Result<PathBuf> {
    let batch = embeddings_to_record_batch(ids, vectors)?;
    let (Some(first), Some(last)) = (ids.first(), ids.last()) else {
        return Err(StoreError::EmptyBatch);
    };
    let name = shard_file_name(first, last);

    std::fs::create_dir_all(tmp_dir)?;
    std::fs::create_dir_all(final_dir)?;
    let tmp_path = hidden_sibling(&tmp_dir.join(&name), "tmp");
    let final_path = final_dir.join(&name);

    if let Err(e) = write_parquet([&batch], &tmp_path, None) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    atomic_move(&tmp_path, &final_path)?;
    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn vectors(n: usize, dim: usize) -> Vec<EmbeddingVector> {
        (0..n)
            .map(|i| EmbeddingVector::new((0..dim).map(|j| (i * dim + j) as f32).collect()))
            .collect()
    }

    #[test]
    fn copy_into_place_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("tmp.parquet");
        let to = dir.path().join("part-1-2.parquet");
        std::fs::write(&from, b"shard").unwrap();

        copy_into_place(&from, &to).unwrap();
        assert_eq!(std::fs::read(&to).unwrap(), b"shard");
        assert!(!from.exists());
        assert!(!hidden_sibling(&to, "partial").exists());
    }

    #[test]
    fn failed_copy_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let to = dir.path().join("part-1-2.parquet");

        assert!(copy_into_place(&dir.path().join("missing.parquet"), &to).is_err());
        assert!(!hidden_sibling(&to, "partial").exists());
        assert!(!to.exists());
    }

    #[test]
    fn failed_rename_leaves_no_partial_and_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("tmp.parquet");
        std::fs::write(&from, b"shard").unwrap();
        // a non-empty directory cannot be replaced by a file
        let to = dir.path().join("occupied");
        std::fs::create_dir(&to).unwrap();
        std::fs::write(to.join("x"), b"").unwrap();

        assert!(copy_into_place(&from, &to).is_err());
        assert!(!hidden_sibling(&to, "partial").exists());
        assert!(from.exists());
    }

    #[test]
    fn schema_has_two_columns() {
        let schema = embeddings_schema(4);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["id", "embedding"]);
    }

    #[test]
    fn record_batch_basic() {
        let batch = embeddings_to_record_batch(&["a", "b", "c"], &vectors(3, 4)).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 2);

        let embeddings = batch
            .column(1)
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .unwrap();
        assert_eq!(embeddings.value_length(), 4);
        let second = embeddings.value(1);
        let second = second.as_any().downcast_ref::<Float32Array>().unwrap();
        assert_eq!(second.values().to_vec(), vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn record_batch_rejects_mixed_dimensions() {
        let mut vs = vectors(2, 4);
        vs.push(EmbeddingVector::new(vec![1.0]));
        let err = embeddings_to_record_batch(&["a", "b", "c"], &vs).unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
    }

    #[test]
    fn record_batch_rejects_length_mismatch() {
        let err = embeddings_to_record_batch(&["a"], &vectors(2, 2)).unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
    }

    #[test]
    fn record_batch_empty() {
        let err = embeddings_to_record_batch(&[], &[]).unwrap_err();
        assert!(matches!(err, StoreError::EmptyBatch));
    }

    #[test]
    fn shard_name_from_id_range() {
        assert_eq!(shard_file_name("100", "131"), "part-100-131.parquet");
        assert_eq!(shard_file_name("a/b", "c d"), "part-a_b-c_d.parquet");
    }

    #[test]
    fn write_shard_moves_into_final_dir() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("tmp");
        let out = dir.path().join("shards");
        let path = write_shard(&["1", "2"], &vectors(2, 3), &tmp, &out).unwrap();

        assert_eq!(path, out.join("part-1-2.parquet"));
        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);
    }

    #[test]
    fn write_shard_same_tmp_and_final_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_shard(&["x"], &vectors(1, 2), dir.path(), dir.path()).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["part-x-x.parquet".to_string()]);
        assert!(path.exists());
    }

    #[test]
    fn failed_shard_leaves_no_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("shards");
        let err = write_shard(&["1"], &[EmbeddingVector::new(vec![])], dir.path(), &out);
        assert!(err.is_err());
        assert!(!out.join("part-1-1.parquet").exists());
    }

    #[test]
    fn write_parquet_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.parquet");
        let err = write_parquet(std::iter::empty::<&RecordBatch>(), &path, None).unwrap_err();
        assert!(matches!(err, StoreError::EmptyBatch));
        assert!(!path.exists());
    }

    #[test]
    fn atomic_move_same_device() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a");
        let to = dir.path().join("b");
        std::fs::write(&from, b"data").unwrap();
        atomic_move(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn string_ids_roundtrip_into_column() {
        let batch = embeddings_to_record_batch(&["α", "β"], &vectors(2, 1)).unwrap();
        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(1), "β");
        assert_eq!(ids.null_count(), 0);
    }
}
