use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use embedline_core::document::Batch;
use embedline_core::error::{EmbedlineError, Result};
use embedline_core::vector::EmbeddingVector;
use embedline_store::store::DocumentStore;
use embedline_store::writer::write_shard;

/// Destination for a batch's embeddings after a successful request.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn persist(&self, batch: &Batch, vectors: Vec<EmbeddingVector>) -> Result<()>;
}

/// Drops embeddings. Used for benchmarks and trials.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

#[async_trait]
impl BatchSink for DiscardSink {
    async fn persist(&self, _batch: &Batch, _vectors: Vec<EmbeddingVector>) -> Result<()> {
        Ok(())
    }
}

/// Writes each batch as one Parquet shard and optionally flags its
/// documents as embedded in a backing store.
pub struct ParquetSink {
    tmp_dir: PathBuf,
    final_dir: PathBuf,
    store: Option<Arc<dyn DocumentStore>>,
}

impl ParquetSink {
    pub fn new(tmp_dir: impl Into<PathBuf>, final_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            final_dir: final_dir.into(),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    async fn mark(&self, store: &dyn DocumentStore, ids: &[String]) {
        match store.mark_embedded(ids).await {
            Ok(outcome) if outcome.failed > 0 || outcome.unmatched > 0 => {
                tracing::warn!(
                    updated = outcome.updated,
                    unmatched = outcome.unmatched,
                    failed = outcome.failed,
                    "some documents were not marked embedded"
                );
            }
            Ok(outcome) => tracing::debug!(updated = outcome.updated, "marked documents embedded"),
            Err(e) => tracing::error!(error = %e, "failed to mark documents embedded"),
        }
    }
}

#[async_trait]
impl BatchSink for ParquetSink {
    async fn persist(&self, batch: &Batch, vectors: Vec<EmbeddingVector>) -> Result<()> {
        let ids: Vec<String> = batch.documents.iter().map(|d| d.id.clone()).collect();
        let tmp_dir = self.tmp_dir.clone();
        let final_dir = self.final_dir.clone();
        let write_ids = ids.clone();

        let path = tokio::task::spawn_blocking(move || {
            let id_refs: Vec<&str> = write_ids.iter().map(String::as_str).collect();
            write_shard(&id_refs, &vectors, &tmp_dir, &final_dir)
        })
        .await
        .map_err(|e| EmbedlineError::Persist(format!("writer task failed: {e}")))??;
        tracing::debug!(path = %path.display(), rows = ids.len(), "wrote shard");

        // only after the shard is in place
        if let Some(store) = &self.store {
            self.mark(store.as_ref(), &ids).await;
        }
        Ok(())
    }
}
