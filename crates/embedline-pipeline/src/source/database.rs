use std::sync::Arc;

use async_trait::async_trait;

use embedline_core::error::{Result, SourceError};
use embedline_store::store::DocumentStore;

use super::{Chunk, DocumentSource};

/// Pages through a [`DocumentStore`]'s not-yet-embedded documents.
///
/// Paging is keyed on the last id seen, so documents marked while the run
/// is in progress never shift later pages. The source ends after a page
/// shorter than `page_size`.
pub struct DatabaseSource {
    store: Arc<dyn DocumentStore>,
    page_size: usize,
    after: Option<String>,
    next_index: u64,
    exhausted: bool,
}

impl DatabaseSource {
    pub fn new(store: Arc<dyn DocumentStore>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            after: None,
            next_index: 0,
            exhausted: false,
        }
    }
}

#[async_trait]
impl DocumentSource for DatabaseSource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        if self.exhausted {
            return Ok(None);
        }
        let documents = self
            .store
            .fetch_pending(self.after.as_deref(), self.page_size)
            .await
            .map_err(|e| SourceError::Store(e.to_string()))?;

        if documents.len() < self.page_size {
            self.exhausted = true;
        }
        let Some(last) = documents.last() else {
            return Ok(None);
        };
        self.after = Some(last.id.clone());

        let index = self.next_index;
        self.next_index += 1;
        tracing::debug!(page = index, documents = documents.len(), "fetched page");
        Ok(Some(Chunk { index, documents }))
    }
}
