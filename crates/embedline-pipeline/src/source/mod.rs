mod database;
mod file;
mod synthetic;

pub use database::DatabaseSource;
pub use file::FileSource;
pub use synthetic::{LengthProfile, SyntheticSource};

use async_trait::async_trait;

use embedline_core::document::Document;
use embedline_core::error::Result;

/// A contiguous group of documents read from a source.
///
/// Batches never span two chunks, so a chunk is the unit of resumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: u64,
    pub documents: Vec<Document>,
}

/// An ordered, finite stream of documents, read chunk by chunk.
#[async_trait]
pub trait DocumentSource: Send {
    /// The next chunk, or `None` once the source is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Chunk>>;

    /// Called once every batch of chunk `index` has been enqueued.
    async fn chunk_enqueued(&mut self, _index: u64) -> Result<()> {
        Ok(())
    }
}
