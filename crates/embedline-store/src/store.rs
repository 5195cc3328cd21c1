use async_trait::async_trait;

use embedline_core::document::Document;

use crate::error::Result;

/// Result of flagging a set of documents as embedded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkOutcome {
    /// Rows whose flag was set.
    pub updated: usize,
    /// Ids with no matching row.
    pub unmatched: usize,
    /// Ids whose update raised an error.
    pub failed: usize,
}

/// A backing store of documents with an "embedded" flag.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Up to `limit` not-yet-embedded documents with id greater than
    /// `after`, in ascending id order.
    async fn fetch_pending(&self, after: Option<&str>, limit: usize) -> Result<Vec<Document>>;

    /// Flag `ids` as embedded. Each id is updated independently, so one
    /// failing id does not prevent the rest from being marked.
    async fn mark_embedded(&self, ids: &[String]) -> Result<MarkOutcome>;
}
