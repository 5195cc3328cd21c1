use std::sync::Arc;

use async_trait::async_trait;

use embedline_core::error::Result;
use embedline_core::vector::EmbeddingVector;

/// Trait for backends that turn a batch of texts into embedding vectors.
///
/// On success the result holds exactly one vector per input text, in input
/// order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts with a single request.
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>>;
}

#[async_trait]
impl<T: EmbeddingClient + ?Sized> EmbeddingClient for Arc<T> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        (**self).embed(texts).await
    }
}
