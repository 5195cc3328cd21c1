use serde::Deserialize;

use embedline_core::error::ClientError;
use embedline_core::vector::EmbeddingVector;

/// One per-text entry of a response body.
///
/// Some backends wrap each vector in a one-element list; both shapes are
/// accepted here and flattened by [`VectorShape::into_vector`].
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VectorShape {
    Vector(Vec<f32>),
    SingletonWrapped(Vec<Vec<f32>>),
}

impl VectorShape {
    pub fn into_vector(self) -> Result<EmbeddingVector, ClientError> {
        match self {
            Self::Vector(v) => Ok(EmbeddingVector::new(v)),
            Self::SingletonWrapped(mut wrapped) => {
                if wrapped.len() != 1 {
                    return Err(ClientError::InvalidResponse(format!(
                        "expected a vector or a single wrapped vector, got {} nested vectors",
                        wrapped.len()
                    )));
                }
                Ok(EmbeddingVector::new(wrapped.remove(0)))
            }
        }
    }
}

/// Response bodies understood by the HTTP client.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbedResponse {
    /// TEI `/embed`: a bare JSON array of vectors.
    Bare(Vec<VectorShape>),
    /// Cloudflare Workers AI: `{"result": {"data": [...]}}`.
    Envelope { result: EnvelopeResult },
    /// OpenAI-compatible: `{"data": [{"embedding": [...], "index": n}]}`.
    Indexed { data: Vec<IndexedVector> },
}

#[derive(Debug, Deserialize)]
pub struct EnvelopeResult {
    pub data: Vec<VectorShape>,
}

#[derive(Debug, Deserialize)]
pub struct IndexedVector {
    pub embedding: Vec<f32>,
    pub index: usize,
}

impl EmbedResponse {
    /// Flattens any supported shape into vectors in input order.
    pub fn into_vectors(self) -> Result<Vec<EmbeddingVector>, ClientError> {
        match self {
            Self::Bare(shapes) | Self::Envelope {
                result: EnvelopeResult { data: shapes },
            } => shapes.into_iter().map(VectorShape::into_vector).collect(),
            Self::Indexed { mut data } => {
                data.sort_by_key(|d| d.index);
                Ok(data
                    .into_iter()
                    .map(|d| EmbeddingVector::new(d.embedding))
                    .collect())
            }
        }
    }
}

/// Parses a raw response body.
pub fn parse_response(body: &[u8]) -> Result<Vec<EmbeddingVector>, ClientError> {
    let parsed: EmbedResponse = serde_json::from_slice(body)
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
    parsed.into_vectors()
}
