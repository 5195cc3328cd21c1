use serde::{Deserialize, Serialize};

/// Added to the norm so that all-zero vectors stay finite after normalization.
pub const NORM_EPSILON: f32 = 1e-12;

/// A single embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(pub Vec<f32>);

impl EmbeddingVector {
    pub fn new(data: Vec<f32>) -> Self {
        Self(data)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Rescales to unit length in place.
    pub fn normalize(&mut self) {
        let norm = self.norm() + NORM_EPSILON;
        for x in &mut self.0 {
            *x /= norm;
        }
    }

    /// Keeps the leading `dim` components and rescales them to unit length.
    /// Vectors already shorter than `dim` are only renormalized.
    pub fn truncate_normalize(&mut self, dim: usize) {
        self.0.truncate(dim);
        self.normalize();
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(data: Vec<f32>) -> Self {
        Self(data)
    }
}
