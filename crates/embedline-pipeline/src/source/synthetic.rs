use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use embedline_core::document::Document;
use embedline_core::error::Result;

use super::{Chunk, DocumentSource};

/// Approximate token-length distribution of generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthProfile {
    pub avg_tokens: u32,
    /// Half-width of the uniform jitter around `avg_tokens`.
    pub std_tokens: u32,
}

impl Default for LengthProfile {
    fn default() -> Self {
        Self {
            avg_tokens: 64,
            std_tokens: 16,
        }
    }
}

const TOKENS_PER_WORD: f64 = 0.75;
const MIN_WORDS: i64 = 4;

/// Deterministic generator of `tokN tokN ...` documents.
pub struct SyntheticSource {
    rng: StdRng,
    profile: LengthProfile,
    total: usize,
    produced: usize,
    chunk_docs: usize,
    next_index: u64,
}

impl SyntheticSource {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(total: usize, profile: LengthProfile) -> Self {
        Self {
            rng: StdRng::seed_from_u64(Self::DEFAULT_SEED),
            profile,
            total,
            produced: 0,
            chunk_docs: 10_000,
            next_index: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Documents per chunk. Keep it a multiple of the batch size so only the
    /// final batch comes out short.
    pub fn with_chunk_docs(mut self, n: usize) -> Self {
        self.chunk_docs = n.max(1);
        self
    }

    /// Word count for one document: `(avg + jitter) / 0.75`, at least four.
    fn word_count(&mut self) -> usize {
        let std = i64::from(self.profile.std_tokens);
        let jitter = self.rng.gen_range(-std..=std);
        let tokens = i64::from(self.profile.avg_tokens) + jitter;
        // truncates toward zero
        let words = (tokens as f64 / TOKENS_PER_WORD) as i64;
        words.max(MIN_WORDS) as usize
    }

    fn next_document(&mut self) -> Document {
        let words = self.word_count();
        let text = (0..words)
            .map(|_| format!("tok{}", self.rng.gen_range(1..=9999)))
            .collect::<Vec<_>>()
            .join(" ");
        let id = format!("{:010}", self.produced);
        self.produced += 1;
        Document::new(id, text)
    }
}

#[async_trait]
impl DocumentSource for SyntheticSource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let remaining = self.total - self.produced;
        if remaining == 0 {
            return Ok(None);
        }
        let n = remaining.min(self.chunk_docs);
        let documents = (0..n).map(|_| self.next_document()).collect();
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Chunk { index, documents }))
    }
}
