/// Estimates token counts for throughput accounting.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;

    fn estimate_batch(&self, texts: &[String]) -> usize {
        texts.iter().map(|t| self.estimate(t)).sum()
    }
}

/// Whitespace word count scaled by a fixed tokens-per-word ratio and capped
/// at the model's maximum sequence length.
///
/// The default ratio matches the one used to size synthetic documents, so a
/// synthetic document generated for `n` tokens is estimated at about `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordEstimator {
    pub tokens_per_word: f64,
    pub max_tokens: usize,
}

impl Default for WordEstimator {
    fn default() -> Self {
        Self {
            tokens_per_word: 0.75,
            max_tokens: 2048,
        }
    }
}

impl WordEstimator {
    pub fn new(tokens_per_word: f64, max_tokens: usize) -> Self {
        Self {
            tokens_per_word,
            max_tokens,
        }
    }
}

impl TokenEstimator for WordEstimator {
    fn estimate(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        if words == 0 {
            return 0;
        }
        let tokens = (words as f64 * self.tokens_per_word).ceil() as usize;
        tokens.clamp(1, self.max_tokens)
    }
}
