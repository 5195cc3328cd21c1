use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use embedline_core::document::Sample;

/// Cumulative counters over every recorded sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub batches: usize,
    pub docs: usize,
    pub tokens: usize,
    pub errors: usize,
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencySummary {
    /// Percentiles over `latencies` (any order). All zero when empty.
    pub fn from_latencies(latencies: &[f64]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }
        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            samples: sorted.len(),
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
        }
    }
}

/// Linear-interpolated percentile of an ascending slice, `q` in `[0, 100]`.
///
/// Uses the `(n - 1) * q` rank convention, so the 50th percentile equals the
/// median for both odd and even lengths.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (n - 1) as f64 * q.clamp(0.0, 100.0) / 100.0;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Number of leading samples to drop as warm-up.
///
/// Approximates the warm-up window by its share of the trial duration
/// rather than by sample timestamps, capped at a quarter of the samples.
/// Nothing is trimmed from five samples or fewer.
pub fn warmup_trim(len: usize, warmup: Duration, trial: Duration) -> usize {
    if len <= 5 || warmup.is_zero() {
        return 0;
    }
    let ratio = warmup.as_secs_f64() / trial.as_secs_f64().max(1.0);
    let trim = (len as f64 * ratio).floor() as usize;
    trim.min(len / 4)
}

/// Thread-safe, append-only collection of per-batch samples.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    samples: Mutex<Vec<Sample>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn samples(&self) -> MutexGuard<'_, Vec<Sample>> {
        // appends cannot leave the vector half-updated
        self.samples.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, sample: Sample) {
        self.samples().push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn totals(&self) -> Totals {
        self.samples().iter().fold(Totals::default(), |mut t, s| {
            t.batches += 1;
            t.docs += s.doc_count;
            t.tokens += s.token_count;
            t.errors += usize::from(s.error);
            t
        })
    }

    /// Latencies in the order they were recorded.
    pub fn latencies(&self) -> Vec<f64> {
        self.samples().iter().map(|s| s.latency_ms).collect()
    }

    /// Percentiles over all samples.
    pub fn latency_summary(&self) -> LatencySummary {
        LatencySummary::from_latencies(&self.latencies())
    }

    /// Percentiles after dropping the warm-up share of the earliest samples.
    pub fn trimmed_summary(&self, warmup: Duration, trial: Duration) -> LatencySummary {
        let latencies = self.latencies();
        let trim = warmup_trim(latencies.len(), warmup, trial);
        LatencySummary::from_latencies(&latencies[trim..])
    }

    /// Percentiles over the most recent `window` samples.
    pub fn rolling_summary(&self, window: usize) -> LatencySummary {
        let latencies = self.latencies();
        let start = latencies.len().saturating_sub(window);
        LatencySummary::from_latencies(&latencies[start..])
    }
}
