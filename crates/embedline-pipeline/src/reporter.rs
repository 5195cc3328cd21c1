use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::metrics::{LatencySummary, MetricsCollector, Totals};

/// Rates computed for one reporter tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub docs_per_sec: f64,
    pub tokens_per_sec: f64,
    pub avg_docs_per_sec: f64,
    pub totals: Totals,
}

impl Progress {
    /// Instantaneous rates from the counter delta over `interval`, and the
    /// average rate over `elapsed`.
    pub fn between(prev: Totals, now: Totals, interval: Duration, elapsed: Duration) -> Self {
        let interval = interval.as_secs_f64().max(1e-6);
        let elapsed = elapsed.as_secs_f64().max(1e-6);
        Self {
            docs_per_sec: now.docs.saturating_sub(prev.docs) as f64 / interval,
            tokens_per_sec: now.tokens.saturating_sub(prev.tokens) as f64 / interval,
            avg_docs_per_sec: now.docs as f64 / elapsed,
            totals: now,
        }
    }
}

/// Periodically logs throughput read from a [`MetricsCollector`].
pub struct Reporter {
    metrics: Arc<MetricsCollector>,
    interval: Duration,
    rolling_window: Option<usize>,
    label: String,
}

impl Reporter {
    pub fn new(metrics: Arc<MetricsCollector>, interval: Duration) -> Self {
        Self {
            metrics,
            interval,
            rolling_window: None,
            label: String::new(),
        }
    }

    pub fn with_rolling_window(mut self, window: Option<usize>) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Run on a background task until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        let period = self.interval.max(Duration::from_millis(10));
        let start = Instant::now();
        let mut ticker = tokio::time::interval_at(start + period, period);
        let mut last = Totals::default();
        let mut last_at = start;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                now = ticker.tick() => {
                    let totals = self.metrics.totals();
                    let progress = Progress::between(last, totals, now - last_at, now - start);
                    let latency = match self.rolling_window {
                        Some(window) => self.metrics.rolling_summary(window),
                        None => self.metrics.latency_summary(),
                    };
                    self.log(now - start, &progress, &latency);
                    last = totals;
                    last_at = now;
                }
            }
        }
    }

    fn log(&self, elapsed: Duration, progress: &Progress, latency: &LatencySummary) {
        tracing::info!(
            run = %self.label,
            elapsed_s = %format!("{:.1}", elapsed.as_secs_f64()),
            docs_per_s = %format!("{:.0}", progress.docs_per_sec),
            tok_per_s = %format!("{:.0}", progress.tokens_per_sec),
            avg_docs_per_s = %format!("{:.2}", progress.avg_docs_per_sec),
            p50_ms = %format!("{:.1}", latency.p50_ms),
            p95_ms = %format!("{:.1}", latency.p95_ms),
            total_docs = progress.totals.docs,
            errors = progress.totals.errors,
            "progress"
        );
    }
}
