use std::time::Duration;

/// Tunables for one pass of the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Documents per request.
    pub batch_size: usize,
    /// Number of workers, i.e. maximum requests in flight.
    pub concurrency: usize,
    /// Stop admitting new batches once this much time has passed.
    /// Queued and in-flight batches are still drained.
    pub deadline: Option<Duration>,
    /// Leading window whose latency samples are discarded before
    /// computing percentiles.
    pub warmup: Duration,
    /// How often the reporter logs a progress line.
    pub report_interval: Duration,
    /// Number of most recent samples used for the rolling percentiles in
    /// progress lines. `None` reports percentiles over all samples.
    pub rolling_window: Option<usize>,
    /// Prefix for progress lines, e.g. `B=32 C=16`.
    pub label: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            concurrency: 8,
            deadline: None,
            warmup: Duration::ZERO,
            report_interval: Duration::from_secs(5),
            rolling_window: None,
            label: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_rolling_window(mut self, samples: usize) -> Self {
        self.rolling_window = Some(samples);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Queue capacity: two pending batches per worker.
    pub fn queue_capacity(&self) -> usize {
        self.workers() * 2
    }

    pub(crate) fn workers(&self) -> usize {
        self.concurrency.max(1)
    }

    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.concurrency, 8);
        assert!(config.deadline.is_none());
        assert_eq!(config.queue_capacity(), 16);
    }

    #[test]
    fn builder_chain() {
        let config = PipelineConfig::default()
            .with_batch_size(16)
            .with_concurrency(4)
            .with_deadline(Duration::from_secs(20))
            .with_warmup(Duration::from_secs(3))
            .with_label("B=16 C=4");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.queue_capacity(), 8);
        assert_eq!(config.deadline, Some(Duration::from_secs(20)));
        assert_eq!(config.label.as_deref(), Some("B=16 C=4"));
    }

    #[test]
    fn zero_concurrency_still_runs_one_worker() {
        let config = PipelineConfig::default().with_concurrency(0).with_batch_size(0);
        assert_eq!(config.workers(), 1);
        assert_eq!(config.queue_capacity(), 2);
        assert_eq!(config.effective_batch_size(), 1);
    }
}
