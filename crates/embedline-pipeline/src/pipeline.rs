use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use embedline_client::client::EmbeddingClient;
use embedline_client::tokens::{TokenEstimator, WordEstimator};
use embedline_core::error::Result;

use crate::batcher::Batcher;
use crate::config::PipelineConfig;
use crate::metrics::{LatencySummary, MetricsCollector, Totals};
use crate::queue::DispatchQueue;
use crate::reporter::Reporter;
use crate::sink::{BatchSink, DiscardSink};
use crate::source::DocumentSource;
use crate::worker::{WorkerContext, run_worker};

/// What the producer handed to the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProduceStats {
    pub chunks: u64,
    pub batches: usize,
    pub documents: usize,
    /// The deadline passed before the source was exhausted.
    pub stopped_at_deadline: bool,
}

/// Aggregate outcome of one pipeline pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub produced: ProduceStats,
    pub totals: Totals,
    /// Percentiles after warm-up trimming.
    pub latency: LatencySummary,
    pub persist_failures: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn docs_per_sec(&self) -> f64 {
        self.totals.docs as f64 / self.duration.as_secs_f64().max(1e-6)
    }

    pub fn tokens_per_sec(&self) -> f64 {
        self.totals.tokens as f64 / self.duration.as_secs_f64().max(1e-6)
    }
}

enum Halt {
    Deadline,
    Closed,
}

/// One producer, a fixed pool of workers and a reporter around a bounded
/// [`DispatchQueue`].
pub struct Pipeline {
    config: PipelineConfig,
    client: Arc<dyn EmbeddingClient>,
    sink: Arc<dyn BatchSink>,
    estimator: Arc<dyn TokenEstimator>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, client: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            config,
            client,
            sink: Arc::new(DiscardSink),
            estimator: Arc::new(WordEstimator::default()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn BatchSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `source` to completion (or to the deadline) and drain every
    /// queued batch before returning. Each call collects its own samples.
    ///
    /// Request and persistence failures are counted, never returned. An
    /// error reading the source stops production; the work already queued
    /// is drained and the error is returned afterwards.
    pub async fn run(&self, source: &mut dyn DocumentSource) -> Result<RunSummary> {
        let workers = self.config.workers();
        let metrics = Arc::new(MetricsCollector::new());
        let queue = DispatchQueue::bounded(self.config.queue_capacity());
        let ctx = WorkerContext {
            queue: queue.clone(),
            client: Arc::clone(&self.client),
            sink: Arc::clone(&self.sink),
            estimator: Arc::clone(&self.estimator),
            metrics: Arc::clone(&metrics),
        };
        let handles: Vec<_> = (0..workers)
            .map(|id| tokio::spawn(run_worker(id, ctx.clone())))
            .collect();
        drop(ctx);

        let cancel = CancellationToken::new();
        let reporter = Reporter::new(Arc::clone(&metrics), self.config.report_interval)
            .with_rolling_window(self.config.rolling_window)
            .with_label(self.config.label.clone().unwrap_or_default())
            .spawn(cancel.clone());

        tracing::info!(
            batch_size = self.config.effective_batch_size(),
            workers,
            deadline_s = ?self.config.deadline.map(|d| d.as_secs_f64()),
            "pipeline started"
        );
        let start = Instant::now();
        let deadline = self.config.deadline.map(|d| start + d);

        let mut produced = ProduceStats::default();
        let produce_result = self.produce(source, &queue, deadline, &mut produced).await;

        // every batch must be processed before any terminal marker goes in
        queue.wait_drained().await;
        queue.stop(workers).await;

        let mut persist_failures = 0;
        for handle in handles {
            match handle.await {
                Ok(stats) => persist_failures += stats.persist_failures,
                Err(e) => tracing::error!(error = %e, "worker task failed"),
            }
        }
        let duration = start.elapsed();
        cancel.cancel();
        let _ = reporter.await;

        produce_result?;

        let trial = self.config.deadline.unwrap_or(duration);
        let summary = RunSummary {
            produced,
            totals: metrics.totals(),
            latency: metrics.trimmed_summary(self.config.warmup, trial),
            persist_failures,
            duration,
        };
        tracing::info!(
            docs = summary.totals.docs,
            tokens = summary.totals.tokens,
            errors = summary.totals.errors,
            duration_s = %format!("{:.2}", duration.as_secs_f64()),
            "pipeline finished"
        );
        Ok(summary)
    }

    async fn produce(
        &self,
        source: &mut dyn DocumentSource,
        queue: &DispatchQueue,
        deadline: Option<Instant>,
        stats: &mut ProduceStats,
    ) -> Result<()> {
        let past_deadline = || deadline.is_some_and(|d| Instant::now() >= d);
        let mut batcher = Batcher::new(self.config.effective_batch_size());

        while let Some(chunk) = source.next_chunk().await? {
            let index = chunk.index;
            let mut pending = chunk.documents.into_iter();
            let batches = std::iter::from_fn(|| {
                for doc in pending.by_ref() {
                    if let Some(batch) = batcher.push(doc) {
                        return Some(batch);
                    }
                }
                batcher.flush()
            });

            let mut halt = None;
            for batch in batches {
                if past_deadline() {
                    halt = Some(Halt::Deadline);
                    break;
                }
                let docs = batch.len();
                if !queue.send(batch).await {
                    halt = Some(Halt::Closed);
                    break;
                }
                stats.batches += 1;
                stats.documents += docs;
            }

            match halt {
                Some(Halt::Deadline) => {
                    stats.stopped_at_deadline = true;
                    tracing::info!(chunk = index, "deadline reached, no longer admitting batches");
                    break;
                }
                Some(Halt::Closed) => {
                    tracing::warn!(chunk = index, "dispatch queue closed, no longer admitting batches");
                    break;
                }
                None => {}
            }
            stats.chunks += 1;
            source.chunk_enqueued(index).await?;
        }
        Ok(())
    }
}
