use std::sync::Arc;

use tokio::time::Instant;

use embedline_client::client::EmbeddingClient;
use embedline_client::tokens::TokenEstimator;
use embedline_core::document::{Batch, Sample};
use embedline_core::error::ClientError;

use crate::metrics::MetricsCollector;
use crate::queue::{DispatchQueue, WorkItem};
use crate::sink::BatchSink;

/// What a worker did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub batches: usize,
    pub failed: usize,
    pub persist_failures: usize,
    /// Batches with nothing left after cleaning.
    pub empty: usize,
}

/// Everything a worker shares with its siblings.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: DispatchQueue,
    pub client: Arc<dyn EmbeddingClient>,
    pub sink: Arc<dyn BatchSink>,
    pub estimator: Arc<dyn TokenEstimator>,
    pub metrics: Arc<MetricsCollector>,
}

enum Outcome {
    Embedded,
    Failed,
    PersistFailed,
    Empty,
}

/// Pull batches until a terminal marker arrives.
pub async fn run_worker(id: usize, ctx: WorkerContext) -> WorkerStats {
    let mut stats = WorkerStats::default();
    loop {
        let job = match ctx.queue.recv().await {
            WorkItem::Job(job) => job,
            WorkItem::Stop => break,
        };
        // `job` is dropped at the end of this iteration, which marks it done
        match process(id, &ctx, &job.batch).await {
            Outcome::Embedded => stats.batches += 1,
            Outcome::Failed => stats.failed += 1,
            Outcome::PersistFailed => {
                stats.batches += 1;
                stats.persist_failures += 1;
            }
            Outcome::Empty => stats.empty += 1,
        }
    }
    tracing::debug!(worker = id, ?stats, "worker stopped");
    stats
}

async fn process(id: usize, ctx: &WorkerContext, batch: &Batch) -> Outcome {
    let batch = batch.clone().cleaned();
    if batch.is_empty() {
        return Outcome::Empty;
    }
    let texts = batch.texts();
    let tokens = ctx.estimator.estimate_batch(&texts);

    let started = Instant::now();
    let result = ctx.client.embed(&texts).await.and_then(|vectors| {
        if vectors.len() == batch.len() {
            Ok(vectors)
        } else {
            Err(ClientError::LengthMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            }
            .into())
        }
    });
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    let vectors = match result {
        Ok(vectors) => {
            ctx.metrics.record(Sample::ok(latency_ms, batch.len(), tokens));
            vectors
        }
        Err(e) => {
            ctx.metrics.record(Sample::failed(latency_ms, batch.len(), tokens));
            tracing::error!(
                worker = id,
                first_id = %batch.documents[0].id,
                docs = batch.len(),
                error = %e,
                "skipping batch"
            );
            return Outcome::Failed;
        }
    };

    match ctx.sink.persist(&batch, vectors).await {
        Ok(()) => Outcome::Embedded,
        Err(e) => {
            tracing::error!(
                worker = id,
                first_id = %batch.documents[0].id,
                error = %e,
                "failed to persist batch"
            );
            Outcome::PersistFailed
        }
    }
}
