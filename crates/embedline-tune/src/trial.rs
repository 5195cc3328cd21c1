use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use embedline_client::client::EmbeddingClient;
use embedline_client::http::{HttpClientConfig, HttpEmbeddingClient};
use embedline_core::error::Result;
use embedline_pipeline::config::PipelineConfig;
use embedline_pipeline::pipeline::{Pipeline, RunSummary};
use embedline_pipeline::source::SyntheticSource;

use crate::config::TuneConfig;

/// Aggregated outcome of one (batch size, concurrency) trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub batch_size: usize,
    pub concurrency: usize,
    pub docs: usize,
    pub tokens: usize,
    pub docs_per_sec: f64,
    pub tokens_per_sec: f64,
    pub p50_s: f64,
    pub p95_s: f64,
    pub errors: usize,
    pub duration_s: f64,
}

impl TrialResult {
    pub fn from_summary(batch_size: usize, concurrency: usize, summary: &RunSummary) -> Self {
        Self {
            batch_size,
            concurrency,
            docs: summary.totals.docs,
            tokens: summary.totals.tokens,
            docs_per_sec: summary.docs_per_sec(),
            tokens_per_sec: summary.tokens_per_sec(),
            p50_s: summary.latency.p50_ms / 1000.0,
            p95_s: summary.latency.p95_ms / 1000.0,
            errors: summary.totals.errors,
            duration_s: summary.duration.as_secs_f64(),
        }
    }

    /// Error-free and within the latency target.
    pub fn qualifies(&self, p95_target: Duration) -> bool {
        self.errors == 0 && self.p95_s <= p95_target.as_secs_f64()
    }
}

/// Runs one trial for a grid cell.
#[async_trait]
pub trait TrialRunner: Send + Sync {
    async fn run_trial(&self, batch_size: usize, concurrency: usize) -> Result<TrialResult>;
}

type ClientFactory = dyn Fn(usize) -> Result<Arc<dyn EmbeddingClient>> + Send + Sync;

/// Drives one full pipeline pass over synthetic documents per trial.
///
/// A fresh client is built for every trial so connection pools are sized to
/// that trial's concurrency. Every trial starts from the same seed and so
/// sends the same documents.
pub struct PipelineTrialRunner {
    config: TuneConfig,
    client_factory: Box<ClientFactory>,
}

impl PipelineTrialRunner {
    pub fn new<F>(config: TuneConfig, client_factory: F) -> Self
    where
        F: Fn(usize) -> Result<Arc<dyn EmbeddingClient>> + Send + Sync + 'static,
    {
        Self {
            config,
            client_factory: Box::new(client_factory),
        }
    }

    /// Trials against an HTTP endpoint: no retries, a 60 s request timeout
    /// and `4 × concurrency` pooled connections per host.
    pub fn http(config: TuneConfig, client: HttpClientConfig) -> Self {
        Self::new(config, move |concurrency| {
            let client = client
                .clone()
                .with_timeout(Duration::from_secs(60))
                .with_pool_max_idle_per_host(concurrency * 4);
            Ok(Arc::new(HttpEmbeddingClient::new(client)?) as Arc<dyn EmbeddingClient>)
        })
    }
}

#[async_trait]
impl TrialRunner for PipelineTrialRunner {
    async fn run_trial(&self, batch_size: usize, concurrency: usize) -> Result<TrialResult> {
        let client = (self.client_factory)(concurrency)?;
        let pipeline_config = PipelineConfig::default()
            .with_batch_size(batch_size)
            .with_concurrency(concurrency)
            .with_deadline(self.config.trial_duration)
            .with_warmup(self.config.warmup)
            .with_report_interval(self.config.report_interval)
            .with_label(format!("B={batch_size} C={concurrency}"));
        let mut source = SyntheticSource::new(self.config.trial_docs, self.config.profile)
            .with_seed(self.config.seed)
            .with_chunk_docs(batch_size.max(1) * 256);

        let summary = Pipeline::new(pipeline_config, client)
            .run(&mut source)
            .await?;
        Ok(TrialResult::from_summary(batch_size, concurrency, &summary))
    }
}
