use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use embedline_client::http::{HttpClientConfig, HttpEmbeddingClient};
use embedline_pipeline::config::PipelineConfig;
use embedline_pipeline::pipeline::Pipeline;
use embedline_pipeline::source::{LengthProfile, SyntheticSource};

use super::{log_summary, parse_positive, parse_secs};

/// Samples used for the rolling percentiles in progress lines.
const ROLLING_WINDOW: usize = 2000;

#[derive(Debug, Args)]
pub struct BenchArgs {
    /// Embedding endpoint
    #[arg(long, env = "TEI_URL", default_value = "http://localhost:8080/embed")]
    pub url: String,

    /// Synthetic documents to send
    #[arg(long, env = "NUM_DOCS", default_value = "200000")]
    pub num_docs: usize,

    /// Mean document length in tokens
    #[arg(long, env = "AVG_TOK", default_value = "64")]
    pub avg_tok: u32,

    /// Half-width of the uniform length jitter in tokens
    #[arg(long, env = "STD_TOK", default_value = "16")]
    pub std_tok: u32,

    #[arg(long, env = "BATCH", default_value = "256", value_parser = parse_positive)]
    pub batch: usize,

    #[arg(long, env = "CONC", default_value = "8", value_parser = parse_positive)]
    pub conc: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "TIMEOUT", default_value = "60", value_parser = parse_secs)]
    pub timeout: Duration,

    /// Seconds between progress lines
    #[arg(long, env = "REPORT_EVERY", default_value = "2", value_parser = parse_secs)]
    pub report_every: Duration,

    /// L2-normalize vectors client-side
    #[arg(long, env = "NORMALISE_LOCAL")]
    pub normalize: bool,

    /// Keep only the first N dimensions, then re-normalize
    #[arg(long, env = "OUTPUT_DIM")]
    pub output_dim: Option<usize>,

    #[arg(long, default_value = "42")]
    pub seed: u64,
}

impl BenchArgs {
    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig::default()
            .with_endpoints([self.url.clone()])
            .with_timeout(self.timeout)
            .with_normalize(self.normalize)
            .with_output_dim(self.output_dim)
            .with_pool_max_idle_per_host(self.conc * 4)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_batch_size(self.batch)
            .with_concurrency(self.conc)
            .with_report_interval(self.report_every)
            .with_rolling_window(ROLLING_WINDOW)
    }

    pub fn source(&self) -> SyntheticSource {
        let profile = LengthProfile {
            avg_tokens: self.avg_tok,
            std_tokens: self.std_tok,
        };
        SyntheticSource::new(self.num_docs, profile)
            .with_seed(self.seed)
            .with_chunk_docs(self.batch * 256)
    }
}

pub async fn run(args: BenchArgs) -> Result<()> {
    tracing::info!(
        url = %args.url,
        docs = args.num_docs,
        batch = args.batch,
        conc = args.conc,
        "starting benchmark"
    );
    let client = Arc::new(HttpEmbeddingClient::new(args.client_config())?);
    let pipeline = Pipeline::new(args.pipeline_config(), client);
    let summary = pipeline.run(&mut args.source()).await?;
    log_summary(&summary);
    Ok(())
}
