use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;

use embedline_client::http::{HttpClientConfig, HttpEmbeddingClient};
use embedline_pipeline::source::LengthProfile;
use embedline_tune::config::TuneConfig;
use embedline_tune::orchestrator::Orchestrator;
use embedline_tune::report::write_results_file;
use embedline_tune::trial::PipelineTrialRunner;

use super::{parse_positive, parse_secs};

#[derive(Debug, Args)]
pub struct AutotuneArgs {
    /// Endpoint to tune against. Without it, the Workers AI endpoint for
    /// `--account-id` and `--model-id` is used.
    #[arg(long, env = "AUTOTUNE_URL")]
    pub url: Option<String>,

    #[arg(long, env = "ACCOUNT_ID")]
    pub account_id: Option<String>,

    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(long, env = "MODEL_ID", default_value = "google/embeddinggemma-300m")]
    pub model_id: String,

    #[arg(
        long,
        env = "BATCH_GRID",
        value_delimiter = ',',
        default_values_t = [8, 16, 32],
        value_parser = parse_positive
    )]
    pub batch_grid: Vec<usize>,

    #[arg(
        long,
        env = "CONC_GRID",
        value_delimiter = ',',
        default_values_t = [16, 32, 64],
        value_parser = parse_positive
    )]
    pub conc_grid: Vec<usize>,

    /// Synthetic documents per trial
    #[arg(long, env = "TRIAL_DOCS", default_value = "20000")]
    pub trial_docs: usize,

    /// Wall-clock limit per trial in seconds
    #[arg(long, env = "TRIAL_SECS", default_value = "20", value_parser = parse_secs)]
    pub trial_secs: Duration,

    /// Leading seconds excluded from latency percentiles
    #[arg(long, env = "WARMUP_SECS", default_value = "3", value_parser = parse_secs)]
    pub warmup_secs: Duration,

    /// Maximum acceptable p95 latency in seconds
    #[arg(long, env = "P95_TARGET", default_value = "10", value_parser = parse_secs)]
    pub p95_target: Duration,

    #[arg(long, env = "REPORT_EVERY", default_value = "2", value_parser = parse_secs)]
    pub report_every: Duration,

    #[arg(long, env = "AVG_TOK", default_value = "64")]
    pub avg_tok: u32,

    #[arg(long, env = "STD_TOK", default_value = "48")]
    pub std_tok: u32,

    /// Where the per-trial results table is written
    #[arg(long, env = "CSV_PATH", default_value = "autotune_cloudflare_results.csv")]
    pub csv_path: PathBuf,

    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Workers AI embedding route for an account and model.
pub fn cloudflare_url(account_id: &str, model_id: &str) -> String {
    format!("https://api.cloudflare.com/client/v4/accounts/{account_id}/ai/run/@cf/{model_id}")
}

impl AutotuneArgs {
    /// Resolve the endpoint, failing when neither a URL nor Workers AI
    /// credentials were given.
    pub fn client_config(&self) -> Result<HttpClientConfig> {
        let config = match (&self.url, &self.account_id, &self.api_token) {
            (Some(url), _, _) => HttpClientConfig::default().with_endpoints([url.clone()]),
            (None, Some(account), Some(_)) => HttpClientConfig::default()
                .with_endpoints([cloudflare_url(account, &self.model_id)])
                .with_input_key("text"),
            _ => bail!("ACCOUNT_ID and API_TOKEN must be set (or pass --url)"),
        };
        Ok(match &self.api_token {
            Some(token) => config.with_api_token(token.clone()),
            None => config,
        })
    }

    pub fn tune_config(&self) -> TuneConfig {
        TuneConfig::default()
            .with_batch_grid(self.batch_grid.clone())
            .with_concurrency_grid(self.conc_grid.clone())
            .with_trial_docs(self.trial_docs)
            .with_trial_duration(self.trial_secs)
            .with_warmup(self.warmup_secs)
            .with_p95_target(self.p95_target)
            .with_report_interval(self.report_every)
            .with_profile(LengthProfile {
                avg_tokens: self.avg_tok,
                std_tokens: self.std_tok,
            })
            .with_seed(self.seed)
    }
}

pub async fn run(args: AutotuneArgs) -> Result<()> {
    let client = args.client_config()?;
    // trials build their own clients, so reject a bad endpoint or token up front
    HttpEmbeddingClient::new(client.clone())?;
    let config = args.tune_config();
    tracing::info!(
        endpoint = %client.endpoints[0],
        trials = config.grid().len(),
        "starting autotune"
    );

    let runner = PipelineTrialRunner::http(config.clone(), client);
    let report = Orchestrator::new(runner, config).run().await;

    if write_results_file(&args.csv_path, &report.results)? {
        tracing::info!(path = %args.csv_path.display(), rows = report.results.len(), "saved results");
    }
    if !report.failed.is_empty() {
        tracing::warn!(failed = ?report.failed, "some trials did not run");
    }
    Ok(())
}
