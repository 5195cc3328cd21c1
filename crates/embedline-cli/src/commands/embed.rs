use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};

use embedline_client::client::EmbeddingClient;
use embedline_client::http::{HttpClientConfig, HttpEmbeddingClient};
use embedline_client::retry::{RetryPolicy, RetryingClient};
use embedline_pipeline::config::PipelineConfig;
use embedline_pipeline::pipeline::Pipeline;
use embedline_pipeline::sink::ParquetSink;
use embedline_pipeline::source::{DatabaseSource, DocumentSource, FileSource};
use embedline_store::progress::ProgressMarkers;
use embedline_store::sqlite::SqliteDocumentStore;

use super::{log_summary, parse_positive, parse_secs};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["input_file", "database"])))]
pub struct EmbedArgs {
    /// Line-delimited JSON input, one `{"_id", "text"}` object per line
    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// SQLite database with a `documents` table; embedded rows are flagged
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Comma-separated embedding endpoints, used round-robin
    #[arg(long, env = "TEI_URLS", value_delimiter = ',', required = true)]
    pub tei_urls: Vec<String>,

    /// Bearer token sent with every request
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Directory shards are written to before being moved into place
    #[arg(long, default_value = "/mnt/raid1/embeddings/tmp")]
    pub tmp_dir: PathBuf,

    /// Directory finished shards are moved into
    #[arg(long, default_value = "/mnt/sdb_mount_point/embeddings/shards")]
    pub final_dir: PathBuf,

    /// Directory for per-chunk progress markers (file input only)
    #[arg(long, default_value = "/mnt/raid1/embeddings/progress")]
    pub progress_dir: PathBuf,

    #[arg(long, default_value = "32", value_parser = parse_positive)]
    pub batch_size: usize,

    /// Concurrent requests in flight
    #[arg(long, default_value = "128", value_parser = parse_positive)]
    pub concurrency: usize,

    /// Attempts per batch before it is abandoned
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value = "5", value_parser = parse_secs)]
    pub retry_delay: Duration,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "120", value_parser = parse_secs)]
    pub timeout: Duration,

    /// Input lines per resumable chunk
    #[arg(long, default_value_t = FileSource::DEFAULT_CHUNK_LINES)]
    pub chunk_lines: u64,

    /// Documents fetched per database page
    #[arg(long, default_value = "10000", value_parser = parse_positive)]
    pub page_size: usize,

    /// Do not ask the server to truncate long inputs
    #[arg(long)]
    pub no_truncate: bool,

    /// L2-normalize vectors client-side
    #[arg(long)]
    pub normalize: bool,

    /// Keep only the first N dimensions, then re-normalize
    #[arg(long)]
    pub output_dim: Option<usize>,

    /// Seconds between progress lines
    #[arg(long, default_value = "5", value_parser = parse_secs)]
    pub report_every: Duration,
}

impl EmbedArgs {
    pub fn client_config(&self) -> HttpClientConfig {
        let mut config = HttpClientConfig::default()
            .with_endpoints(self.tei_urls.iter().map(|u| u.trim().to_string()))
            .with_truncate(!self.no_truncate)
            .with_timeout(self.timeout)
            .with_normalize(self.normalize)
            .with_output_dim(self.output_dim)
            .with_pool_max_idle_per_host(self.concurrency);
        if let Some(token) = &self.api_token {
            config = config.with_api_token(token.clone());
        }
        config
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_batch_size(self.batch_size)
            .with_concurrency(self.concurrency)
            .with_report_interval(self.report_every)
    }
}

pub async fn run(args: EmbedArgs) -> Result<()> {
    let http = HttpEmbeddingClient::new(args.client_config())?;
    let client: Arc<dyn EmbeddingClient> = Arc::new(RetryingClient::new(
        http,
        RetryPolicy::new(args.max_retries, args.retry_delay),
    ));

    for dir in [&args.tmp_dir, &args.final_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut sink = ParquetSink::new(&args.tmp_dir, &args.final_dir);

    let mut source: Box<dyn DocumentSource> = match (&args.input_file, &args.database) {
        (Some(input), _) => {
            let markers = ProgressMarkers::new(&args.progress_dir).await?;
            tracing::info!(input = %input.display(), "embedding file");
            Box::new(
                FileSource::open(input)
                    .await
                    .with_context(|| format!("opening {}", input.display()))?
                    .with_chunk_lines(args.chunk_lines)
                    .with_markers(markers),
            )
        }
        (None, Some(db)) => {
            let store = Arc::new(SqliteDocumentStore::new(db)?);
            tracing::info!(
                database = %db.display(),
                pending = store.count_pending().await?,
                "embedding pending documents"
            );
            sink = sink.with_store(store.clone());
            Box::new(DatabaseSource::new(store, args.page_size))
        }
        (None, None) => anyhow::bail!("either --input-file or --database is required"),
    };

    let pipeline = Pipeline::new(args.pipeline_config(), client).with_sink(Arc::new(sink));
    let summary = pipeline.run(source.as_mut()).await?;
    log_summary(&summary);
    Ok(())
}
