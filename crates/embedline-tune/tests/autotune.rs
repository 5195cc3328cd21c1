use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use embedline_client::client::EmbeddingClient;
use embedline_core::error::Result;
use embedline_core::vector::EmbeddingVector;
use embedline_tune::config::TuneConfig;
use embedline_tune::orchestrator::Orchestrator;
use embedline_tune::report::{read_results, write_results_file};
use embedline_tune::trial::{PipelineTrialRunner, TrialResult, TrialRunner};

/// Latency grows with batch size: `per_doc` for each document.
struct SizeBoundServer {
    per_doc: Duration,
}

#[async_trait]
impl EmbeddingClient for SizeBoundServer {
    async fn embed(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let extra = if texts.len() > 8 { 2 } else { 1 };
        tokio::time::sleep(self.per_doc * texts.len() as u32 * extra).await;
        Ok(vec![EmbeddingVector::new(vec![0.0, 1.0]); texts.len()])
    }
}

fn config() -> TuneConfig {
    TuneConfig::default()
        .with_batch_grid(vec![8, 32])
        .with_concurrency_grid(vec![2])
        .with_trial_docs(160)
        .with_trial_duration(Duration::from_secs(120))
        .with_warmup(Duration::ZERO)
        .with_p95_target(Duration::from_secs(2))
}

#[tokio::test(start_paused = true)]
async fn selects_fast_trial_under_target() {
    let runner = PipelineTrialRunner::new(config(), |_| {
        Ok(Arc::new(SizeBoundServer {
            per_doc: Duration::from_millis(125),
        }) as Arc<dyn EmbeddingClient>)
    });
    let report = Orchestrator::new(runner, config()).run().await;

    assert_eq!(report.results.len(), 2);
    let small = &report.results[0];
    let large = &report.results[1];
    // 8 docs take 1 s, 32 docs take 8 s
    assert!(small.p95_s <= 2.0, "small p95 {}", small.p95_s);
    assert!(large.p95_s > 2.0, "large p95 {}", large.p95_s);
    assert!(small.tokens_per_sec > large.tokens_per_sec);

    let best = report.best.expect("a configuration qualifies");
    assert_eq!(best.batch_size, 8);
    assert_eq!(best.concurrency, 2);
}

struct Fixed(Vec<TrialResult>);

#[async_trait]
impl TrialRunner for Fixed {
    async fn run_trial(&self, batch_size: usize, concurrency: usize) -> Result<TrialResult> {
        self.0
            .iter()
            .find(|r| r.batch_size == batch_size && r.concurrency == concurrency)
            .cloned()
            .ok_or_else(|| embedline_core::error::EmbedlineError::Other("no such trial".into()))
    }
}

fn trial(batch_size: usize, tokens_per_sec: f64, p95_s: f64, errors: usize) -> TrialResult {
    TrialResult {
        batch_size,
        concurrency: 2,
        docs: 100,
        tokens: 6400,
        docs_per_sec: tokens_per_sec / 64.0,
        tokens_per_sec,
        p50_s: p95_s / 2.0,
        p95_s,
        errors,
        duration_s: 10.0,
    }
}

#[tokio::test]
async fn reports_no_winner_explicitly() {
    let runner = Fixed(vec![trial(8, 5000.0, 3.0, 0), trial(32, 9000.0, 1.0, 4)]);
    let report = Orchestrator::new(runner, config()).run().await;
    assert_eq!(report.results.len(), 2);
    assert!(report.best.is_none());
}

#[tokio::test]
async fn failed_trial_is_recorded_and_skipped() {
    let runner = Fixed(vec![trial(8, 5000.0, 1.0, 0)]);
    let report = Orchestrator::new(runner, config()).run().await;
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failed, vec![(32, 2)]);
    assert_eq!(report.best.map(|b| b.batch_size), Some(8));
}

#[tokio::test]
async fn results_table_has_one_row_per_trial() {
    let runner = Fixed(vec![trial(8, 5000.0, 1.0, 0), trial(32, 6000.0, 1.5, 0)]);
    let report = Orchestrator::new(runner, config()).run().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autotune.csv");
    write_results_file(&path, &report.results).unwrap();
    let rows = read_results(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].batch_size, 32);
}
