use std::time::Duration;

use crate::config::TuneConfig;
use crate::trial::{TrialResult, TrialRunner};

/// Results of a full grid search.
#[derive(Debug, Clone)]
pub struct TuneReport {
    pub results: Vec<TrialResult>,
    /// Grid cells whose trial could not run at all.
    pub failed: Vec<(usize, usize)>,
    pub best: Option<TrialResult>,
}

/// The error-free trial with the highest token throughput among those at or
/// under `p95_target`. `None` when no trial qualifies.
pub fn select_best(results: &[TrialResult], p95_target: Duration) -> Option<&TrialResult> {
    results
        .iter()
        .filter(|r| r.qualifies(p95_target))
        .fold(None, |best: Option<&TrialResult>, r| match best {
            Some(b) if b.tokens_per_sec >= r.tokens_per_sec => Some(b),
            _ => Some(r),
        })
}

/// Runs one trial per grid cell, in order, and picks the best.
pub struct Orchestrator<R> {
    runner: R,
    config: TuneConfig,
}

impl<R: TrialRunner> Orchestrator<R> {
    pub fn new(runner: R, config: TuneConfig) -> Self {
        Self { runner, config }
    }

    pub async fn run(&self) -> TuneReport {
        let mut results = Vec::new();
        let mut failed = Vec::new();

        for (batch_size, concurrency) in self.config.grid() {
            tracing::info!(batch_size, concurrency, "starting trial");
            match self.runner.run_trial(batch_size, concurrency).await {
                Ok(result) => {
                    tracing::info!(
                        batch_size,
                        concurrency,
                        docs_per_s = %format!("{:.0}", result.docs_per_sec),
                        tok_per_s = %format!("{:.0}", result.tokens_per_sec),
                        p50_s = %format!("{:.2}", result.p50_s),
                        p95_s = %format!("{:.2}", result.p95_s),
                        errors = result.errors,
                        duration_s = %format!("{:.2}", result.duration_s),
                        "trial finished"
                    );
                    results.push(result);
                }
                Err(e) => {
                    tracing::error!(batch_size, concurrency, error = %e, "trial failed");
                    failed.push((batch_size, concurrency));
                }
            }
        }

        let best = select_best(&results, self.config.p95_target).cloned();
        let target_s = self.config.p95_target.as_secs_f64();
        match &best {
            Some(b) => tracing::info!(
                batch_size = b.batch_size,
                concurrency = b.concurrency,
                tok_per_s = %format!("{:.0}", b.tokens_per_sec),
                p95_s = %format!("{:.2}", b.p95_s),
                p50_s = %format!("{:.2}", b.p50_s),
                "best configuration under p95 <= {target_s:.1}s"
            ),
            None => tracing::warn!(
                "no configuration met p95 <= {target_s:.1}s without errors; \
                 consider a smaller batch size or a larger server token budget"
            ),
        }

        TuneReport {
            results,
            failed,
            best,
        }
    }
}
