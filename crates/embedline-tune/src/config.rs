use std::time::Duration;

use embedline_pipeline::source::LengthProfile;

/// Grid and per-trial limits for an autotune run.
#[derive(Debug, Clone)]
pub struct TuneConfig {
    pub batch_grid: Vec<usize>,
    pub concurrency_grid: Vec<usize>,
    /// Synthetic documents generated per trial.
    pub trial_docs: usize,
    /// Wall-clock limit per trial.
    pub trial_duration: Duration,
    pub warmup: Duration,
    /// Maximum acceptable 95th-percentile latency.
    pub p95_target: Duration,
    pub report_interval: Duration,
    pub profile: LengthProfile,
    pub seed: u64,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            batch_grid: vec![8, 16, 32],
            concurrency_grid: vec![16, 32, 64],
            trial_docs: 20_000,
            trial_duration: Duration::from_secs(20),
            warmup: Duration::from_secs(3),
            p95_target: Duration::from_secs(10),
            report_interval: Duration::from_secs(2),
            profile: LengthProfile {
                avg_tokens: 64,
                std_tokens: 48,
            },
            seed: 42,
        }
    }
}

impl TuneConfig {
    pub fn with_batch_grid(mut self, grid: Vec<usize>) -> Self {
        self.batch_grid = grid;
        self
    }

    pub fn with_concurrency_grid(mut self, grid: Vec<usize>) -> Self {
        self.concurrency_grid = grid;
        self
    }

    pub fn with_trial_docs(mut self, n: usize) -> Self {
        self.trial_docs = n;
        self
    }

    pub fn with_trial_duration(mut self, d: Duration) -> Self {
        self.trial_duration = d;
        self
    }

    pub fn with_warmup(mut self, d: Duration) -> Self {
        self.warmup = d;
        self
    }

    pub fn with_p95_target(mut self, d: Duration) -> Self {
        self.p95_target = d;
        self
    }

    pub fn with_report_interval(mut self, d: Duration) -> Self {
        self.report_interval = d;
        self
    }

    pub fn with_profile(mut self, profile: LengthProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Every (batch size, concurrency) pair, batch size major.
    pub fn grid(&self) -> Vec<(usize, usize)> {
        self.batch_grid
            .iter()
            .flat_map(|&b| self.concurrency_grid.iter().map(move |&c| (b, c)))
            .collect()
    }
}
