pub mod autotune;
pub mod bench;
pub mod consolidate;
pub mod embed;
pub mod verify;

use std::time::Duration;

use embedline_pipeline::pipeline::RunSummary;

pub use autotune::AutotuneArgs;
pub use bench::BenchArgs;
pub use consolidate::ConsolidateArgs;
pub use embed::EmbedArgs;
pub use verify::VerifyArgs;

/// Parse a non-negative number of seconds, fractions allowed.
pub fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("`{s}` is not a valid duration"))
}

/// Parse a count that must be at least one.
pub fn parse_positive(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".into()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("`{s}` is not a positive integer")),
    }
}

pub(crate) fn log_summary(summary: &RunSummary) {
    tracing::info!(
        docs = summary.totals.docs,
        tokens = summary.totals.tokens,
        errors = summary.totals.errors,
        persist_failures = summary.persist_failures,
        docs_per_s = %format!("{:.0}", summary.docs_per_sec()),
        tok_per_s = %format!("{:.0}", summary.tokens_per_sec()),
        p50_s = %format!("{:.2}", summary.latency.p50_ms / 1000.0),
        p95_s = %format!("{:.2}", summary.latency.p95_ms / 1000.0),
        p99_s = %format!("{:.2}", summary.latency.p99_ms / 1000.0),
        duration_s = %format!("{:.1}", summary.duration.as_secs_f64()),
        "done"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds() {
        assert_eq!(parse_secs("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_secs("0.5").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_secs("0").unwrap(), Duration::ZERO);
        assert!(parse_secs("-1").is_err());
        assert!(parse_secs("soon").is_err());
    }

    #[test]
    fn positive_counts() {
        assert_eq!(parse_positive("16").unwrap(), 16);
        assert!(parse_positive("0").is_err());
        assert!(parse_positive("-3").is_err());
    }
}
