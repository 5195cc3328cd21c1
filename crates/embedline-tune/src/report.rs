use std::io::Write;
use std::path::Path;

use embedline_core::error::{EmbedlineError, Result};

use crate::trial::TrialResult;

fn csv_error(e: csv::Error) -> EmbedlineError {
    EmbedlineError::Persist(format!("csv: {e}"))
}

/// Write one row per trial, with a header, to `writer`.
pub fn write_results<W: Write>(writer: W, results: &[TrialResult]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for result in results {
        csv.serialize(result).map_err(csv_error)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the results table to `path`. Nothing is written for an empty run.
pub fn write_results_file(path: &Path, results: &[TrialResult]) -> Result<bool> {
    if results.is_empty() {
        return Ok(false);
    }
    let file = std::fs::File::create(path)?;
    write_results(file, results)?;
    tracing::info!(path = %path.display(), trials = results.len(), "wrote trial results");
    Ok(true)
}

/// Read a results table back.
pub fn read_results(path: &Path) -> Result<Vec<TrialResult>> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<TrialResult>, _>>()
        .map_err(csv_error)
}
