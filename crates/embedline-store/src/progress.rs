use std::path::{Path, PathBuf};

use crate::error::Result;

/// Filesystem markers recording which input chunks were fully enqueued.
///
/// One empty `chunk-{n}.done` file per chunk. Only the producer writes them.
#[derive(Debug, Clone)]
pub struct ProgressMarkers {
    dir: PathBuf,
}

impl ProgressMarkers {
    /// Use `dir` for markers, creating it if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, chunk: u64) -> PathBuf {
        self.dir.join(format!("chunk-{chunk}.done"))
    }

    pub async fn is_done(&self, chunk: u64) -> bool {
        tokio::fs::try_exists(self.path(chunk)).await.unwrap_or(false)
    }

    pub async fn mark_done(&self, chunk: u64) -> Result<()> {
        tokio::fs::write(self.path(chunk), b"").await?;
        tracing::debug!(chunk, "chunk marked done");
        Ok(())
    }
}
