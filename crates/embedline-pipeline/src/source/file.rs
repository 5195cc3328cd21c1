use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use embedline_core::document::RawRecord;
use embedline_core::error::{EmbedlineError, Result, SourceError};
use embedline_store::progress::ProgressMarkers;

use super::{Chunk, DocumentSource};

/// Newline-delimited JSON reader with chunk-level resume.
///
/// Each chunk covers `chunk_lines` physical lines. A chunk whose progress
/// marker exists is skipped by reading past its lines without decoding them.
/// Lines are read as raw bytes, so invalid UTF-8 is a malformed line like any
/// other decode failure.
pub struct FileSource {
    reader: BufReader<File>,
    line: Vec<u8>,
    chunk_lines: u64,
    markers: Option<ProgressMarkers>,
    next_index: u64,
    line_no: u64,
    malformed: u64,
    exhausted: bool,
}

impl FileSource {
    pub const DEFAULT_CHUNK_LINES: u64 = 1_000_000;

    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).await.map_err(SourceError::Io)?;
        Ok(Self {
            reader: BufReader::new(file),
            line: Vec::new(),
            chunk_lines: Self::DEFAULT_CHUNK_LINES,
            markers: None,
            next_index: 0,
            line_no: 0,
            malformed: 0,
            exhausted: false,
        })
    }

    pub fn with_chunk_lines(mut self, n: u64) -> Self {
        self.chunk_lines = n.max(1);
        self
    }

    pub fn with_markers(mut self, markers: ProgressMarkers) -> Self {
        self.markers = Some(markers);
        self
    }

    /// Lines skipped because they did not parse into a document.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    /// Read the next raw line into `self.line`, without its terminator.
    /// Returns false at end of file.
    async fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line)
            .await
            .map_err(SourceError::Io)?;
        if n == 0 {
            return Ok(false);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        self.line_no += 1;
        Ok(true)
    }

    /// Read past one chunk. Returns false if the file ended first.
    async fn skip_chunk(&mut self) -> Result<bool> {
        for _ in 0..self.chunk_lines {
            if !self.next_line().await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn is_done(&self, index: u64) -> bool {
        match &self.markers {
            Some(markers) => markers.is_done(index).await,
            None => false,
        }
    }

    fn parse(&mut self) -> Option<embedline_core::document::Document> {
        let record = match serde_json::from_slice::<RawRecord>(&self.line) {
            Ok(record) => record,
            Err(e) => {
                self.malformed += 1;
                let err = SourceError::Malformed {
                    line: self.line_no,
                    reason: e.to_string(),
                };
                tracing::warn!(error = %err, "skipping malformed line");
                return None;
            }
        };
        let doc = record.into_document();
        if doc.is_none() {
            self.malformed += 1;
            tracing::warn!(line = self.line_no, "skipping record without _id or text");
        }
        doc
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        while !self.exhausted {
            let index = self.next_index;
            if self.is_done(index).await {
                tracing::info!(chunk = index, "skipping already processed chunk");
                self.next_index += 1;
                if !self.skip_chunk().await? {
                    self.exhausted = true;
                }
                continue;
            }

            let mut documents = Vec::new();
            let mut read = 0;
            while read < self.chunk_lines {
                if !self.next_line().await? {
                    self.exhausted = true;
                    break;
                }
                read += 1;
                documents.extend(self.parse());
            }
            if read == 0 {
                break;
            }
            self.next_index += 1;
            tracing::debug!(chunk = index, lines = read, documents = documents.len(), "read chunk");
            return Ok(Some(Chunk { index, documents }));
        }
        Ok(None)
    }

    async fn chunk_enqueued(&mut self, index: u64) -> Result<()> {
        if let Some(markers) = &self.markers {
            markers
                .mark_done(index)
                .await
                .map_err(EmbedlineError::from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lines(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let path = dir.join("input.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[tokio::test]
    async fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(
            dir.path(),
            &[
                r#"{"_id": "1", "text": "one"}"#,
                r#"{"_id": "2", "text": "two""#,
                r#"{"_id": {"$oid": "3"}, "text": "three"}"#,
                r#"{"text": "no id"}"#,
            ],
        );
        let mut source = FileSource::open(&path).await.unwrap();
        let chunk = source.next_chunk().await.unwrap().unwrap();
        let ids: Vec<_> = chunk.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(source.malformed(), 2);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    fn write_bytes(dir: &Path, lines: &[&[u8]]) -> std::path::PathBuf {
        let path = dir.join("input.jsonl");
        std::fs::write(&path, lines.join(&b'\n')).unwrap();
        path
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bytes(
            dir.path(),
            &[
                br#"{"_id": "1", "text": "one"}"#,
                b"{\"_id\": \"2\", \"text\": \"bad \xff\xfe\"}",
                br#"{"_id": "3", "text": "three"}"#,
            ],
        );
        let mut source = FileSource::open(&path).await.unwrap();
        let chunk = source.next_chunk().await.unwrap().unwrap();
        let ids: Vec<_> = chunk.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(source.malformed(), 1);
    }

    #[tokio::test]
    async fn marked_chunk_with_invalid_utf8_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bytes(
            dir.path(),
            &[
                b"\xff\xfe\xfd",
                br#"{"_id": "1", "text": "one"}"#,
                br#"{"_id": "2", "text": "two"}"#,
            ],
        );
        let markers = ProgressMarkers::new(dir.path().join("progress")).await.unwrap();
        markers.mark_done(0).await.unwrap();

        let mut source = FileSource::open(&path)
            .await
            .unwrap()
            .with_chunk_lines(2)
            .with_markers(markers);
        let chunk = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.index, 1);
        assert_eq!(chunk.documents.len(), 1);
        assert_eq!(chunk.documents[0].id, "2");
        assert_eq!(source.malformed(), 0);
    }

    #[tokio::test]
    async fn crlf_line_endings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        std::fs::write(&path, "{\"_id\": \"a\", \"text\": \"x\"}\r\n").unwrap();
        let mut source = FileSource::open(&path).await.unwrap();
        let chunk = source.next_chunk().await.unwrap().unwrap();
        assert_eq!(chunk.documents.len(), 1);
        assert_eq!(source.malformed(), 0);
    }

    #[tokio::test]
    async fn splits_into_chunks_by_line_count() {
        let dir = tempfile::tempdir().unwrap();
        let lines: Vec<String> = (0..5)
            .map(|i| format!(r#"{{"_id": {i}, "text": "t{i}"}}"#))
            .collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let path = write_lines(dir.path(), &refs);

        let mut source = FileSource::open(&path).await.unwrap().with_chunk_lines(2);
        let mut sizes = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            sizes.push((chunk.index, chunk.documents.len()));
        }
        assert_eq!(sizes, vec![(0, 2), (1, 2), (2, 1)]);
    }

    #[tokio::test]
    async fn marks_enqueued_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(dir.path(), &[r#"{"_id": "a", "text": "x"}"#]);
        let markers = ProgressMarkers::new(dir.path().join("progress")).await.unwrap();

        let mut source = FileSource::open(&path).await.unwrap().with_markers(markers.clone());
        let chunk = source.next_chunk().await.unwrap().unwrap();
        assert!(!markers.is_done(chunk.index).await);
        source.chunk_enqueued(chunk.index).await.unwrap();
        assert!(markers.is_done(0).await);
    }

    #[tokio::test]
    async fn marked_chunk_past_end_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_lines(dir.path(), &[r#"{"_id": "a", "text": "x"}"#]);
        let markers = ProgressMarkers::new(dir.path().join("progress")).await.unwrap();
        markers.mark_done(0).await.unwrap();

        let mut source = FileSource::open(&path).await.unwrap().with_markers(markers);
        assert!(source.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSource::open(dir.path().join("absent.jsonl")).await.err().unwrap();
        assert!(matches!(err, EmbedlineError::Source(SourceError::Io(_))));
    }
}
