use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, params};

use embedline_core::document::Document;

use crate::error::{Result, StoreError};
use crate::store::{DocumentStore, MarkOutcome};

/// SQLite-backed document store.
///
/// Thread-safe via `Arc<Mutex<Connection>>`. All SQLite operations are
/// dispatched to a blocking thread via `tokio::task::spawn_blocking`.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StoreError::Task("sqlite connection mutex poisoned".into()))
}

impl SqliteDocumentStore {
    /// Open (or create) a SQLite database at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedded INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_documents_pending
                ON documents(embedded, id);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert documents as not yet embedded, replacing any existing row.
    pub async fn insert_documents(&self, docs: Vec<Document>) -> Result<usize> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO documents (id, text, embedded) VALUES (?1, ?2, 0)",
                )?;
                for doc in &docs {
                    stmt.execute(params![doc.id, doc.text])?;
                }
            }
            tx.commit()?;
            Ok(docs.len())
        })
        .await?
    }

    pub async fn count_pending(&self) -> Result<usize> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM documents WHERE embedded = 0", [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        })
        .await?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn fetch_pending(&self, after: Option<&str>, limit: usize) -> Result<Vec<Document>> {
        let conn = Arc::clone(&self.conn);
        let after = after.map(str::to_owned);
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT id, text FROM documents
                 WHERE embedded = 0 AND (?1 IS NULL OR id > ?1)
                 ORDER BY id
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![after, limit as i64], |row| {
                Ok(Document {
                    id: row.get(0)?,
                    text: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await?
    }

    async fn mark_embedded(&self, ids: &[String]) -> Result<MarkOutcome> {
        let conn = Arc::clone(&self.conn);
        let ids = ids.to_vec();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare("UPDATE documents SET embedded = 1 WHERE id = ?1")?;
            let mut outcome = MarkOutcome::default();
            for id in &ids {
                match stmt.execute(params![id]) {
                    Ok(0) => outcome.unmatched += 1,
                    Ok(n) => outcome.updated += n,
                    Err(e) => {
                        tracing::warn!(id = %id, error = %e, "failed to mark document embedded");
                        outcome.failed += 1;
                    }
                }
            }
            Ok(outcome)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[&str]) -> Vec<Document> {
        ids.iter().map(|id| Document::new(*id, format!("text {id}"))).collect()
    }

    #[tokio::test]
    async fn fetch_pending_in_id_order() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store.insert_documents(docs(&["c", "a", "b"])).await.unwrap();

        let page = store.fetch_pending(None, 10).await.unwrap();
        let ids: Vec<_> = page.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(page[0].text, "text a");
    }

    #[tokio::test]
    async fn keyset_pagination() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store.insert_documents(docs(&["1", "2", "3", "4", "5"])).await.unwrap();

        let first = store.fetch_pending(None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let second = store.fetch_pending(Some(&first[1].id), 2).await.unwrap();
        let ids: Vec<_> = second.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4"]);
        let third = store.fetch_pending(Some("4"), 2).await.unwrap();
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn marked_documents_are_not_pending() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store.insert_documents(docs(&["a", "b", "c"])).await.unwrap();

        let outcome = store
            .mark_embedded(&["a".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome.updated, 2);
        assert_eq!(store.count_pending().await.unwrap(), 1);

        let page = store.fetch_pending(None, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b");
    }

    #[tokio::test]
    async fn unknown_ids_do_not_block_others() {
        let store = SqliteDocumentStore::in_memory().unwrap();
        store.insert_documents(docs(&["a", "b"])).await.unwrap();

        let ids = vec!["missing".to_string(), "a".to_string(), "b".to_string()];
        let outcome = store.mark_embedded(&ids).await.unwrap();
        assert_eq!(
            outcome,
            MarkOutcome {
                updated: 2,
                unmatched: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        {
            let store = SqliteDocumentStore::new(&path).unwrap();
            store.insert_documents(docs(&["x"])).await.unwrap();
        }
        let reopened = SqliteDocumentStore::new(&path).unwrap();
        assert_eq!(reopened.count_pending().await.unwrap(), 1);
    }
}
