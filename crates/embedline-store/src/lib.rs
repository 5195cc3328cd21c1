pub mod consolidate;
pub mod error;
pub mod inspect;
pub mod progress;
pub mod sqlite;
pub mod store;
pub mod writer;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::consolidate::{ConsolidateConfig, ConsolidateReport, consolidate};
    pub use crate::error::StoreError;
    pub use crate::inspect::{ShardSummary, inspect_shard};
    pub use crate::progress::ProgressMarkers;
    pub use crate::sqlite::SqliteDocumentStore;
    pub use crate::store::{DocumentStore, MarkOutcome};
    pub use crate::writer::{embeddings_to_record_batch, write_shard};
}
