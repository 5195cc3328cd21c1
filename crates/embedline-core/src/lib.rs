pub mod clean;
pub mod document;
pub mod error;
pub mod vector;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::clean::clean_text;
    pub use crate::document::{Batch, Document, RawRecord, Sample, normalize_id};
    pub use crate::error::{ClientError, EmbedlineError, Result, SourceError};
    pub use crate::vector::EmbeddingVector;
}
