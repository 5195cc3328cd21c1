pub mod batcher;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod queue;
pub mod reporter;
pub mod sink;
pub mod source;
pub mod worker;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::batcher::{Batcher, batch_all};
    pub use crate::config::PipelineConfig;
    pub use crate::metrics::{LatencySummary, MetricsCollector, Totals};
    pub use crate::pipeline::{Pipeline, RunSummary};
    pub use crate::queue::{DispatchQueue, WorkItem};
    pub use crate::reporter::Reporter;
    pub use crate::sink::{BatchSink, DiscardSink, ParquetSink};
    pub use crate::source::{
        Chunk, DatabaseSource, DocumentSource, FileSource, LengthProfile, SyntheticSource,
    };
}
