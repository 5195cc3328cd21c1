pub mod config;
pub mod orchestrator;
pub mod report;
pub mod trial;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::TuneConfig;
    pub use crate::orchestrator::{Orchestrator, TuneReport, select_best};
    pub use crate::report::{read_results, write_results, write_results_file};
    pub use crate::trial::{PipelineTrialRunner, TrialResult, TrialRunner};
}
