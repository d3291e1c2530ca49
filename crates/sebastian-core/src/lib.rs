pub mod batch;
pub mod config;
pub mod csv_restore;
pub mod diff;
pub mod error;
pub mod language;
pub mod merge;
pub mod progress;
pub mod worker;
pub mod xlsx;

pub use batch::{Batch, BatchMap, BatchName};
pub use config::AppConfig;
pub use error::Error;
pub use language::Language;
pub use merge::{BatchMerger, MergeOutcome, MergeSelection, MergeStage, Row};
pub use progress::{ProgressReporter, SilentReporter};
pub use worker::{spawn_merge, MergeHandle, WorkerEvent};
