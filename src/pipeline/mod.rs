pub mod controller;
pub mod run_log;
pub mod state;

pub use controller::{Pipeline, RunOutcome};
pub use state::{CheckpointStore, ProgressState, Step};
