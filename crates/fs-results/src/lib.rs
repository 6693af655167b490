//! fs-results: sweep result table, CSV export and run storage.

pub mod hash;
pub mod store;
pub mod table;
pub mod types;

pub use hash::compute_run_id;
pub use store::RunStore;
pub use table::{SweepTable, escape_csv_field};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("{axis} index {index} out of range (len {len})")]
    OutOfRange {
        axis: &'static str,
        index: usize,
        len: usize,
    },
}
