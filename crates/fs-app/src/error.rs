//! Error types for the fs-app service layer.

use std::path::PathBuf;

use fs_host::HostError;
use fs_sweep::{CaseError, SweepFailure};

/// Application error shared by every front-end. Each variant maps to one
/// process exit code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Move failed: {0}")]
    Move(String),

    #[error("Mesh failed: {0}")]
    Mesh(String),

    #[error("Solve failed: {0}")]
    Solve(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Case application failed: {0}")]
    Field(String),

    #[error("Result output failed: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

/// Result type for fs-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::InvalidInput(_) | AppError::Config(_) | AppError::FileRead { .. } => 1,
            AppError::Connection(_) => 2,
            AppError::ModelLoad(_) => 3,
            AppError::Move(_) => 4,
            AppError::Mesh(_) => 5,
            AppError::Solve(_) => 6,
            AppError::Extraction(_) => 7,
            AppError::Cancelled => 8,
            AppError::Field(_) => 9,
            AppError::Results(_) | AppError::RunNotFound(_) => 10,
            AppError::Worker(_) => 1,
        }
    }
}

// Conversions from backend error types
impl From<fs_project::ProjectError> for AppError {
    fn from(err: fs_project::ProjectError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<CaseError> for AppError {
    fn from(err: CaseError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl From<fs_results::ResultsError> for AppError {
    fn from(err: fs_results::ResultsError) -> Self {
        match err {
            fs_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}

impl From<HostError> for AppError {
    fn from(err: HostError) -> Self {
        let message = err.to_string();
        match err {
            HostError::Connection { .. } | HostError::Dispatch(_) => AppError::Connection(message),
            HostError::ModelLoad { .. } => AppError::ModelLoad(message),
            HostError::NotFound { .. } | HostError::Move { .. } => AppError::Move(message),
            HostError::Mesh { .. } => AppError::Mesh(message),
            HostError::Solve { .. } => AppError::Solve(message),
            HostError::Extraction { .. } => AppError::Extraction(message),
            HostError::Field { .. } => AppError::Field(message),
        }
    }
}

/// Classified by the host error; the message keeps the failing step and location.
impl From<SweepFailure> for AppError {
    fn from(failure: SweepFailure) -> Self {
        let message = failure.to_string();
        match AppError::from(failure.source) {
            AppError::Connection(_) => AppError::Connection(message),
            AppError::ModelLoad(_) => AppError::ModelLoad(message),
            AppError::Move(_) => AppError::Move(message),
            AppError::Mesh(_) => AppError::Mesh(message),
            AppError::Solve(_) => AppError::Solve(message),
            AppError::Extraction(_) => AppError::Extraction(message),
            AppError::Field(_) => AppError::Field(message),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_sweep::SweepStage;

    #[test]
    fn host_errors_map_to_exit_codes() {
        let cases = [
            (HostError::Connection { message: "x".into() }, 2),
            (HostError::ModelLoad { message: "x".into() }, 3),
            (
                HostError::NotFound {
                    what: "region",
                    name: "x".into(),
                },
                4,
            ),
            (
                HostError::Move {
                    target: "x".into(),
                    detail: "y".into(),
                },
                4,
            ),
            (HostError::Mesh { detail: "x".into() }, 5),
            (HostError::Solve { detail: "x".into() }, 6),
            (HostError::Extraction { detail: "x".into() }, 7),
            (
                HostError::Field {
                    label: "x".into(),
                    detail: "y".into(),
                },
                9,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).exit_code(), code);
        }
        assert_eq!(AppError::Cancelled.exit_code(), 8);
        assert_eq!(AppError::Results("x".into()).exit_code(), 10);
        assert_eq!(AppError::from(CaseError::EmptyExpression).exit_code(), 1);
    }

    #[test]
    fn sweep_failure_keeps_location() {
        let failure = SweepFailure {
            stage: SweepStage::Solving,
            case_index: Some(1),
            position: Some(fs_core::Position::new(2.0, 0.0)),
            source: HostError::Solve {
                detail: "diverged".into(),
            },
        };
        let err = AppError::from(failure);
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("case 1, position (2, 0)"));
    }
}
