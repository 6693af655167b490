//! Shared application service layer for fieldsweep.
//!
//! This crate provides one interface for the CLI and any interactive
//! front-end: configuration loading, engine sessions, sweep execution with
//! CSV export and run storage, action-plan execution, a background sweep
//! worker, and the mapping of failures to process exit codes.

pub mod config_service;
pub mod engine_service;
pub mod error;
pub mod plan_service;
pub mod sweep_service;
pub mod worker;

// Re-export key types for convenience
pub use config_service::{LoadedConfig, build_cases, build_plan, build_positions, load_config};
pub use engine_service::{EngineSession, build_engine, open_for_config, open_session};
pub use error::{AppError, AppResult};
pub use plan_service::{ActionOutcome, PlanOptions, PlanReport, execute_plan, run_plan_file};
pub use sweep_service::{
    SweepOverrides, SweepResponse, TOOL_VERSION, list_runs, load_run, run_sweep_config,
    run_sweep_file,
};
pub use worker::{SweepWorker, WorkerMessage};
