//! Sweep execution, CSV export and run persistence.

use std::path::{Path, PathBuf};

use fs_results::{RunManifest, RunStatus, RunStore, SweepTable};
use fs_sweep::{CancelToken, SweepProgressEvent, SweepReport, SweepStatus};
use tracing::{info, warn};

use crate::config_service::{self, LoadedConfig};
use crate::engine_service;
use crate::error::{AppError, AppResult};

/// Version recorded in stored runs and mixed into run ids.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Per-invocation overrides of the configuration's output section.
#[derive(Debug, Clone, Default)]
pub struct SweepOverrides {
    pub csv: Option<PathBuf>,
    /// Skip the run store even if the configuration enables it.
    pub no_store: bool,
}

#[derive(Debug)]
pub struct SweepResponse {
    pub report: SweepReport,
    pub run_id: String,
    /// Set when the run was written to the run store.
    pub run_dir: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
}

impl SweepResponse {
    /// Process exit code for the sweep outcome.
    pub fn exit_code(&self) -> i32 {
        match &self.report.status {
            SweepStatus::Completed => 0,
            SweepStatus::Cancelled { .. } => AppError::Cancelled.exit_code(),
            SweepStatus::Failed(failure) => AppError::from(failure.clone()).exit_code(),
        }
    }

    /// The failure as an application error, if the sweep did not complete.
    pub fn error(&self) -> Option<AppError> {
        match &self.report.status {
            SweepStatus::Completed => None,
            SweepStatus::Cancelled { .. } => Some(AppError::Cancelled),
            SweepStatus::Failed(failure) => Some(AppError::from(failure.clone())),
        }
    }
}

pub fn run_status(status: &SweepStatus) -> RunStatus {
    match status {
        SweepStatus::Completed => RunStatus::Completed,
        SweepStatus::Cancelled {
            case_index,
            position_index,
        } => RunStatus::Cancelled {
            case_index: *case_index,
            position_index: *position_index,
        },
        SweepStatus::Failed(failure) => RunStatus::Failed {
            stage: failure.stage.name().to_string(),
            message: failure.to_string(),
        },
    }
}

/// Load `config_path` and run its sweep.
pub fn run_sweep_file(
    config_path: &Path,
    overrides: &SweepOverrides,
    cancel: &CancelToken,
    progress: Option<&mut dyn FnMut(SweepProgressEvent)>,
) -> AppResult<SweepResponse> {
    let loaded = config_service::load_config(config_path)?;
    run_sweep_config(&loaded, overrides, cancel, progress)
}

/// Run a loaded sweep. Partial tables are written out even when the sweep
/// is cancelled or fails; the returned response carries the outcome.
pub fn run_sweep_config(
    loaded: &LoadedConfig,
    overrides: &SweepOverrides,
    cancel: &CancelToken,
    progress: Option<&mut dyn FnMut(SweepProgressEvent)>,
) -> AppResult<SweepResponse> {
    let config = &loaded.config;
    let plan = config_service::build_plan(config)?;
    let run_id = fs_results::compute_run_id(&config.engine, &config.sweep, TOOL_VERSION);
    info!(
        run_id = %run_id,
        cases = plan.cases.len(),
        positions = plan.positions.len(),
        "starting sweep"
    );

    let mut engine = engine_service::open_for_config(config)?;
    let report = fs_sweep::run_sweep_with_progress(&mut engine.session, &plan, cancel, progress);

    let csv_path = overrides.csv.clone().or_else(|| config.output.csv.clone());
    if let Some(path) = &csv_path {
        report.table.save_csv(path)?;
        info!(path = %path.display(), rows = report.table.row_count(), "wrote CSV");
    }

    let run_dir = if config.output.store_runs && !overrides.no_store {
        let store = RunStore::for_config(&loaded.path)?;
        let manifest = build_manifest(&run_id, &config.name, &report);
        Some(store.save_run(&manifest, &report.table)?)
    } else {
        None
    };

    match &report.status {
        SweepStatus::Completed => {
            info!(run_id = %run_id, elapsed_s = report.timing.total_s, "sweep completed")
        }
        SweepStatus::Cancelled { .. } => warn!(run_id = %run_id, "sweep cancelled"),
        SweepStatus::Failed(failure) => warn!(run_id = %run_id, error = %failure, "sweep failed"),
    }

    Ok(SweepResponse {
        report,
        run_id,
        run_dir,
        csv_path,
    })
}

fn build_manifest(run_id: &str, name: &str, report: &SweepReport) -> RunManifest {
    let table = &report.table;
    RunManifest {
        run_id: run_id.to_string(),
        name: name.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        tool_version: TOOL_VERSION.to_string(),
        status: run_status(&report.status),
        positions: table.positions().iter().map(|p| [p.dx, p.dy]).collect(),
        cases: table.cases().to_vec(),
        outputs: table.outputs().to_vec(),
        cell_count: table.cell_count(),
        restore_warnings: report.restore_warnings.clone(),
        elapsed_s: report.timing.total_s,
    }
}

/// Stored runs for a configuration, newest first.
pub fn list_runs(config_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_config(config_path)?;
    Ok(store.list_runs()?)
}

pub fn load_run(config_path: &Path, run_id: &str) -> AppResult<(RunManifest, SweepTable)> {
    let store = RunStore::for_config(config_path)?;
    Ok(store.load_table(run_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fs_host::HostError;
    use fs_sweep::{SweepFailure, SweepStage};

    #[test]
    fn failed_status_keeps_stage_name() {
        let status = SweepStatus::Failed(SweepFailure {
            stage: SweepStage::Solving,
            case_index: Some(0),
            position: None,
            source: HostError::Solve {
                detail: "diverged".to_string(),
            },
        });
        match run_status(&status) {
            RunStatus::Failed { stage, message } => {
                assert_eq!(stage, "solving");
                assert!(message.contains("diverged"));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }
}
