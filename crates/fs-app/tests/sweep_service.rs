mod common;

use std::fs;
use std::path::Path;

use fs_app::{
    AppError, AppResult, SweepOverrides, SweepResponse, list_runs, load_run, run_sweep_file,
};
use fs_results::RunStatus;
use fs_sweep::{CancelToken, SweepStage, SweepStatus};

use common::{plunger_yaml, unique_temp_dir, write_config};

fn sweep(config: &Path) -> AppResult<SweepResponse> {
    run_sweep_file(config, &SweepOverrides::default(), &CancelToken::new(), None)
}

#[test]
fn sweep_writes_csv_and_stores_run() {
    let dir = unique_temp_dir("fs_app_sweep");
    let config = write_config(&dir, &plunger_yaml(""));

    let response = sweep(&config).unwrap();
    assert!(response.report.is_completed());
    assert_eq!(response.exit_code(), 0);

    let table = &response.report.table;
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.outputs(), ["MaxwellForce.X", "MaxwellForce.Y"]);
    // Mover centroid (1 + dx, 0.5) scaled by the case's coil loading
    let x = table.get(2, 1, "MaxwellForce.X").unwrap();
    assert!((x - 600.0).abs() < 1e-9);
    let y = table.get(0, 0, "MaxwellForce.Y").unwrap();
    assert!((y - 50.0).abs() < 1e-9);

    let csv_path = response.csv_path.clone().unwrap();
    assert_eq!(csv_path, dir.join("outputs/force_table.csv"));
    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "dx,dy,bobine=100:MaxwellForce.X,bobine=100:MaxwellForce.Y,bobine=200:MaxwellForce.X,bobine=200:MaxwellForce.Y"
    );
    assert_eq!(lines.count(), 3);

    let runs = list_runs(&config).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, response.run_id);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].cell_count, 12);

    let (manifest, stored) = load_run(&config, &response.run_id).unwrap();
    assert_eq!(manifest.positions, vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]]);
    assert_eq!(stored.get(2, 1, "MaxwellForce.X"), table.get(2, 1, "MaxwellForce.X"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn same_sweep_on_another_model_is_stored_separately() {
    let dir = unique_temp_dir("fs_app_two_models");
    let first = write_config(&dir, &plunger_yaml(""));
    let second = dir.join("other.yaml");
    let other_yaml = plunger_yaml("").replace(
        "  backend: simulated\n",
        "  backend: simulated\n  model: other.mod\n",
    );
    fs::write(&second, other_yaml).unwrap();

    let overrides = SweepOverrides {
        csv: Some(dir.join("first.csv")),
        no_store: false,
    };
    let a = run_sweep_file(&first, &overrides, &CancelToken::new(), None).unwrap();
    let overrides = SweepOverrides {
        csv: Some(dir.join("second.csv")),
        no_store: false,
    };
    let b = run_sweep_file(&second, &overrides, &CancelToken::new(), None).unwrap();

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(list_runs(&first).unwrap().len(), 2);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn overrides_redirect_csv_and_skip_store() {
    let dir = unique_temp_dir("fs_app_override");
    let config = write_config(&dir, &plunger_yaml(""));
    let overrides = SweepOverrides {
        csv: Some(dir.join("elsewhere.csv")),
        no_store: true,
    };

    let response = run_sweep_file(&config, &overrides, &CancelToken::new(), None).unwrap();
    assert!(response.run_dir.is_none());
    assert!(dir.join("elsewhere.csv").exists());
    assert!(!dir.join("outputs").exists());
    assert!(list_runs(&config).unwrap().is_empty());

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn solve_failure_is_reported_with_exit_code_and_stored() {
    let dir = unique_temp_dir("fs_app_solve_fail");
    let config = write_config(&dir, &plunger_yaml("solve_error: solver diverged"));

    let response = sweep(&config).unwrap();
    match &response.report.status {
        SweepStatus::Failed(failure) => {
            assert_eq!(failure.stage, SweepStage::Solving);
            assert_eq!(failure.case_index, Some(0));
        }
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(response.exit_code(), 6);
    assert!(matches!(response.error(), Some(AppError::Solve(_))));
    assert!(response.report.table.is_empty());

    let runs = list_runs(&config).unwrap();
    assert!(matches!(&runs[0].status, RunStatus::Failed { stage, .. } if stage == "solving"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn integral_failure_maps_to_extraction_exit_code() {
    let dir = unique_temp_dir("fs_app_extract_fail");
    let config = write_config(&dir, &plunger_yaml("integral_error: no result"));

    let response = sweep(&config).unwrap();
    assert_eq!(response.exit_code(), 7);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn cancelled_sweep_exits_with_cancel_code() {
    let dir = unique_temp_dir("fs_app_cancel");
    let config = write_config(&dir, &plunger_yaml(""));
    let cancel = CancelToken::new();
    cancel.cancel();

    let response = run_sweep_file(&config, &SweepOverrides::default(), &cancel, None).unwrap();
    assert_eq!(
        response.report.status,
        SweepStatus::Cancelled {
            case_index: 0,
            position_index: None
        }
    );
    assert_eq!(response.exit_code(), 8);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn unreadable_and_invalid_configs_exit_with_one() {
    let dir = unique_temp_dir("fs_app_bad_config");
    let missing = dir.join("missing.yaml");
    let err = sweep(&missing).unwrap_err();
    assert!(matches!(err, AppError::FileRead { .. }));
    assert_eq!(err.exit_code(), 1);

    let config = write_config(&dir, &plunger_yaml("").replace("bobine=100,200", "bobine=abc"));
    let err = sweep(&config).unwrap_err();
    assert_eq!(err.exit_code(), 1);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn progress_stream_ends_with_done() {
    let dir = unique_temp_dir("fs_app_progress");
    let config = write_config(&dir, &plunger_yaml(""));
    let mut stages = Vec::new();
    let mut cb = |event: fs_sweep::SweepProgressEvent| stages.push(event.stage);

    let overrides = SweepOverrides::default();
    run_sweep_file(&config, &overrides, &CancelToken::new(), Some(&mut cb)).unwrap();
    assert_eq!(stages.first(), Some(&SweepStage::Init));
    assert_eq!(stages.last(), Some(&SweepStage::Done));
    assert_eq!(stages.iter().filter(|s| **s == SweepStage::Recording).count(), 6);

    fs::remove_dir_all(&dir).ok();
}
