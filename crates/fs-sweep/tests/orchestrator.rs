use std::collections::HashMap;
use std::time::Duration;

use fs_core::{Point2, Position, Real, Rect};
use fs_host::{
    FieldHost, HostError, HostResult, IntegralComponent, MoveMethod, MoveReport, SolveOutcome,
};
use fs_sweep::*;
use proptest::prelude::*;

/// In-memory host: one rigid group, a field table, a deterministic integral.
#[derive(Default)]
struct MockHost {
    base: Option<Rect>,
    offset: Point2,
    fields: HashMap<(String, String), Real>,
    vector: bool,
    calls: Vec<String>,
    moves: usize,
    solves: usize,
    fail_move_on: Option<usize>,
    fail_moves_from: Option<usize>,
    fail_solve_on: Option<usize>,
    fail_extract_on_solve: Option<usize>,
    warn_on_solve: Option<usize>,
    cancel_on_solve: Option<(usize, CancelToken)>,
    missing_label: Option<String>,
    selections: Vec<Rect>,
}

impl MockHost {
    fn new() -> Self {
        Self {
            base: Some(Rect::new(0.0, 0.0, 2.0, 1.0)),
            ..Self::default()
        }
    }

    fn loading(&self) -> Real {
        self.fields
            .iter()
            .filter(|((_, f), _)| f == "Loading")
            .map(|(_, v)| *v)
            .sum()
    }
}

impl FieldHost for MockHost {
    fn set_field_value(&mut self, label: &str, field: &str, value: Real) -> HostResult<()> {
        self.calls.push(format!("set {label}.{field}={value}"));
        if self.missing_label.as_deref() == Some(label) {
            return Err(HostError::Field {
                label: label.to_string(),
                detail: "label not found".to_string(),
            });
        }
        self.fields.insert((label.to_string(), field.to_string()), value);
        Ok(())
    }

    fn union_bounds(&mut self, labels: &[String]) -> HostResult<Rect> {
        self.base.ok_or_else(|| HostError::NotFound {
            what: "region",
            name: labels.join(","),
        })
    }

    fn move_group(
        &mut self,
        _labels: &[String],
        selection: Rect,
        dx: Real,
        dy: Real,
    ) -> HostResult<MoveReport> {
        self.moves += 1;
        self.calls.push(format!("move {dx} {dy}"));
        self.selections.push(selection);
        let locked = self.fail_move_on == Some(self.moves)
            || self.fail_moves_from.is_some_and(|n| self.moves >= n);
        if locked {
            return Err(HostError::Move {
                target: "group".to_string(),
                detail: "locked".to_string(),
            });
        }
        self.offset = self.offset.offset(dx, dy);
        Ok(MoveReport {
            moved: 1,
            total: 1,
            method: MoveMethod::Selection("Move(0, vector)"),
        })
    }

    fn build_mesh(&mut self) -> HostResult<()> {
        self.calls.push("mesh".to_string());
        Ok(())
    }

    fn remove_mesh(&mut self) -> HostResult<()> {
        self.calls.push("unmesh".to_string());
        Err(HostError::Mesh {
            detail: "nothing to remove".to_string(),
        })
    }

    fn solve(&mut self) -> HostResult<SolveOutcome> {
        self.solves += 1;
        self.calls.push("solve".to_string());
        if let Some((n, token)) = &self.cancel_on_solve
            && *n == self.solves
        {
            token.cancel();
        }
        if self.fail_solve_on == Some(self.solves) {
            return Err(HostError::Solve {
                detail: "diverged".to_string(),
            });
        }
        let warning = (self.warn_on_solve == Some(self.solves))
            .then(|| "Region 'Air' has no mesh".to_string());
        Ok(SolveOutcome {
            retried: warning.is_some(),
            warning,
            polls: 0,
            analyzed: true,
        })
    }

    fn evaluate_integral(
        &mut self,
        _contour_labels: &[String],
        integral_id: i32,
    ) -> HostResult<Vec<IntegralComponent>> {
        self.calls.push(format!("integral {integral_id}"));
        if self.fail_extract_on_solve == Some(self.solves) {
            return Err(HostError::Extraction {
                detail: "no contour".to_string(),
            });
        }
        let v = self.loading() * (1.0 + self.offset.x);
        Ok(if self.vector {
            vec![
                IntegralComponent::axis("X", v),
                IntegralComponent::axis("Y", -v),
            ]
        } else {
            vec![IntegralComponent::scalar(v)]
        })
    }
}

fn plan(values: &str, end: (Real, Real)) -> SweepPlan {
    SweepPlan {
        cases: cases_from_expression("Loading", values, CaseMode::All).unwrap(),
        positions: sample_line(0.0, 0.0, end.0, end.1, 1.0).unwrap(),
        move_labels: vec!["steel mover".to_string()],
        contour_labels: vec!["steel mover".to_string()],
        outputs: vec![OutputSpec {
            name: "F".to_string(),
            integral_id: 15,
        }],
        mesh: MeshPolicy::default(),
        settle: Duration::ZERO,
    }
}

#[test]
fn two_cases_three_positions_fill_the_table() {
    let mut host = MockHost::new();
    let report = run_sweep(&mut host, &plan("A=100,200", (2.0, 0.0)), &CancelToken::new());

    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.table.cell_count(), 6);
    assert_eq!(report.table.row_count(), 3);
    assert_eq!(report.table.column_headers(), ["A=100:F", "A=200:F"]);
    assert_eq!(report.table.get(2, 0, "F"), Some(300.0));
    assert_eq!(report.table.get(1, 1, "F"), Some(400.0));
    assert_eq!(report.timing.positions_recorded, 6);
    assert!(report.restore_warnings.is_empty());
    assert_eq!(host.offset, Point2::ORIGIN);
}

#[test]
fn moves_are_incremental_and_selection_tracks_offset() {
    let mut host = MockHost::new();
    run_sweep(&mut host, &plan("A=1", (2.0, 0.0)), &CancelToken::new());

    let moves: Vec<&String> = host.calls.iter().filter(|c| c.starts_with("move")).collect();
    assert_eq!(moves, ["move 1 0", "move 1 0", "move -2 0"]);
    assert_eq!(
        host.selections,
        vec![
            Rect::new(0.0, 0.0, 2.0, 1.0),
            Rect::new(1.0, 0.0, 3.0, 1.0),
            Rect::new(2.0, 0.0, 4.0, 1.0),
        ]
    );
}

#[test]
fn case_values_are_applied_once_before_positions() {
    let mut host = MockHost::new();
    run_sweep(&mut host, &plan("A=1,2;B=5", (1.0, 0.0)), &CancelToken::new());

    let sets: Vec<usize> = host
        .calls
        .iter()
        .enumerate()
        .filter(|(_, c)| c.starts_with("set"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(sets.len(), 4);
    assert_eq!(host.calls[0], "set A.Loading=1");
    assert_eq!(host.calls[1], "set B.Loading=5");
    // second case starts only after the first returned to baseline
    let second = sets[2];
    assert_eq!(host.calls[second - 1], "move -1 0");
}

#[test]
fn vector_outputs_become_component_columns() {
    let mut host = MockHost {
        vector: true,
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=10", (1.0, 0.0)), &CancelToken::new());
    assert_eq!(report.table.outputs(), ["F.X", "F.Y"]);
    assert_eq!(report.table.get(1, 0, "F.Y"), Some(-20.0));
}

#[test]
fn mesh_policy_controls_mesh_calls() {
    let count = |policy: MeshPolicy| {
        let mut host = MockHost::new();
        let mut p = plan("A=1,2", (2.0, 0.0));
        p.mesh = policy;
        let report = run_sweep(&mut host, &p, &CancelToken::new());
        assert!(report.is_completed());
        (
            host.calls.iter().filter(|c| *c == "mesh").count(),
            host.calls.iter().filter(|c| *c == "unmesh").count(),
        )
    };
    assert_eq!(count(MeshPolicy::default()), (6, 6));
    assert_eq!(
        count(MeshPolicy {
            remesh: false,
            mesh_each_position: true,
            mesh_once_per_case: false
        }),
        (6, 0)
    );
    assert_eq!(
        count(MeshPolicy {
            remesh: true,
            mesh_each_position: true,
            mesh_once_per_case: true
        }),
        (2, 2)
    );
    assert_eq!(
        count(MeshPolicy {
            remesh: false,
            mesh_each_position: false,
            mesh_once_per_case: false
        }),
        (0, 0)
    );
}

#[test]
fn cancel_at_case_boundary_leaves_baseline() {
    let token = CancelToken::new();
    let mut host = MockHost::new();
    let mut events = Vec::new();
    let remote = token.clone();
    let mut cb = |e: SweepProgressEvent| {
        if e.stage == SweepStage::ReturningToBaseline && e.case_index == Some(0) {
            remote.cancel();
        }
        events.push(e.stage);
    };
    let report = run_sweep_with_progress(
        &mut host,
        &plan("A=1,2,3", (2.0, 0.0)),
        &token,
        Some(&mut cb),
    );

    assert_eq!(
        report.status,
        SweepStatus::Cancelled {
            case_index: 1,
            position_index: None
        }
    );
    assert_eq!(host.offset, Point2::ORIGIN);
    assert_eq!(report.table.cell_count(), 3);
    assert!(!host.calls.iter().any(|c| c == "set A.Loading=2"));
    assert_eq!(events.last(), Some(&SweepStage::Cancelled));
}

#[test]
fn cancel_at_position_boundary_records_no_partial_row() {
    let token = CancelToken::new();
    let mut host = MockHost {
        cancel_on_solve: Some((2, token.clone())),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1", (3.0, 0.0)), &token);

    assert_eq!(
        report.status,
        SweepStatus::Cancelled {
            case_index: 0,
            position_index: Some(2)
        }
    );
    assert!(report.table.has_row(0, 0));
    assert!(report.table.has_row(1, 0));
    assert!(!report.table.has_row(2, 0));
    assert_eq!(host.offset, Point2::ORIGIN);
    assert_eq!(host.solves, 2);
}

#[test]
fn extraction_failure_restores_and_reports_location() {
    let mut host = MockHost {
        fail_extract_on_solve: Some(2),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1,2", (2.0, 0.0)), &CancelToken::new());

    let SweepStatus::Failed(failure) = &report.status else {
        panic!("expected failure, got {:?}", report.status);
    };
    assert_eq!(failure.stage, SweepStage::Extracting);
    assert_eq!(failure.case_index, Some(0));
    assert_eq!(failure.position, Some(Position::new(1.0, 0.0)));
    assert!(matches!(failure.source, HostError::Extraction { .. }));
    assert!(failure.to_string().contains("extracting failed at case 0, position (1, 0)"));

    assert!(report.table.has_row(0, 0));
    assert!(!report.table.has_row(1, 0));
    assert_eq!(host.offset, Point2::ORIGIN);
    assert!(report.restore_warnings.is_empty());
}

#[test]
fn failed_move_does_not_advance_tracking() {
    let mut host = MockHost {
        fail_move_on: Some(2),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1", (3.0, 0.0)), &CancelToken::new());

    let SweepStatus::Failed(failure) = &report.status else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, SweepStage::MovingToPosition);
    // only the first move was applied, so the return trip is -1
    assert_eq!(host.calls.last().map(String::as_str), Some("move -1 0"));
    assert_eq!(host.offset, Point2::ORIGIN);
}

#[test]
fn restore_failure_is_a_warning_on_abort() {
    let mut host = MockHost {
        fail_solve_on: Some(2),
        fail_moves_from: Some(2),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1", (2.0, 0.0)), &CancelToken::new());

    let SweepStatus::Failed(failure) = &report.status else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, SweepStage::Solving);
    assert_eq!(report.restore_warnings.len(), 1);
    assert!(report.restore_warnings[0].contains("baseline"));
    assert_eq!(host.offset, Point2::new(1.0, 0.0));
}

#[test]
fn restore_failure_after_success_fails_the_sweep() {
    let mut host = MockHost {
        fail_moves_from: Some(3),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1,2", (2.0, 0.0)), &CancelToken::new());
    let SweepStatus::Failed(failure) = &report.status else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, SweepStage::ReturningToBaseline);
    assert_eq!(report.restore_warnings.len(), 1);
    assert_eq!(report.table.cell_count(), 3);
    assert!(!host.calls.iter().any(|c| c == "set A.Loading=2"));
}

#[test]
fn field_failure_aborts_before_moving() {
    let mut host = MockHost {
        missing_label: Some("B".to_string()),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1;B=2", (1.0, 0.0)), &CancelToken::new());
    let SweepStatus::Failed(failure) = &report.status else {
        panic!("expected failure");
    };
    assert_eq!(failure.stage, SweepStage::ApplyingCase);
    assert!(matches!(failure.source, HostError::Field { .. }));
    assert_eq!(host.moves, 0);
}

#[test]
fn missing_group_fails_at_init() {
    let mut host = MockHost {
        base: None,
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1", (1.0, 0.0)), &CancelToken::new());
    assert!(matches!(
        report.status,
        SweepStatus::Failed(SweepFailure {
            stage: SweepStage::Init,
            source: HostError::NotFound { .. },
            ..
        })
    ));
}

#[test]
fn solve_warnings_are_counted() {
    let mut host = MockHost {
        warn_on_solve: Some(1),
        ..MockHost::new()
    };
    let report = run_sweep(&mut host, &plan("A=1", (1.0, 0.0)), &CancelToken::new());
    assert!(report.is_completed());
    assert_eq!(report.timing.solve_warnings, 1);
    assert_eq!(report.timing.solve_retries, 1);
}

#[test]
fn progress_stream_follows_state_machine() {
    let mut host = MockHost::new();
    let mut stages = Vec::new();
    let mut cb = |e: SweepProgressEvent| stages.push(e.stage);
    run_sweep_with_progress(
        &mut host,
        &plan("A=1", (1.0, 0.0)),
        &CancelToken::new(),
        Some(&mut cb),
    );
    use SweepStage::*;
    let per_position = [MovingToPosition, Meshing, Solving, Extracting, Recording];
    let mut expected = vec![Init, ApplyingCase, MovingToBaseline];
    expected.extend(per_position);
    expected.extend(per_position);
    expected.extend([ReturningToBaseline, Done]);
    assert_eq!(stages, expected);
}

proptest! {
    #[test]
    fn group_always_returns_to_baseline(
        x1 in -5.0..5.0f64,
        y1 in -5.0..5.0f64,
        fail_at in proptest::option::of(1usize..8),
    ) {
        let mut host = MockHost {
            fail_solve_on: fail_at,
            ..MockHost::new()
        };
        let mut p = plan("A=1,2", (0.0, 0.0));
        p.positions = sample_line(0.0, 0.0, x1, y1, 1.0).unwrap();
        let report = run_sweep(&mut host, &p, &CancelToken::new());
        prop_assert!(host.offset.x.abs() < 1e-9 && host.offset.y.abs() < 1e-9);
        prop_assert!(report.restore_warnings.is_empty());
        let expected_cells = match report.status {
            SweepStatus::Completed => 2 * p.positions.len(),
            _ => report.timing.positions_recorded,
        };
        prop_assert_eq!(report.table.cell_count(), expected_cells);
    }
}
