//! Drives the nested case x position loop against a [`FieldHost`].
//!
//! Per case: apply the case's field values, then for every position move the
//! group by the delta from the tracked offset, mesh, solve, extract and
//! record. The group is returned to its baseline before the next case, and
//! also when a step fails or cancellation is observed.

use std::time::{Duration, Instant};

use fs_core::{Case, Point2, Position, TrackedRect};
use fs_host::{FieldHost, HostError};
use fs_results::{CaseAxis, SweepTable};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::progress::{SweepProgressEvent, SweepStage};

/// One extracted quantity: integral id and the column prefix it is stored under.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSpec {
    pub name: String,
    pub integral_id: i32,
}

/// When the mesh is rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshPolicy {
    /// Remove the existing mesh before each build.
    pub remesh: bool,
    pub mesh_each_position: bool,
    /// Build once at the start of every case; wins over `mesh_each_position`.
    pub mesh_once_per_case: bool,
}

impl Default for MeshPolicy {
    fn default() -> Self {
        Self {
            remesh: true,
            mesh_each_position: true,
            mesh_once_per_case: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SweepPlan {
    pub cases: Vec<Case>,
    pub positions: Vec<Position>,
    pub move_labels: Vec<String>,
    pub contour_labels: Vec<String>,
    pub outputs: Vec<OutputSpec>,
    pub mesh: MeshPolicy,
    /// Pause after each recorded position.
    pub settle: Duration,
}

fn describe_location(case_index: &Option<usize>, position: &Option<Position>) -> String {
    match (case_index, position) {
        (Some(c), Some(p)) => format!(" at case {c}, position {p}"),
        (Some(c), None) => format!(" at case {c}"),
        (None, Some(p)) => format!(" at position {p}"),
        (None, None) => String::new(),
    }
}

/// The step that aborted a sweep.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{stage} failed{}: {source}", describe_location(.case_index, .position))]
pub struct SweepFailure {
    pub stage: SweepStage,
    pub case_index: Option<usize>,
    pub position: Option<Position>,
    #[source]
    pub source: HostError,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SweepStatus {
    Completed,
    /// Cancellation seen before `case_index` (and `position_index`, if set).
    Cancelled {
        case_index: usize,
        position_index: Option<usize>,
    },
    Failed(SweepFailure),
}

#[derive(Clone, Debug, Default)]
pub struct SweepTiming {
    pub total_s: f64,
    pub move_s: f64,
    pub mesh_s: f64,
    pub solve_s: f64,
    pub extract_s: f64,
    pub settle_s: f64,
    pub positions_recorded: usize,
    pub solve_retries: usize,
    pub solve_warnings: usize,
}

#[derive(Debug)]
pub struct SweepReport {
    pub table: SweepTable,
    pub status: SweepStatus,
    /// Baseline restorations that did not succeed.
    pub restore_warnings: Vec<String>,
    pub timing: SweepTiming,
}

impl SweepReport {
    pub fn is_completed(&self) -> bool {
        self.status == SweepStatus::Completed
    }
}

struct Emitter<'a> {
    cb: Option<&'a mut dyn FnMut(SweepProgressEvent)>,
    started: Instant,
    cases_total: usize,
    positions_total: usize,
}

impl Emitter<'_> {
    fn emit(
        &mut self,
        stage: SweepStage,
        case_index: Option<usize>,
        position_index: Option<usize>,
        position: Option<Position>,
        message: Option<String>,
    ) {
        if let Some(cb) = self.cb.as_deref_mut() {
            cb(SweepProgressEvent {
                stage,
                case_index,
                position_index,
                position,
                cases_total: self.cases_total,
                positions_total: self.positions_total,
                elapsed_wall_s: self.started.elapsed().as_secs_f64(),
                message,
            });
        }
    }
}

/// Why a case's position loop stopped early.
enum Interrupt {
    Cancelled { position_index: usize },
    Failed(SweepFailure),
}

struct Run<'a, 'cb, H: FieldHost + ?Sized> {
    host: &'a mut H,
    plan: &'a SweepPlan,
    cancel: &'a CancelToken,
    emitter: Emitter<'cb>,
    table: SweepTable,
    timing: SweepTiming,
    restore_warnings: Vec<String>,
}

pub fn run_sweep<H: FieldHost + ?Sized>(
    host: &mut H,
    plan: &SweepPlan,
    cancel: &CancelToken,
) -> SweepReport {
    run_sweep_with_progress(host, plan, cancel, None)
}

/// Run the sweep and stream a progress event at every state transition.
pub fn run_sweep_with_progress<H: FieldHost + ?Sized>(
    host: &mut H,
    plan: &SweepPlan,
    cancel: &CancelToken,
    progress_cb: Option<&mut dyn FnMut(SweepProgressEvent)>,
) -> SweepReport {
    let started = Instant::now();
    let cases = plan
        .cases
        .iter()
        .map(|c| CaseAxis {
            index: c.index,
            label: c.label(),
        })
        .collect();

    let mut run = Run {
        host,
        plan,
        cancel,
        emitter: Emitter {
            cb: progress_cb,
            started,
            cases_total: plan.cases.len(),
            positions_total: plan.positions.len(),
        },
        table: SweepTable::new(plan.positions.clone(), cases),
        timing: SweepTiming::default(),
        restore_warnings: Vec::new(),
    };

    let status = run.execute();
    run.timing.total_s = started.elapsed().as_secs_f64();

    let (stage, message) = match &status {
        SweepStatus::Completed => (SweepStage::Done, None),
        SweepStatus::Cancelled { .. } => (SweepStage::Cancelled, None),
        SweepStatus::Failed(f) => (SweepStage::Failed, Some(f.to_string())),
    };
    run.emitter.emit(stage, None, None, None, message);
    info!(
        status = ?stage,
        cells = run.table.cell_count(),
        total_s = run.timing.total_s,
        "sweep finished"
    );

    SweepReport {
        table: run.table,
        status,
        restore_warnings: run.restore_warnings,
        timing: run.timing,
    }
}

impl<H: FieldHost + ?Sized> Run<'_, '_, H> {
    fn execute(&mut self) -> SweepStatus {
        let plan = self.plan;
        self.emitter.emit(SweepStage::Init, None, None, None, None);
        info!(
            cases = plan.cases.len(),
            positions = plan.positions.len(),
            labels = ?plan.move_labels,
            "sweep starting"
        );

        let baseline = match self.host.union_bounds(&plan.move_labels) {
            Ok(rect) => rect,
            Err(source) => {
                return SweepStatus::Failed(SweepFailure {
                    stage: SweepStage::Init,
                    case_index: None,
                    position: None,
                    source,
                });
            }
        };
        debug!(%baseline, "moving group bounds");

        for case in &plan.cases {
            if self.cancel.is_cancelled() {
                info!(case = case.index, "cancelled before case");
                return SweepStatus::Cancelled {
                    case_index: case.index,
                    position_index: None,
                };
            }

            if let Err(failure) = self.apply_case(case) {
                return SweepStatus::Failed(failure);
            }

            let mut tracked = TrackedRect::new(baseline);
            self.emitter
                .emit(SweepStage::MovingToBaseline, Some(case.index), None, None, None);

            let outcome = self.run_positions(case, &mut tracked);

            self.emitter
                .emit(SweepStage::ReturningToBaseline, Some(case.index), None, None, None);
            let restored = self.return_to_baseline(case, &mut tracked);

            match (outcome, restored) {
                (Err(Interrupt::Cancelled { position_index }), _) => {
                    info!(case = case.index, position_index, "cancelled");
                    return SweepStatus::Cancelled {
                        case_index: case.index,
                        position_index: Some(position_index),
                    };
                }
                (Err(Interrupt::Failed(failure)), _) => return SweepStatus::Failed(failure),
                (Ok(()), Err(source)) => {
                    return SweepStatus::Failed(SweepFailure {
                        stage: SweepStage::ReturningToBaseline,
                        case_index: Some(case.index),
                        position: None,
                        source,
                    });
                }
                (Ok(()), Ok(())) => {
                    info!(case = case.index, label = %case.label(), "case complete")
                }
            }
        }

        SweepStatus::Completed
    }

    fn apply_case(&mut self, case: &Case) -> Result<(), SweepFailure> {
        self.emitter.emit(
            SweepStage::ApplyingCase,
            Some(case.index),
            None,
            None,
            Some(case.label()),
        );
        info!(case = case.index, label = %case.label(), "applying case");
        for a in &case.assignments {
            self.host
                .set_field_value(&a.label, &a.field, a.value)
                .map_err(|source| SweepFailure {
                    stage: SweepStage::ApplyingCase,
                    case_index: Some(case.index),
                    position: None,
                    source,
                })?;
        }
        Ok(())
    }

    fn run_positions(&mut self, case: &Case, tracked: &mut TrackedRect) -> Result<(), Interrupt> {
        let plan = self.plan;
        let fail = |stage: SweepStage, position: Option<Position>, source: HostError| {
            Interrupt::Failed(SweepFailure {
                stage,
                case_index: Some(case.index),
                position,
                source,
            })
        };

        if plan.mesh.mesh_once_per_case {
            self.emitter
                .emit(SweepStage::Meshing, Some(case.index), None, None, None);
            self.mesh().map_err(|e| fail(SweepStage::Meshing, None, e))?;
        }

        for (pi, &position) in plan.positions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Interrupt::Cancelled { position_index: pi });
            }
            let at = Some(position);

            self.emitter
                .emit(SweepStage::MovingToPosition, Some(case.index), Some(pi), at, None);
            self.move_to(tracked, position.as_point())
                .map_err(|e| fail(SweepStage::MovingToPosition, at, e))?;

            if plan.mesh.mesh_each_position && !plan.mesh.mesh_once_per_case {
                self.emitter
                    .emit(SweepStage::Meshing, Some(case.index), Some(pi), at, None);
                self.mesh().map_err(|e| fail(SweepStage::Meshing, at, e))?;
            }

            self.emitter
                .emit(SweepStage::Solving, Some(case.index), Some(pi), at, None);
            let t = Instant::now();
            let outcome = self
                .host
                .solve()
                .map_err(|e| fail(SweepStage::Solving, at, e))?;
            self.timing.solve_s += t.elapsed().as_secs_f64();
            if outcome.retried {
                self.timing.solve_retries += 1;
            }
            if let Some(w) = &outcome.warning {
                self.timing.solve_warnings += 1;
                warn!(case = case.index, %position, warning = %w, "solve finished with a warning");
            }

            self.emitter
                .emit(SweepStage::Extracting, Some(case.index), Some(pi), at, None);
            let t = Instant::now();
            let mut values = Vec::new();
            for output in &plan.outputs {
                let components = self
                    .host
                    .evaluate_integral(&plan.contour_labels, output.integral_id)
                    .map_err(|e| fail(SweepStage::Extracting, at, e))?;
                if components.is_empty() {
                    return Err(fail(
                        SweepStage::Extracting,
                        at,
                        HostError::Extraction {
                            detail: format!(
                                "integral {} returned no components",
                                output.integral_id
                            ),
                        },
                    ));
                }
                values.extend(
                    components
                        .iter()
                        .map(|c| (c.column(&output.name), c.value)),
                );
            }
            self.timing.extract_s += t.elapsed().as_secs_f64();

            self.emitter
                .emit(SweepStage::Recording, Some(case.index), Some(pi), at, None);
            self.table
                .record_row(pi, case.index, &values)
                .map_err(|e| {
                    fail(
                        SweepStage::Recording,
                        at,
                        HostError::Extraction {
                            detail: e.to_string(),
                        },
                    )
                })?;
            self.timing.positions_recorded += 1;
            debug!(case = case.index, %position, ?values, "position recorded");

            if !plan.settle.is_zero() {
                std::thread::sleep(plan.settle);
                self.timing.settle_s += plan.settle.as_secs_f64();
            }
        }
        Ok(())
    }

    /// Move the group so its cumulative offset becomes `target`.
    fn move_to(&mut self, tracked: &mut TrackedRect, target: Point2) -> Result<(), HostError> {
        let delta = tracked.delta_to(target);
        if delta.is_negligible() {
            return Ok(());
        }
        let t = Instant::now();
        let report = self.host.move_group(
            &self.plan.move_labels,
            tracked.current(),
            delta.x,
            delta.y,
        );
        self.timing.move_s += t.elapsed().as_secs_f64();
        let report = report?;
        tracked.apply(delta.x, delta.y);
        debug!(
            dx = delta.x,
            dy = delta.y,
            moved = report.moved,
            total = report.total,
            method = %report.method,
            "group moved"
        );
        Ok(())
    }

    fn mesh(&mut self) -> Result<(), HostError> {
        let t = Instant::now();
        if self.plan.mesh.remesh
            && let Err(e) = self.host.remove_mesh()
        {
            warn!(error = %e, "mesh removal failed");
        }
        let built = self.host.build_mesh();
        self.timing.mesh_s += t.elapsed().as_secs_f64();
        built
    }

    /// Undo the case's cumulative displacement. Failures are kept as warnings.
    fn return_to_baseline(
        &mut self,
        case: &Case,
        tracked: &mut TrackedRect,
    ) -> Result<(), HostError> {
        if tracked.at_baseline() {
            return Ok(());
        }
        let offset = tracked.offset();
        match self.move_to(tracked, Point2::ORIGIN) {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = format!(
                    "case {}: failed to return group from offset {} to baseline: {e}",
                    case.index, offset
                );
                warn!("{msg}");
                self.restore_warnings.push(msg);
                Err(e)
            }
        }
    }
}
