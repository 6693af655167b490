//! Action-plan execution: one-shot geometry edits against a model.

use std::path::{Path, PathBuf};

use fs_core::Rect;
use fs_host::{HostResult, Session, SessionOptions, geometry};
use fs_project::schema::{ActionDef, ActionPlan, EngineDef};
use tracing::{debug, info, warn};

use crate::config_service;
use crate::engine_service::{self, EngineSession};
use crate::error::{AppError, AppResult};

/// What one action did.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    pub index: usize,
    pub kind: &'static str,
    /// Entities moved (or blocks drawn).
    pub moved: usize,
    /// Entities considered, when the operation reports it.
    pub total: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanReport {
    pub actions: Vec<ActionOutcome>,
    pub rebuilds: usize,
    pub saved_as: Option<PathBuf>,
}

/// Per-invocation options for running a plan file.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Configuration supplying the engine definition.
    pub config: Option<PathBuf>,
    /// Parse and validate only.
    pub dry_run: bool,
}

pub fn load_plan(path: &Path) -> AppResult<ActionPlan> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut plan = fs_project::parse_plan_json(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for p in [&mut plan.pbm, &mut plan.model, &mut plan.save_model_as] {
        if let Some(path) = p
            && path.is_relative()
        {
            *path = base.join(&*path);
        }
    }
    Ok(plan)
}

fn rect(r: &[f64; 4]) -> Rect {
    Rect::from_corners(r[0], r[1], r[2], r[3])
}

/// One-line human description of an action.
pub fn describe_action(action: &ActionDef) -> String {
    match action {
        ActionDef::MoveShape { labels, dx, dy }
        | ActionDef::MoveVertices { labels, dx, dy }
        | ActionDef::MoveBlockLabels { labels, dx, dy }
        | ActionDef::MoveVerticesByBlockLabel {
            label: labels,
            dx,
            dy,
        } => format!("{} [{}] by ({dx}, {dy})", action.type_name(), labels.names().join(", ")),
        ActionDef::MoveVerticesInRect { rect: r, dx, dy, .. }
        | ActionDef::MoveBlocksInRect { rect: r, dx, dy, .. } => {
            format!("{} {} by ({dx}, {dy})", action.type_name(), rect(r))
        }
        ActionDef::AddRectWithBlockLabel { rect: r, inset, label } => {
            format!("{} {} inset {inset} as '{label}'", action.type_name(), rect(r))
        }
    }
}

fn apply_action(session: &Session, index: usize, action: &ActionDef) -> HostResult<ActionOutcome> {
    let outcome = |moved, total| ActionOutcome {
        index,
        kind: action.type_name(),
        moved,
        total,
    };
    match action {
        ActionDef::MoveShape { labels, dx, dy } => {
            let mut moved = 0;
            for label in labels.names() {
                moved += geometry::move_shapes_by_label(session, &label, *dx, *dy)?;
            }
            Ok(outcome(moved, None))
        }
        ActionDef::MoveVertices { labels, dx, dy } => {
            let (moved, total) =
                geometry::move_vertices_for_labels(session, &labels.names(), *dx, *dy)?;
            Ok(outcome(moved, Some(total)))
        }
        ActionDef::MoveBlockLabels { labels, dx, dy } => {
            let moved = geometry::move_block_labels(session, &labels.names(), *dx, *dy)?;
            Ok(outcome(moved, None))
        }
        ActionDef::MoveVerticesByBlockLabel { label, dx, dy } => {
            let (mut moved, mut total) = (0, 0);
            for name in label.names() {
                let (m, t) = geometry::move_vertices_by_block_label(session, &name, *dx, *dy)?;
                moved += m;
                total += t;
            }
            Ok(outcome(moved, Some(total)))
        }
        ActionDef::MoveVerticesInRect {
            rect: r,
            dx,
            dy,
            epsilon,
        } => {
            let (moved, total) =
                geometry::move_vertices_in_rect(session, rect(r), *dx, *dy, *epsilon)?;
            Ok(outcome(moved, Some(total)))
        }
        ActionDef::MoveBlocksInRect {
            rect: r,
            dx,
            dy,
            epsilon,
        } => {
            let moved = geometry::move_blocks_in_rect(session, rect(r), *dx, *dy, *epsilon)
                .map(|report| report.moved)
                .unwrap_or(0);
            Ok(outcome(moved, None))
        }
        ActionDef::AddRectWithBlockLabel { rect: r, inset, label } => {
            let drawn = geometry::add_rect_with_block_label(session, rect(r), *inset, label)?;
            debug!(%drawn, label = %label, "rectangle added");
            Ok(outcome(1, None))
        }
    }
}

/// Execute every action in order. A host failure aborts the plan; an action
/// that matches nothing is logged and the plan continues.
pub fn execute_plan(session: &Session, plan: &ActionPlan) -> AppResult<PlanReport> {
    let mut report = PlanReport::default();
    for (index, action) in plan.actions.iter().enumerate() {
        let outcome = apply_action(session, index, action).map_err(|err| {
            warn!(index, action = action.type_name(), error = %err, "action failed");
            AppError::from(err)
        })?;
        if outcome.moved == 0 {
            warn!(index, action = outcome.kind, "action matched nothing");
        } else {
            info!(index, action = outcome.kind, moved = outcome.moved, "action applied");
        }
        report.actions.push(outcome);
        if plan.rebuild_each_action && session.rebuild() {
            report.rebuilds += 1;
        }
    }
    if plan.rebuild_at_end && session.rebuild() {
        report.rebuilds += 1;
    }
    if let Some(path) = &plan.save_model_as {
        session.save_model_as(path)?;
        info!(path = %path.display(), "model saved");
        report.saved_as = Some(path.clone());
    }
    Ok(report)
}

/// Open a session for `plan` on the engine described by `engine`.
pub fn open_for_plan(engine: &EngineDef, plan: &ActionPlan) -> AppResult<EngineSession> {
    let problem = if plan.use_active_problem {
        None
    } else {
        plan.pbm.as_deref().or(engine.problem.as_deref())
    };
    let model = plan.model.as_deref().or(engine.model.as_deref());
    engine_service::open_session(engine, problem, model, SessionOptions::default())
}

/// Load and run an action plan. With `dry_run` the plan is only validated
/// and an empty report is returned.
pub fn run_plan_file(
    plan_path: &Path,
    options: &PlanOptions,
) -> AppResult<(ActionPlan, PlanReport)> {
    let plan = load_plan(plan_path)?;
    if options.dry_run {
        return Ok((plan, PlanReport::default()));
    }
    let engine = match &options.config {
        Some(path) => config_service::load_config(path)?.config.engine,
        None => EngineDef::default(),
    };
    let session = open_for_plan(&engine, &plan)?;
    let report = execute_plan(&session.session, &plan)?;
    Ok((plan, report))
}
