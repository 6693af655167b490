//! Engine construction and session opening.
//!
//! The only backend is the in-memory simulated engine, built from the
//! `engine.simulated` fixture of a configuration. Engine handles are not
//! `Send`; build them on the thread that drives the sweep.

use std::path::Path;
use std::time::Duration;

use fs_core::{Point2, Rect};
use fs_host::sim::{
    BoundsStyle, ContourAdd, EntityMove, FieldBinding, LabeledLookup, MeshArgs, MeshTarget,
    RectSelection, SelectionMove, SimDialect, SimEngine, SimFaults, SimModel, SolveMethod,
};
use fs_host::{Session, SessionOptions, SolvePolicy};
use fs_project::schema::*;
use tracing::info;

use crate::error::{AppError, AppResult};

/// An engine plus the session attached to it.
pub struct EngineSession {
    pub engine: SimEngine,
    pub session: Session,
}

pub fn build_model(def: &SimulatedEngineDef) -> SimModel {
    let mut model = SimModel::new();
    for block in &def.blocks {
        let [x1, y1, x2, y2] = block.rect;
        model = model.with_rect_block(&block.label, Rect::from_corners(x1, y1, x2, y2));
    }
    for label in &def.labels {
        let fields: Vec<(&str, f64)> = label.fields.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        model = model.with_label(&label.name, label.at.map(|[x, y]| Point2::new(x, y)), &fields);
    }
    model
}

pub fn build_dialect(def: &DialectDef) -> SimDialect {
    let mut d = match def.preset {
        DialectPreset::Standard => SimDialect::default(),
        DialectPreset::Legacy => SimDialect::legacy(),
    };
    if let Some(v) = def.entity_move {
        d.entity_move = match v {
            EntityMoveDef::Vector => EntityMove::Vector,
            EntityMoveDef::Scalars => EntityMove::Scalars,
            EntityMoveDef::Interactive => EntityMove::Interactive,
            EntityMoveDef::PointAssign => EntityMove::PointAssign,
            EntityMoveDef::PointFields => EntityMove::PointFields,
        };
    }
    if let Some(v) = def.selection_move {
        d.selection_move = match v {
            SelectionMoveDef::OriginVector => SelectionMove::OriginVector,
            SelectionMoveDef::Vector => SelectionMove::Vector,
            SelectionMoveDef::Scalars => SelectionMove::Scalars,
            SelectionMoveDef::Unsupported => SelectionMove::Unsupported,
        };
    }
    if let Some(v) = def.bounds {
        d.bounds = match v {
            BoundsStyleDef::Direct => BoundsStyle::Direct,
            BoundsStyleDef::Dimensions => BoundsStyle::Dimensions,
            BoundsStyleDef::VerticesOnly => BoundsStyle::VerticesOnly,
        };
    }
    if let Some(v) = def.rect_selection {
        d.rect_selection = match v {
            RectSelectionDef::PointPair => RectSelection::PointPair,
            RectSelectionDef::Scalars => RectSelection::Scalars,
            RectSelectionDef::Unsupported => RectSelection::Unsupported,
        };
    }
    if let Some(v) = def.labeled_lookup {
        d.labeled_lookup = match v {
            LabeledLookupDef::OneArg => LabeledLookup::OneArg,
            LabeledLookupDef::ThreeArgs => LabeledLookup::ThreeArgs,
            LabeledLookupDef::Unsupported => LabeledLookup::Unsupported,
        };
    }
    if let Some(v) = def.mesh_target {
        d.mesh_target = match v {
            MeshTargetDef::Shapes => MeshTarget::Shapes,
            MeshTargetDef::Model => MeshTarget::Model,
        };
    }
    if let Some(v) = def.mesh_args {
        d.mesh_args = match v {
            MeshArgsDef::TwoFlags => MeshArgs::TwoFlags,
            MeshArgsDef::OneFlag => MeshArgs::OneFlag,
            MeshArgsDef::NoArgs => MeshArgs::NoArgs,
        };
    }
    if let Some(v) = def.solve_method {
        d.solve_method = match v {
            SolveMethodDef::SolveProblem => SolveMethod::SolveProblem,
            SolveMethodDef::Solve => SolveMethod::Solve,
        };
    }
    if let Some(v) = def.contour_add {
        d.contour_add = match v {
            ContourAddDef::AddBlock1 => ContourAdd::AddBlock1,
            ContourAddDef::AddBlock => ContourAdd::AddBlock,
            ContourAddDef::AddBlock2 => ContourAdd::AddBlock2,
        };
    }
    if let Some(v) = def.field_binding {
        d.field_binding = match v {
            FieldBindingDef::Property => FieldBinding::Property,
            FieldBindingDef::Method => FieldBinding::Method,
        };
    }
    if let Some(v) = def.vector_integrals {
        d.vector_integrals = v;
    }
    if let Some(v) = def.wrap_integral_value {
        d.wrap_integral_value = v;
    }
    if let Some(v) = def.busy_polls {
        d.busy_polls = v;
    }
    if let Some(v) = def.labels_on_data_doc {
        d.labels_on_data_doc = v;
    }
    d
}

pub fn build_faults(def: &FaultsDef) -> SimFaults {
    SimFaults {
        transient_solve_failures: def.transient_solve_failures,
        solve_error: def.solve_error.clone(),
        mesh_error: def.mesh_error.clone(),
        integral_error: def.integral_error.clone(),
        lock_geometry_after: def.lock_geometry_after,
        ..SimFaults::default()
    }
}

pub fn build_engine(engine: &EngineDef) -> SimEngine {
    match engine.backend {
        BackendKind::Simulated => {
            let sim = &engine.simulated;
            SimEngine::new(build_model(sim), build_dialect(&sim.dialect))
                .with_faults(build_faults(&sim.faults))
                .with_coupling(sim.coupling)
        }
    }
}

pub fn session_options(sweep: &SweepDef) -> SessionOptions {
    SessionOptions {
        solve: SolvePolicy {
            poll_interval: Duration::from_secs_f64(sweep.solve.poll_interval_s),
            max_polls: sweep.solve.max_polls,
        },
        lenient_result_lookup: sweep.lenient_result_lookup,
        ..SessionOptions::default()
    }
}

/// Build the engine described by `engine` and open a session on it.
pub fn open_session(
    engine: &EngineDef,
    problem: Option<&Path>,
    model: Option<&Path>,
    options: SessionOptions,
) -> AppResult<EngineSession> {
    let sim = build_engine(engine);
    let session = Session::open(sim.app(), problem, model, options).map_err(AppError::from)?;
    info!(backend = ?engine.backend, "engine ready");
    Ok(EngineSession { engine: sim, session })
}

/// Open a session for a loaded sweep configuration.
pub fn open_for_config(config: &SweepConfig) -> AppResult<EngineSession> {
    open_session(
        &config.engine,
        config.engine.problem.as_deref(),
        config.engine.model.as_deref(),
        session_options(&config.sweep),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_then_overrides() {
        let def = DialectDef {
            preset: DialectPreset::Legacy,
            solve_method: Some(SolveMethodDef::SolveProblem),
            busy_polls: Some(0),
            ..DialectDef::default()
        };
        let d = build_dialect(&def);
        assert_eq!(d.solve_method, SolveMethod::SolveProblem);
        assert_eq!(d.busy_polls, 0);
        assert_eq!(d.bounds, BoundsStyle::VerticesOnly);
        assert!(!d.vector_integrals);
    }

    #[test]
    fn model_fixture_blocks_and_labels() {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("Loading".to_string(), 100.0);
        let def = SimulatedEngineDef {
            blocks: vec![SimBlockDef {
                label: "core".to_string(),
                rect: [1.0, 1.0, 0.0, 0.0],
            }],
            labels: vec![SimLabelDef {
                name: "coil".to_string(),
                at: Some([0.5, 0.5]),
                fields,
            }],
            ..SimulatedEngineDef::default()
        };
        let model = build_model(&def);
        assert_eq!(model.blocks.len(), 1);
        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.labels[0].content.get("Loading"), Some(&100.0));
    }
}
