//! Sweep configuration and action plan schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    pub version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub engine: EngineDef,
    pub sweep: SweepDef,
    #[serde(default)]
    pub output: OutputDef,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EngineDef {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    #[serde(default)]
    pub simulated: SimulatedEngineDef,
}

/// In-memory fixture served by the simulated backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatedEngineDef {
    #[serde(default)]
    pub blocks: Vec<SimBlockDef>,
    #[serde(default)]
    pub labels: Vec<SimLabelDef>,
    #[serde(default)]
    pub dialect: DialectDef,
    #[serde(default)]
    pub faults: FaultsDef,
    #[serde(default = "default_coupling")]
    pub coupling: f64,
}

impl Default for SimulatedEngineDef {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            labels: Vec::new(),
            dialect: DialectDef::default(),
            faults: FaultsDef::default(),
            coupling: default_coupling(),
        }
    }
}

fn default_coupling() -> f64 {
    1.0
}

/// A rectangular block, `rect` as `[left, bottom, right, top]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimBlockDef {
    pub label: String,
    pub rect: [f64; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimLabelDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<[f64; 2]>,
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialectPreset {
    #[default]
    Standard,
    Legacy,
}

/// Call-shape profile: a preset plus per-member overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DialectDef {
    #[serde(default)]
    pub preset: DialectPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_move: Option<EntityMoveDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_move: Option<SelectionMoveDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundsStyleDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect_selection: Option<RectSelectionDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_lookup: Option<LabeledLookupDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_target: Option<MeshTargetDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_args: Option<MeshArgsDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solve_method: Option<SolveMethodDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contour_add: Option<ContourAddDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_binding: Option<FieldBindingDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_integrals: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_integral_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_polls: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels_on_data_doc: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityMoveDef {
    Vector,
    Scalars,
    Interactive,
    PointAssign,
    PointFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMoveDef {
    OriginVector,
    Vector,
    Scalars,
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundsStyleDef {
    Direct,
    Dimensions,
    VerticesOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RectSelectionDef {
    PointPair,
    Scalars,
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LabeledLookupDef {
    OneArg,
    ThreeArgs,
    Unsupported,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeshTargetDef {
    Shapes,
    Model,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MeshArgsDef {
    TwoFlags,
    OneFlag,
    NoArgs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolveMethodDef {
    SolveProblem,
    Solve,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContourAddDef {
    AddBlock1,
    AddBlock,
    AddBlock2,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldBindingDef {
    Property,
    Method,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FaultsDef {
    #[serde(default)]
    pub transient_solve_failures: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solve_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integral_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_geometry_after: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaseModeDef {
    #[default]
    All,
    Paired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepDef {
    #[serde(default = "default_field")]
    pub field: String,
    /// Value expression, `label=v1,v2; label2=v3`.
    #[serde(default)]
    pub values: String,
    #[serde(default)]
    pub mode: CaseModeDef,
    #[serde(default)]
    pub move_labels: Vec<String>,
    /// Regions integrated over; empty means the moving labels.
    #[serde(default)]
    pub contour_labels: Vec<String>,
    #[serde(default)]
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub step: f64,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<OutputSpecDef>,
    #[serde(default)]
    pub mesh: MeshDef,
    #[serde(default)]
    pub settle_s: f64,
    #[serde(default)]
    pub solve: SolveDef,
    #[serde(default)]
    pub lenient_result_lookup: bool,
    /// Version 0: the single label whose current is swept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_label: Option<String>,
    /// Version 0: the swept currents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currents: Option<Vec<f64>>,
}

impl SweepDef {
    pub fn effective_contour_labels(&self) -> &[String] {
        if self.contour_labels.is_empty() {
            &self.move_labels
        } else {
            &self.contour_labels
        }
    }
}

pub fn default_field() -> String {
    "Loading".to_string()
}

fn default_outputs() -> Vec<OutputSpecDef> {
    vec![OutputSpecDef {
        integral: IntegralRef::Name("MaxwellForce".to_string()),
        name: None,
    }]
}

/// An integral given by numeric id or by known name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IntegralRef {
    Id(i32),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSpecDef {
    pub integral: IntegralRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Meshing cadence. `mesh_once_per_case` wins over `mesh_each_position`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MeshDef {
    #[serde(default = "default_true")]
    pub remesh: bool,
    #[serde(default = "default_true")]
    pub mesh_each_position: bool,
    #[serde(default)]
    pub mesh_once_per_case: bool,
}

impl Default for MeshDef {
    fn default() -> Self {
        Self {
            remesh: true,
            mesh_each_position: true,
            mesh_once_per_case: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SolveDef {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_s: f64,
    #[serde(default = "default_max_polls")]
    pub max_polls: usize,
}

impl Default for SolveDef {
    fn default() -> Self {
        Self {
            poll_interval_s: default_poll_interval(),
            max_polls: default_max_polls(),
        }
    }
}

fn default_poll_interval() -> f64 {
    0.5
}

fn default_max_polls() -> usize {
    600
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub store_runs: bool,
}

impl Default for OutputDef {
    fn default() -> Self {
        Self {
            csv: None,
            store_runs: true,
        }
    }
}

/// Geometry-editing plan executed once against a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionPlan {
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub rebuild_each_action: bool,
    #[serde(default = "default_true")]
    pub rebuild_at_end: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_model_as: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbm: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
    #[serde(default)]
    pub use_active_problem: bool,
}

/// One label or a list of labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LabelList {
    One(String),
    Many(Vec<String>),
}

impl LabelList {
    /// Trimmed, non-empty names. A single string may be comma separated.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            LabelList::One(s) => s.split(',').collect(),
            LabelList::Many(v) => v.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for LabelList {
    fn default() -> Self {
        LabelList::Many(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionDef {
    #[serde(alias = "move_shapes")]
    MoveShape {
        #[serde(alias = "label", default)]
        labels: LabelList,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    MoveVertices {
        #[serde(alias = "label", default)]
        labels: LabelList,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    MoveBlockLabels {
        #[serde(alias = "label", default)]
        labels: LabelList,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    MoveVerticesByBlockLabel {
        #[serde(alias = "labels", default)]
        label: LabelList,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    MoveVerticesInRect {
        rect: [f64; 4],
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    MoveBlocksInRect {
        rect: [f64; 4],
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    AddRectWithBlockLabel {
        rect: [f64; 4],
        #[serde(default)]
        inset: f64,
        label: String,
    },
}

fn default_epsilon() -> f64 {
    1e-6
}

impl ActionDef {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionDef::MoveShape { .. } => "move_shape",
            ActionDef::MoveVertices { .. } => "move_vertices",
            ActionDef::MoveBlockLabels { .. } => "move_block_labels",
            ActionDef::MoveVerticesByBlockLabel { .. } => "move_vertices_by_block_label",
            ActionDef::MoveVerticesInRect { .. } => "move_vertices_in_rect",
            ActionDef::MoveBlocksInRect { .. } => "move_blocks_in_rect",
            ActionDef::AddRectWithBlockLabel { .. } => "add_rect_with_block_label",
        }
    }
}
