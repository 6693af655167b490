//! Which call shapes a simulated installation accepts.

/// Accepted form of `Move` on vertices and label markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EntityMove {
    /// `Move(vector)`
    #[default]
    Vector,
    /// `Move(dx, dy)`
    Scalars,
    /// `Move()` is accepted but does nothing (an interactive drag).
    Interactive,
    /// No `Move`; the `Point` property may be reassigned.
    PointAssign,
    /// No `Move`; the point's `X`/`Y` fields are writable.
    PointFields,
}

/// Accepted form of `Move` on blocks and selections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMove {
    /// `Move(0, vector)`
    #[default]
    OriginVector,
    /// `Move(vector)`
    Vector,
    /// `Move(dx, dy)`
    Scalars,
    Unsupported,
}

/// How a block exposes its bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BoundsStyle {
    #[default]
    Direct,
    Dimensions,
    /// Only vertices; bounds must be derived.
    VerticesOnly,
}

/// Accepted form of `InRectangle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RectSelection {
    #[default]
    PointPair,
    Scalars,
    Unsupported,
}

/// Accepted form of `Blocks.LabeledAs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LabeledLookup {
    #[default]
    OneArg,
    ThreeArgs,
    Unsupported,
}

/// Object carrying `BuildMesh`/`RemoveMesh`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MeshTarget {
    #[default]
    Shapes,
    Model,
}

/// Accepted `BuildMesh` arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MeshArgs {
    #[default]
    TwoFlags,
    OneFlag,
    NoArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SolveMethod {
    #[default]
    SolveProblem,
    Solve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ContourAdd {
    #[default]
    AddBlock1,
    AddBlock,
    AddBlock2,
}

impl ContourAdd {
    pub fn method(self) -> &'static str {
        match self {
            ContourAdd::AddBlock1 => "AddBlock1",
            ContourAdd::AddBlock => "AddBlock",
            ContourAdd::AddBlock2 => "AddBlock2",
        }
    }
}

/// Whether label content fields are properties or setter methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FieldBinding {
    #[default]
    Property,
    Method,
}

/// The full call-shape profile of one simulated installation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimDialect {
    pub entity_move: EntityMove,
    pub selection_move: SelectionMove,
    pub bounds: BoundsStyle,
    pub rect_selection: RectSelection,
    pub labeled_lookup: LabeledLookup,
    pub mesh_target: MeshTarget,
    pub mesh_args: MeshArgs,
    pub solve_method: SolveMethod,
    pub contour_add: ContourAdd,
    pub field_binding: FieldBinding,
    /// Integrals return `X`/`Y` vectors rather than scalars.
    pub vector_integrals: bool,
    /// Integral results are wrapped in an object with a `Value` member.
    pub wrap_integral_value: bool,
    /// `IsBusy` reads `true` this many times after each solve.
    pub busy_polls: usize,
    /// Block labels live on `Problem.DataDoc` (otherwise only on the problem).
    pub labels_on_data_doc: bool,
}

impl Default for SimDialect {
    fn default() -> Self {
        Self {
            entity_move: EntityMove::default(),
            selection_move: SelectionMove::default(),
            bounds: BoundsStyle::default(),
            rect_selection: RectSelection::default(),
            labeled_lookup: LabeledLookup::default(),
            mesh_target: MeshTarget::default(),
            mesh_args: MeshArgs::default(),
            solve_method: SolveMethod::default(),
            contour_add: ContourAdd::default(),
            field_binding: FieldBinding::default(),
            vector_integrals: true,
            wrap_integral_value: true,
            busy_polls: 0,
            labels_on_data_doc: true,
        }
    }
}

impl SimDialect {
    /// A deliberately awkward installation: no atomic moves, no rectangle
    /// selection, derived bounds, method-bound fields, scalar integrals.
    pub fn legacy() -> Self {
        Self {
            entity_move: EntityMove::PointFields,
            selection_move: SelectionMove::Unsupported,
            bounds: BoundsStyle::VerticesOnly,
            rect_selection: RectSelection::Unsupported,
            labeled_lookup: LabeledLookup::Unsupported,
            mesh_target: MeshTarget::Model,
            mesh_args: MeshArgs::NoArgs,
            solve_method: SolveMethod::Solve,
            contour_add: ContourAdd::AddBlock2,
            field_binding: FieldBinding::Method,
            vector_integrals: false,
            wrap_integral_value: false,
            busy_polls: 2,
            labels_on_data_doc: false,
        }
    }
}

/// Failures injected into a simulated engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimFaults {
    /// The next N solve calls fail with the transient air-region mesh error.
    pub transient_solve_failures: usize,
    /// Every solve call fails with this message.
    pub solve_error: Option<String>,
    /// Every mesh build fails with this message.
    pub mesh_error: Option<String>,
    /// Every integral evaluation fails with this message.
    pub integral_error: Option<String>,
    /// Geometry refuses further moves after this many accepted move calls.
    pub lock_geometry_after: Option<usize>,
    /// `ActiveProblem` is empty.
    pub no_active_problem: bool,
    /// The problem has no model and `LoadModel` fails.
    pub model_missing: bool,
    /// Every `Save` call on the problem or its data document fails with this message.
    pub save_error: Option<String>,
}
