//! Automation objects of the simulated engine.
//!
//! Every object is a `(kind, shared state)` pair. Arguments that are
//! themselves host objects are read before the state is borrowed, since
//! reading them may touch the same state.

use std::cell::RefCell;
use std::rc::Rc;

use fs_core::{Point2, Real, Rect};

use super::dialect::{
    BoundsStyle, EntityMove, FieldBinding, LabeledLookup, MeshArgs, MeshTarget, RectSelection,
    SelectionMove, SolveMethod,
};
use super::state::SimState;
use crate::dispatch::AutomationObject;
use crate::error::{DispatchError, DispatchResult};
use crate::variant::{ObjectRef, Variant};

pub(crate) type Shared = Rc<RefCell<SimState>>;

/// Message of the transient mesh failure raised by injected faults.
pub const TRANSIENT_AIR_MESSAGE: &str = "Region 'Air' has no mesh";

#[derive(Clone, Debug)]
pub(crate) enum Kind {
    App,
    Problems,
    Models,
    Problem,
    DataDoc,
    Model,
    Shapes,
    Blocks,
    /// A range of blocks (a selection).
    Selection(Vec<usize>),
    /// A range of vertices.
    VertexRange(Vec<usize>),
    Block(usize),
    Dimensions(Rect),
    Vertex(usize),
    VertexPoint(usize),
    /// A detached point or vector value.
    Point(Point2),
    Labels,
    Label(usize),
    LabelPoint(usize),
    Content(usize),
    Result,
    ResultBlocks,
    ResultBlock(String),
    FieldWindow,
    Contour,
    IntegralValue(IntegralData),
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum IntegralData {
    Scalar(Real),
    Vector(Point2),
}

pub(crate) struct SimObject {
    kind: Kind,
    state: Shared,
}

fn number(v: &Variant) -> Option<Real> {
    match v {
        Variant::Real(x) => Some(*x),
        Variant::Int(i) => Some(*i as Real),
        _ => None,
    }
}

fn point_arg(v: &Variant) -> Option<Point2> {
    let obj = v.as_object()?;
    let x = obj.get("X").ok()?.as_f64()?;
    let y = obj.get("Y").ok()?.as_f64()?;
    Some(Point2::new(x, y))
}

/// Position of a vertex object or point value passed as an argument.
fn vertex_arg(v: &Variant) -> Option<Point2> {
    let obj = v.as_object()?;
    match obj.get("Point") {
        Ok(p) => point_arg(&p),
        Err(_) => point_arg(v),
    }
}

fn index_arg(args: &[Variant]) -> Option<usize> {
    match args {
        [i] => i.as_i64().filter(|&i| i >= 1).map(|i| (i - 1) as usize),
        _ => None,
    }
}

fn text_arg(args: &[Variant], at: usize) -> Option<String> {
    args.get(at).and_then(Variant::as_str).map(str::to_string)
}

enum EntityDelta {
    Shift(Point2),
    Noop,
}

fn entity_delta(style: EntityMove, args: &[Variant]) -> Option<EntityDelta> {
    match (style, args) {
        (EntityMove::Vector, [v @ Variant::Object(_)]) => point_arg(v).map(EntityDelta::Shift),
        (EntityMove::Scalars, [a, b]) => {
            Some(EntityDelta::Shift(Point2::new(number(a)?, number(b)?)))
        }
        (EntityMove::Interactive, []) => Some(EntityDelta::Noop),
        _ => None,
    }
}

fn selection_delta(style: SelectionMove, args: &[Variant]) -> Option<Point2> {
    match (style, args) {
        (SelectionMove::OriginVector, [origin, v @ Variant::Object(_)])
            if number(origin) == Some(0.0) =>
        {
            point_arg(v)
        }
        (SelectionMove::Vector, [v @ Variant::Object(_)]) => point_arg(v),
        (SelectionMove::Scalars, [a, b]) => Some(Point2::new(number(a)?, number(b)?)),
        _ => None,
    }
}

fn rect_arg(style: RectSelection, args: &[Variant]) -> Option<Rect> {
    match (style, args) {
        (RectSelection::PointPair, [a @ Variant::Object(_), b @ Variant::Object(_)]) => {
            let (a, b) = (point_arg(a)?, point_arg(b)?);
            Some(Rect::from_corners(a.x, a.y, b.x, b.y))
        }
        (RectSelection::Scalars, [a, b, c, d]) => Some(Rect::from_corners(
            number(a)?,
            number(b)?,
            number(c)?,
            number(d)?,
        )),
        _ => None,
    }
}

impl SimObject {
    pub(crate) fn object(state: &Shared, kind: Kind) -> ObjectRef {
        Rc::new(SimObject {
            kind,
            state: Rc::clone(state),
        })
    }

    fn child(&self, kind: Kind) -> Variant {
        Variant::Object(Self::object(&self.state, kind))
    }

    fn unknown(&self, member: &str) -> DispatchError {
        DispatchError::unknown(self.type_name(), member)
    }

    fn bad_args(&self, member: &str, detail: &str) -> DispatchError {
        DispatchError::bad_args(self.type_name(), member, detail)
    }

    fn raised(&self, member: &str, message: impl Into<String>) -> DispatchError {
        DispatchError::raised(self.type_name(), member, message)
    }

    fn all_blocks(&self) -> Vec<usize> {
        (0..self.state.borrow().model.blocks.len()).collect()
    }

    fn all_vertices(&self) -> Vec<usize> {
        (0..self.state.borrow().model.vertices.len()).collect()
    }

    fn item_of(
        &self,
        ids: &[usize],
        args: &[Variant],
        make: impl Fn(usize) -> Kind,
    ) -> DispatchResult<Variant> {
        match index_arg(args).and_then(|i| ids.get(i)) {
            Some(&id) => Ok(self.child(make(id))),
            None => Err(self.raised("Item", "index out of range")),
        }
    }

    fn move_vertices(
        &self,
        member: &str,
        vertices: &[usize],
        delta: Point2,
    ) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        s.begin_move().map_err(|m| self.raised(member, m))?;
        s.translate(vertices, delta.x, delta.y);
        Ok(Variant::Empty)
    }

    fn move_selection(&self, blocks: &[usize], args: &[Variant]) -> DispatchResult<Variant> {
        let style = self.state.borrow().dialect.selection_move;
        if style == SelectionMove::Unsupported {
            return Err(self.unknown("Move"));
        }
        let delta = selection_delta(style, args)
            .ok_or_else(|| self.bad_args("Move", "unsupported argument shape"))?;
        let vertices = self.state.borrow().block_vertices(blocks);
        self.move_vertices("Move", &vertices, delta)
    }

    fn move_vertex_range(&self, vertices: &[usize], args: &[Variant]) -> DispatchResult<Variant> {
        let style = self.state.borrow().dialect.selection_move;
        if style == SelectionMove::Unsupported {
            return Err(self.unknown("Move"));
        }
        let delta = selection_delta(style, args)
            .ok_or_else(|| self.bad_args("Move", "unsupported argument shape"))?;
        self.move_vertices("Move", vertices, delta)
    }

    fn in_rectangle(&self, args: &[Variant]) -> DispatchResult<Rect> {
        let style = self.state.borrow().dialect.rect_selection;
        if style == RectSelection::Unsupported {
            return Err(self.unknown("InRectangle"));
        }
        rect_arg(style, args)
            .ok_or_else(|| self.bad_args("InRectangle", "unsupported argument shape"))
    }

    fn entity_move_style(&self) -> DispatchResult<EntityMove> {
        let style = self.state.borrow().dialect.entity_move;
        match style {
            EntityMove::PointAssign | EntityMove::PointFields => Err(self.unknown("Move")),
            other => Ok(other),
        }
    }

    fn move_entity(
        &self,
        args: &[Variant],
        apply: impl FnOnce(&mut SimState, Point2),
    ) -> DispatchResult<Variant> {
        let style = self.entity_move_style()?;
        let delta = entity_delta(style, args)
            .ok_or_else(|| self.bad_args("Move", "unsupported argument shape"))?;
        let mut s = self.state.borrow_mut();
        s.begin_move().map_err(|m| self.raised("Move", m))?;
        if let EntityDelta::Shift(d) = delta {
            apply(&mut *s, d);
        }
        Ok(Variant::Empty)
    }

    fn build_mesh(&self, target: MeshTarget, args: &[Variant]) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        if s.dialect.mesh_target != target {
            return Err(self.unknown("BuildMesh"));
        }
        let accepted = matches!(
            (s.dialect.mesh_args, args),
            (MeshArgs::TwoFlags, [Variant::Bool(_), Variant::Bool(_)])
                | (MeshArgs::OneFlag, [Variant::Bool(_)])
                | (MeshArgs::NoArgs, [])
        );
        if !accepted {
            return Err(self.bad_args("BuildMesh", "unsupported argument shape"));
        }
        if let Some(message) = s.faults.mesh_error.clone() {
            return Err(self.raised("BuildMesh", message));
        }
        s.mesh_built = true;
        s.stats.mesh_builds += 1;
        Ok(Variant::Empty)
    }

    fn remove_mesh(&self, target: MeshTarget) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        if s.dialect.mesh_target != target {
            return Err(self.unknown("RemoveMesh"));
        }
        s.mesh_built = false;
        s.solved = false;
        s.stats.mesh_removals += 1;
        Ok(Variant::Empty)
    }

    fn solve(&self, member: &str) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        let method = match s.dialect.solve_method {
            SolveMethod::SolveProblem => "SolveProblem",
            SolveMethod::Solve => "Solve",
        };
        if member != method {
            return Err(self.unknown(member));
        }
        s.stats.solve_calls += 1;
        if let Some(message) = s.faults.solve_error.clone() {
            return Err(self.raised(member, message));
        }
        // The transient failure is reported after the solver has run.
        s.solved = true;
        s.busy_remaining = s.dialect.busy_polls;
        if s.faults.transient_solve_failures > 0 {
            s.faults.transient_solve_failures -= 1;
            return Err(self.raised(member, TRANSIENT_AIR_MESSAGE));
        }
        s.mesh_built = true;
        s.stats.solves_completed += 1;
        Ok(Variant::Empty)
    }

    fn rebuild(&self) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        s.stats.rebuilds += 1;
        s.close_pending_ring();
        Ok(Variant::Empty)
    }

    fn save_as(&self, args: &[Variant]) -> DispatchResult<Variant> {
        let path = text_arg(args, 0).ok_or_else(|| self.bad_args("SaveAs", "expected a path"))?;
        self.state.borrow_mut().stats.saved_as = Some(path);
        Ok(Variant::Empty)
    }

    fn save(&self) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        if let Some(message) = s.faults.save_error.clone() {
            return Err(self.raised("Save", message));
        }
        match self.kind {
            Kind::DataDoc => s.stats.data_doc_saves += 1,
            _ => s.stats.problem_saves += 1,
        }
        Ok(Variant::Empty)
    }

    fn labels(&self, args: &[Variant]) -> DispatchResult<Variant> {
        match args {
            [kind] if kind.as_i64() == Some(3) => Ok(self.child(Kind::Labels)),
            _ => Err(self.bad_args("Labels", "expected label type 3")),
        }
    }

    fn labeled_blocks(&self, label: &str) -> Vec<usize> {
        self.state.borrow().blocks_labeled(label)
    }

    fn integral(&self, args: &[Variant]) -> DispatchResult<Variant> {
        if args.is_empty() || args.len() > 2 || args[0].as_i64().is_none() {
            return Err(self.bad_args("GetIntegral", "expected (id[, contour])"));
        }
        let mut s = self.state.borrow_mut();
        s.stats.integrals += 1;
        if let Some(message) = s.faults.integral_error.clone() {
            return Err(self.raised("GetIntegral", message));
        }
        if !s.solved {
            return Err(self.raised("GetIntegral", "no solution available"));
        }
        let v = s.integral().ok_or_else(|| self.raised("GetIntegral", "contour is empty"))?;
        let data = if s.dialect.vector_integrals {
            IntegralData::Vector(v)
        } else {
            IntegralData::Scalar(v.x)
        };
        let wrap = s.dialect.wrap_integral_value;
        drop(s);
        Ok(match (wrap, data) {
            (true, data) => self.child(Kind::IntegralValue(data)),
            (false, IntegralData::Vector(v)) => self.child(Kind::Point(v)),
            (false, IntegralData::Scalar(x)) => Variant::Real(x),
        })
    }

    fn set_field(&self, label: usize, field: &str, value: Real) -> DispatchResult<Variant> {
        let mut s = self.state.borrow_mut();
        let Some(l) = s.model.labels.get_mut(label) else {
            return Err(self.raised(field, "label removed"));
        };
        l.content.insert(field.to_string(), value);
        s.stats.field_writes += 1;
        s.invalidate();
        Ok(Variant::Empty)
    }
}

impl AutomationObject for SimObject {
    fn type_name(&self) -> &str {
        match &self.kind {
            Kind::App => "Application",
            Kind::Problems => "Problems",
            Kind::Models => "Models",
            Kind::Problem => "Problem",
            Kind::DataDoc => "DataDoc",
            Kind::Model => "Model",
            Kind::Shapes => "Shapes",
            Kind::Blocks => "Blocks",
            Kind::Selection(_) => "ShapeRange",
            Kind::VertexRange(_) => "VertexRange",
            Kind::Block(_) => "Block",
            Kind::Dimensions(_) => "Dimensions",
            Kind::Vertex(_) => "Vertex",
            Kind::VertexPoint(_) | Kind::LabelPoint(_) | Kind::Point(_) => "Point",
            Kind::Labels => "Labels",
            Kind::Label(_) => "Label",
            Kind::Content(_) => "LabelContent",
            Kind::Result => "Result",
            Kind::ResultBlocks => "ResultBlocks",
            Kind::ResultBlock(_) => "ResultBlock",
            Kind::FieldWindow => "FieldWindow",
            Kind::Contour => "Contour",
            Kind::IntegralValue(_) => "IntegralValue",
        }
    }

    fn get(&self, member: &str) -> DispatchResult<Variant> {
        match (&self.kind, member) {
            (Kind::App, "ActiveProblem") => {
                if self.state.borrow().faults.no_active_problem {
                    Ok(Variant::Empty)
                } else {
                    Ok(self.child(Kind::Problem))
                }
            }
            (Kind::App, "Problems") => Ok(self.child(Kind::Problems)),
            (Kind::App | Kind::Problem, "Models") => Ok(self.child(Kind::Models)),

            (Kind::Problem, "Model") => {
                let s = self.state.borrow();
                if s.model_loaded && !s.faults.model_missing {
                    drop(s);
                    Ok(self.child(Kind::Model))
                } else {
                    Ok(Variant::Empty)
                }
            }
            (Kind::Problem, "DataDoc") => {
                if self.state.borrow().dialect.labels_on_data_doc {
                    Ok(self.child(Kind::DataDoc))
                } else {
                    Err(self.unknown(member))
                }
            }
            (Kind::Problem, "IsBusy") => {
                let mut s = self.state.borrow_mut();
                if s.busy_remaining > 0 {
                    s.busy_remaining -= 1;
                    s.stats.busy_polls += 1;
                    Ok(Variant::Bool(true))
                } else {
                    Ok(Variant::Bool(false))
                }
            }
            (Kind::Problem, "Result") => {
                if self.state.borrow().solved {
                    Ok(self.child(Kind::Result))
                } else {
                    Ok(Variant::Empty)
                }
            }

            (Kind::Model, "Shapes") => Ok(self.child(Kind::Shapes)),
            (Kind::Model, "Selection") => Ok(self.child(Kind::Selection(self.all_blocks()))),

            (Kind::Shapes, "Blocks") => Ok(self.child(Kind::Blocks)),
            (Kind::Shapes, "Vertices") => Ok(self.child(Kind::VertexRange(self.all_vertices()))),
            (Kind::Shapes | Kind::Blocks, "Count") => {
                Ok(Variant::Int(self.all_blocks().len() as i64))
            }

            (Kind::Selection(ids), "Count") => Ok(Variant::Int(ids.len() as i64)),
            (Kind::Selection(ids), "Blocks") => Ok(self.child(Kind::Selection(ids.clone()))),
            (Kind::Selection(ids), "Vertices") => {
                let vertices = self.state.borrow().block_vertices(ids);
                Ok(self.child(Kind::VertexRange(vertices)))
            }
            (Kind::VertexRange(ids), "Count") => Ok(Variant::Int(ids.len() as i64)),

            (Kind::Block(id), "Label") => {
                let s = self.state.borrow();
                s.model
                    .blocks
                    .get(*id)
                    .map(|b| Variant::Str(b.label.clone()))
                    .ok_or_else(|| self.raised(member, "block removed"))
            }
            (Kind::Block(id), "Vertices") => {
                let ring = self.state.borrow().block_vertices(&[*id]);
                Ok(self.child(Kind::VertexRange(ring)))
            }
            (Kind::Block(id), "Left" | "Bottom" | "Right" | "Top" | "Dimensions") => {
                let s = self.state.borrow();
                let rect = s
                    .block_rect(*id)
                    .ok_or_else(|| self.raised(member, "block has no vertices"))?;
                match (s.dialect.bounds, member) {
                    (BoundsStyle::Direct, "Left") => Ok(Variant::Real(rect.left)),
                    (BoundsStyle::Direct, "Bottom") => Ok(Variant::Real(rect.bottom)),
                    (BoundsStyle::Direct, "Right") => Ok(Variant::Real(rect.right)),
                    (BoundsStyle::Direct, "Top") => Ok(Variant::Real(rect.top)),
                    (BoundsStyle::Dimensions, "Dimensions") => {
                        drop(s);
                        Ok(self.child(Kind::Dimensions(rect)))
                    }
                    _ => Err(self.unknown(member)),
                }
            }
            (Kind::Dimensions(r), "Left") => Ok(Variant::Real(r.left)),
            (Kind::Dimensions(r), "Bottom") => Ok(Variant::Real(r.bottom)),
            (Kind::Dimensions(r), "Right") => Ok(Variant::Real(r.right)),
            (Kind::Dimensions(r), "Top") => Ok(Variant::Real(r.top)),

            (Kind::Vertex(id), "Point") => Ok(self.child(Kind::VertexPoint(*id))),
            (Kind::VertexPoint(id), "X" | "Y") => {
                let s = self.state.borrow();
                let p = s
                    .model
                    .vertices
                    .get(*id)
                    .ok_or_else(|| self.raised(member, "vertex removed"))?;
                Ok(Variant::Real(if member == "X" { p.x } else { p.y }))
            }
            (Kind::LabelPoint(id), "X" | "Y") => {
                let s = self.state.borrow();
                let p = s
                    .model
                    .labels
                    .get(*id)
                    .and_then(|l| l.marker)
                    .ok_or_else(|| self.raised(member, "label has no marker"))?;
                Ok(Variant::Real(if member == "X" { p.x } else { p.y }))
            }
            (Kind::Point(p), "X") => Ok(Variant::Real(p.x)),
            (Kind::Point(p), "Y") => Ok(Variant::Real(p.y)),

            (Kind::Labels, "Count") => {
                Ok(Variant::Int(self.state.borrow().model.labels.len() as i64))
            }
            (Kind::Label(id), "Name") => {
                let s = self.state.borrow();
                s.model
                    .labels
                    .get(*id)
                    .map(|l| Variant::Str(l.name.clone()))
                    .ok_or_else(|| self.raised(member, "label removed"))
            }
            (Kind::Label(id), "Content") => Ok(self.child(Kind::Content(*id))),
            (Kind::Label(id), "Point") => {
                let has_marker = self
                    .state
                    .borrow()
                    .model
                    .labels
                    .get(*id)
                    .is_some_and(|l| l.marker.is_some());
                if has_marker {
                    Ok(self.child(Kind::LabelPoint(*id)))
                } else {
                    Ok(Variant::Empty)
                }
            }
            (Kind::Content(id), field) => {
                let s = self.state.borrow();
                s.model
                    .labels
                    .get(*id)
                    .and_then(|l| l.content.get(field).copied())
                    .map(Variant::Real)
                    .ok_or_else(|| self.unknown(field))
            }

            (Kind::Result, "Blocks") => Ok(self.child(Kind::ResultBlocks)),
            (Kind::ResultBlocks, "Count") => {
                Ok(Variant::Int(result_labels(&self.state).len() as i64))
            }
            (Kind::ResultBlock(label), "Label" | "Name") => Ok(Variant::Str(label.clone())),
            (Kind::FieldWindow, "Contour") => Ok(self.child(Kind::Contour)),
            (Kind::IntegralValue(IntegralData::Vector(v)), "Value") => {
                Ok(self.child(Kind::Point(*v)))
            }
            (Kind::IntegralValue(IntegralData::Scalar(x)), "Value") => Ok(Variant::Real(*x)),

            _ => Err(self.unknown(member)),
        }
    }

    fn put(&self, member: &str, value: Variant) -> DispatchResult<()> {
        match (&self.kind, member) {
            (Kind::Selection(_) | Kind::Block(_), "Label") => {
                let label = value
                    .as_str()
                    .ok_or_else(|| self.bad_args(member, "expected a string"))?
                    .to_string();
                let ids = ids_of(&self.kind);
                let mut s = self.state.borrow_mut();
                for id in ids {
                    if let Some(b) = s.model.blocks.get_mut(id) {
                        b.label = label.clone();
                    }
                }
                s.invalidate();
                Ok(())
            }
            (Kind::Vertex(id), "Point") => {
                if self.state.borrow().dialect.entity_move != EntityMove::PointAssign {
                    return Err(DispatchError::read_only(self.type_name(), member));
                }
                let target =
                    point_arg(&value).ok_or_else(|| self.bad_args(member, "expected a point"))?;
                let mut s = self.state.borrow_mut();
                s.begin_move().map_err(|m| self.raised(member, m))?;
                let current = s
                    .model
                    .vertices
                    .get(*id)
                    .copied()
                    .ok_or_else(|| self.raised(member, "vertex removed"))?;
                s.translate(&[*id], target.x - current.x, target.y - current.y);
                Ok(())
            }
            (Kind::VertexPoint(id), "X" | "Y") => {
                if self.state.borrow().dialect.entity_move != EntityMove::PointFields {
                    return Err(DispatchError::read_only(self.type_name(), member));
                }
                let v = number(&value).ok_or_else(|| self.bad_args(member, "expected a number"))?;
                let mut s = self.state.borrow_mut();
                if member == "X" {
                    s.begin_move().map_err(|m| self.raised(member, m))?;
                }
                let current = s
                    .model
                    .vertices
                    .get(*id)
                    .copied()
                    .ok_or_else(|| self.raised(member, "vertex removed"))?;
                let (dx, dy) = if member == "X" {
                    (v - current.x, 0.0)
                } else {
                    (0.0, v - current.y)
                };
                s.translate(&[*id], dx, dy);
                Ok(())
            }
            (Kind::Label(id), "Name") => {
                let name = value
                    .as_str()
                    .ok_or_else(|| self.bad_args(member, "expected a string"))?
                    .to_string();
                let mut s = self.state.borrow_mut();
                if let Some(l) = s.model.labels.get_mut(*id) {
                    l.name = name;
                }
                Ok(())
            }
            (Kind::Label(_), "Content") => {
                if value.as_object().is_some() {
                    Ok(())
                } else {
                    Err(self.bad_args(member, "expected a content object"))
                }
            }
            (Kind::Label(id), "Point") => {
                let p = point_arg(&value).ok_or_else(|| self.bad_args(member, "expected a point"))?;
                let mut s = self.state.borrow_mut();
                if let Some(l) = s.model.labels.get_mut(*id) {
                    l.marker = Some(p);
                }
                Ok(())
            }
            (Kind::LabelPoint(id), "X" | "Y") => {
                let v = number(&value).ok_or_else(|| self.bad_args(member, "expected a number"))?;
                let mut s = self.state.borrow_mut();
                let marker = s.model.labels.get_mut(*id).and_then(|l| l.marker.as_mut());
                match marker {
                    Some(p) if member == "X" => p.x = v,
                    Some(p) => p.y = v,
                    None => return Err(self.raised(member, "label has no marker")),
                }
                Ok(())
            }
            (Kind::Content(id), field) => {
                if self.state.borrow().dialect.field_binding != FieldBinding::Property {
                    return Err(DispatchError::read_only(self.type_name(), field));
                }
                let v = value.as_f64().ok_or_else(|| self.bad_args(field, "expected a number"))?;
                self.set_field(*id, field, v).map(|_| ())
            }
            (Kind::Point(_), _) => Err(DispatchError::read_only(self.type_name(), member)),
            _ => Err(self.unknown(member)),
        }
    }

    fn invoke(&self, member: &str, args: &[Variant]) -> DispatchResult<Variant> {
        match (&self.kind, member) {
            (Kind::App, "PointXY") => match args {
                [x, y] => Ok(self.child(Kind::Point(Point2::new(
                    x.as_f64().ok_or_else(|| self.bad_args(member, "x"))?,
                    y.as_f64().ok_or_else(|| self.bad_args(member, "y"))?,
                )))),
                _ => Err(self.bad_args(member, "expected (x, y)")),
            },
            (Kind::Problems, "Open") => {
                let path =
                    text_arg(args, 0).ok_or_else(|| self.bad_args(member, "expected a path"))?;
                self.state.borrow_mut().stats.opened_problem = Some(path);
                Ok(self.child(Kind::Problem))
            }
            (Kind::Models, "Open") => {
                let path =
                    text_arg(args, 0).ok_or_else(|| self.bad_args(member, "expected a path"))?;
                let mut s = self.state.borrow_mut();
                if s.faults.model_missing {
                    return Err(self.raised(member, format!("cannot open model {path}")));
                }
                s.model_loaded = true;
                s.stats.opened_model = Some(path);
                drop(s);
                Ok(self.child(Kind::Model))
            }

            (Kind::Problem, "LoadModel") => {
                let mut s = self.state.borrow_mut();
                if s.faults.model_missing {
                    return Err(self.raised(member, "model file not found"));
                }
                s.model_loaded = true;
                Ok(Variant::Empty)
            }
            (Kind::Problem | Kind::DataDoc, "Labels") => {
                if matches!(self.kind, Kind::Problem)
                    && self.state.borrow().dialect.labels_on_data_doc
                {
                    return Err(self.unknown(member));
                }
                self.labels(args)
            }
            (Kind::DataDoc | Kind::Problem, "Save") => self.save(),
            (Kind::Problem, "SolveProblem" | "Solve") => self.solve(member),
            (Kind::Problem, "AnalyzeResults") => {
                self.state.borrow_mut().stats.analyses += 1;
                Ok(Variant::Empty)
            }
            (Kind::Problem | Kind::Model, "Rebuild") => self.rebuild(),
            (Kind::Problem | Kind::Model, "SaveAs") => self.save_as(args),

            (Kind::Model, "BuildMesh") => self.build_mesh(MeshTarget::Model, args),
            (Kind::Model, "RemoveMesh") => self.remove_mesh(MeshTarget::Model),
            (Kind::Shapes, "BuildMesh") => self.build_mesh(MeshTarget::Shapes, args),
            (Kind::Shapes, "RemoveMesh") => self.remove_mesh(MeshTarget::Shapes),

            (Kind::Shapes, "AddVertexXY") => match args {
                [x, y] => {
                    let p = Point2::new(
                        number(x).ok_or_else(|| self.bad_args(member, "x"))?,
                        number(y).ok_or_else(|| self.bad_args(member, "y"))?,
                    );
                    let id = self.state.borrow_mut().model.vertex_at(p);
                    Ok(self.child(Kind::Vertex(id)))
                }
                _ => Err(self.bad_args(member, "expected (x, y)")),
            },
            (Kind::Shapes, "AddEdge") => match args {
                [a, b] => {
                    let (a, b) = (
                        vertex_arg(a).ok_or_else(|| self.bad_args(member, "expected vertices"))?,
                        vertex_arg(b).ok_or_else(|| self.bad_args(member, "expected vertices"))?,
                    );
                    let mut s = self.state.borrow_mut();
                    let (ia, ib) = (s.model.vertex_at(a), s.model.vertex_at(b));
                    s.pending_edges.push((ia, ib));
                    Ok(Variant::Empty)
                }
                _ => Err(self.bad_args(member, "expected (v1, v2)")),
            },

            (Kind::Shapes | Kind::Blocks, "Item" | "") => {
                self.item_of(&self.all_blocks(), args, Kind::Block)
            }
            (Kind::Shapes, "LabeledAs") => match args {
                [Variant::Str(label)] => {
                    Ok(self.child(Kind::Selection(self.labeled_blocks(label))))
                }
                _ => Err(self.bad_args(member, "expected (label)")),
            },
            (Kind::Blocks, "LabeledAs" | "GetLabeledAs") => {
                let style = self.state.borrow().dialect.labeled_lookup;
                let label = match (style, args) {
                    (LabeledLookup::OneArg, [Variant::Str(l)]) => l,
                    (LabeledLookup::ThreeArgs, [_, _, Variant::Str(l)]) => l,
                    (LabeledLookup::Unsupported, _) => return Err(self.unknown(member)),
                    _ => return Err(self.bad_args(member, "unsupported argument shape")),
                };
                Ok(self.child(Kind::Selection(self.labeled_blocks(label))))
            }
            (Kind::Shapes | Kind::Blocks, "InRectangle") => {
                let rect = self.in_rectangle(args)?;
                let picked = self.state.borrow().blocks_in_rect(&self.all_blocks(), rect);
                Ok(self.child(Kind::Selection(picked)))
            }

            (Kind::Selection(ids), "Item" | "") => self.item_of(ids, args, Kind::Block),
            (Kind::Selection(ids), "LabeledAs") => match args {
                [Variant::Str(label)] => {
                    let wanted = self.labeled_blocks(label);
                    let kept = ids.iter().copied().filter(|b| wanted.contains(b)).collect();
                    Ok(self.child(Kind::Selection(kept)))
                }
                _ => Err(self.bad_args(member, "expected (label)")),
            },
            (Kind::Selection(ids), "InRectangle") => {
                let rect = self.in_rectangle(args)?;
                let picked = self.state.borrow().blocks_in_rect(ids, rect);
                Ok(self.child(Kind::Selection(picked)))
            }
            (Kind::Selection(ids), "Move") => self.move_selection(ids, args),
            (Kind::Block(id), "Move") => self.move_selection(&[*id], args),

            (Kind::VertexRange(ids), "Item" | "") => self.item_of(ids, args, Kind::Vertex),
            (Kind::VertexRange(ids), "InRectangle") => {
                let rect = self.in_rectangle(args)?;
                let picked = self.state.borrow().vertices_in_rect(ids, rect);
                Ok(self.child(Kind::VertexRange(picked)))
            }
            (Kind::VertexRange(ids), "Move") => self.move_vertex_range(ids, args),

            (Kind::Vertex(id), "Move") => {
                let id = *id;
                self.move_entity(args, |s, d| s.translate(&[id], d.x, d.y))
            }
            (Kind::Label(id), "Move") => {
                let id = *id;
                self.move_entity(args, |s, d| {
                    if let Some(p) = s.model.labels.get_mut(id).and_then(|l| l.marker.as_mut()) {
                        *p = p.offset(d.x, d.y);
                    }
                })
            }

            (Kind::Labels, "Item" | "") => {
                let ids: Vec<usize> = (0..self.state.borrow().model.labels.len()).collect();
                self.item_of(&ids, args, Kind::Label)
            }
            (Kind::Labels, "Add") => {
                let (at, name) = match args {
                    [p] => (point_arg(p), String::new()),
                    [p, Variant::Str(n)] => (point_arg(p), n.clone()),
                    _ => (None, String::new()),
                };
                let at = at.ok_or_else(|| self.bad_args(member, "expected (point[, name])"))?;
                let mut s = self.state.borrow_mut();
                s.model.labels.push(super::state::SimLabel {
                    name,
                    marker: Some(at),
                    content: Default::default(),
                });
                let id = s.model.labels.len() - 1;
                drop(s);
                Ok(self.child(Kind::Label(id)))
            }

            (Kind::Content(id), field) => {
                let binding = self.state.borrow().dialect.field_binding;
                match (binding, args) {
                    (_, []) => self.get(field),
                    (FieldBinding::Method, [v]) => {
                        let v = v
                            .as_f64()
                            .ok_or_else(|| self.bad_args(field, "expected a number"))?;
                        self.set_field(*id, field, v)
                    }
                    _ => Err(self.bad_args(field, "not a method")),
                }
            }

            (Kind::Result, "GetFieldWindow") => match args {
                [n] if n.as_i64().is_some() => Ok(self.child(Kind::FieldWindow)),
                _ => Err(self.bad_args(member, "expected (window)")),
            },
            (Kind::Result, "GetIntegral") => self.integral(args),
            (Kind::ResultBlocks, "Item" | "") => {
                let labels = result_labels(&self.state);
                match index_arg(args).and_then(|i| labels.get(i)) {
                    Some(l) => Ok(self.child(Kind::ResultBlock(l.clone()))),
                    None => Err(self.raised(member, "index out of range")),
                }
            }

            (Kind::Contour, "Clear") => {
                self.state.borrow_mut().contour.clear();
                Ok(Variant::Empty)
            }
            (Kind::Contour, "AddBlock1" | "AddBlock" | "AddBlock2") => {
                let mut s = self.state.borrow_mut();
                if s.dialect.contour_add.method() != member {
                    return Err(self.unknown(member));
                }
                let label = match args {
                    [Variant::Str(l)] => l.clone(),
                    _ => return Err(self.bad_args(member, "expected (label)")),
                };
                if s.blocks_labeled(&label).is_empty() {
                    return Err(self.raised(member, format!("no block labelled '{label}'")));
                }
                s.contour.push(label);
                Ok(Variant::Empty)
            }

            _ => Err(self.unknown(member)),
        }
    }
}

fn ids_of(kind: &Kind) -> Vec<usize> {
    match kind {
        Kind::Selection(ids) | Kind::VertexRange(ids) => ids.clone(),
        Kind::Block(id) => vec![*id],
        _ => Vec::new(),
    }
}

fn result_labels(state: &Shared) -> Vec<String> {
    let s = state.borrow();
    let mut out: Vec<String> = Vec::new();
    for b in &s.model.blocks {
        if !b.label.is_empty() && !out.iter().any(|l| l.eq_ignore_ascii_case(&b.label)) {
            out.push(b.label.clone());
        }
    }
    out
}
