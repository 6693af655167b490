//! Deterministic in-memory field-simulation engine.
//!
//! `SimEngine` exposes the same late-bound object model as a real
//! installation. A `SimDialect` decides which call shapes each member accepts
//! and `SimFaults` injects failures, so every fallback path of the adapter can
//! be exercised without the real host. The engine does no physics: an
//! integral is `coupling * total Loading * contour centroid`.

mod dialect;
mod objects;
mod state;

use std::cell::RefCell;
use std::rc::Rc;

use fs_core::{Point2, Real, Rect};

pub use dialect::{
    BoundsStyle, ContourAdd, EntityMove, FieldBinding, LabeledLookup, MeshArgs, MeshTarget,
    RectSelection, SelectionMove, SimDialect, SimFaults, SolveMethod,
};
pub use objects::TRANSIENT_AIR_MESSAGE;
pub use state::{SimBlock, SimLabel, SimModel, SimStats};

use objects::{Kind, Shared, SimObject};
use state::SimState;

use crate::variant::ObjectRef;

/// Handle to one simulated installation.
///
/// Clones share the same engine state.
#[derive(Clone)]
pub struct SimEngine {
    state: Shared,
}

impl SimEngine {
    pub fn new(model: SimModel, dialect: SimDialect) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new(model, dialect))),
        }
    }

    pub fn with_faults(self, faults: SimFaults) -> Self {
        self.state.borrow_mut().faults = faults;
        self
    }

    /// Scale factor of the integral.
    pub fn with_coupling(self, coupling: Real) -> Self {
        self.state.borrow_mut().coupling = coupling;
        self
    }

    /// The application object, root of the automation surface.
    pub fn app(&self) -> ObjectRef {
        SimObject::object(&self.state, Kind::App)
    }

    pub fn stats(&self) -> SimStats {
        self.state.borrow().stats.clone()
    }

    pub fn set_faults(&self, faults: SimFaults) {
        self.state.borrow_mut().faults = faults;
    }

    pub fn set_dialect(&self, dialect: SimDialect) {
        self.state.borrow_mut().dialect = dialect;
    }

    /// Snapshot of the geometry and labels.
    pub fn model(&self) -> SimModel {
        self.state.borrow().model.clone()
    }

    /// Union of the bounding boxes of blocks labelled `label`.
    pub fn label_bounds(&self, label: &str) -> Option<Rect> {
        let s = self.state.borrow();
        let rects: Vec<Rect> = s
            .blocks_labeled(label)
            .into_iter()
            .filter_map(|b| s.block_rect(b))
            .collect();
        Rect::union_all(&rects)
    }

    pub fn vertex_positions(&self) -> Vec<Point2> {
        self.state.borrow().model.vertices.clone()
    }

    pub fn label_field(&self, label: &str, field: &str) -> Option<Real> {
        self.state
            .borrow()
            .model
            .labels
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(label))
            .and_then(|l| l.content.get(field).copied())
    }

    pub fn mesh_built(&self) -> bool {
        self.state.borrow().mesh_built
    }

    pub fn contour(&self) -> Vec<String> {
        self.state.borrow().contour.clone()
    }

    /// Expected integral for a contour around `labels` in the current
    /// geometry, independent of the automation surface.
    pub fn expected_integral(&self, labels: &[&str]) -> Option<Point2> {
        let mut s = self.state.borrow_mut();
        let contour = labels.iter().map(|l| l.to_string()).collect();
        let saved = std::mem::replace(&mut s.contour, contour);
        let v = s.integral();
        s.contour = saved;
        v
    }
}
