//! The narrow capability interface the sweep orchestrator drives.
//!
//! `Session` is the production implementation; tests substitute fakes.

use core::fmt;

pub use fs_core::IntegralKind;
use fs_core::{Real, Rect};

use crate::error::HostResult;

/// How a group move was carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveMethod {
    /// One atomic move of a rectangle selection, with the accepted call shape.
    Selection(&'static str),
    /// Per-vertex fallback over the labels' deduplicated vertices.
    Vertices,
}

impl fmt::Display for MoveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveMethod::Selection(shape) => write!(f, "selection {shape}"),
            MoveMethod::Vertices => write!(f, "vertices"),
        }
    }
}

/// Diagnostics for one group move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveReport {
    pub moved: usize,
    pub total: usize,
    pub method: MoveMethod,
}

/// What happened during one solve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveOutcome {
    /// A transient failure forced a mesh rebuild and a second solve call.
    pub retried: bool,
    /// Set when the retry hit the same transient failure and was tolerated.
    pub warning: Option<String>,
    /// Busy-flag polls observed before the host reported idle.
    pub polls: usize,
    /// Result analysis was triggered after solving.
    pub analyzed: bool,
}

/// One named axis (or the unnamed scalar) of an integral result.
#[derive(Clone, Debug, PartialEq)]
pub struct IntegralComponent {
    /// `X`, `Y`, `Z`, or empty for a scalar.
    pub name: String,
    pub value: Real,
}

impl IntegralComponent {
    pub fn scalar(value: Real) -> Self {
        Self {
            name: String::new(),
            value,
        }
    }

    pub fn axis(name: &str, value: Real) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }

    /// Column name for this component of `output`.
    pub fn column(&self, output: &str) -> String {
        if self.name.is_empty() {
            output.to_string()
        } else {
            format!("{output}.{}", self.name)
        }
    }
}

/// Host operations needed by a parametric sweep.
///
/// Implementations own all call-shape probing; callers only see these
/// semantic operations and `HostError`.
pub trait FieldHost {
    /// Assign `value` to `field` of the block label `label`.
    fn set_field_value(&mut self, label: &str, field: &str, value: Real) -> HostResult<()>;

    /// Union of the bounding boxes of every block carrying one of `labels`.
    fn union_bounds(&mut self, labels: &[String]) -> HostResult<Rect>;

    /// Translate the group `labels`, currently enclosed by `selection`, by
    /// `(dx, dy)`. Moving nothing is an error.
    fn move_group(
        &mut self,
        labels: &[String],
        selection: Rect,
        dx: Real,
        dy: Real,
    ) -> HostResult<MoveReport>;

    fn build_mesh(&mut self) -> HostResult<()>;

    fn remove_mesh(&mut self) -> HostResult<()>;

    fn solve(&mut self) -> HostResult<SolveOutcome>;

    /// Evaluate integral `integral_id` over a contour around `contour_labels`.
    fn evaluate_integral(
        &mut self,
        contour_labels: &[String],
        integral_id: i32,
    ) -> HostResult<Vec<IntegralComponent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_columns() {
        assert_eq!(IntegralComponent::axis("X", 1.0).column("MaxwellForce"), "MaxwellForce.X");
        assert_eq!(IntegralComponent::scalar(1.0).column("MagneticEnergy"), "MagneticEnergy");
    }
}
