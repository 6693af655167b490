//! Sweep data model: cases and sampled positions.

use core::fmt;

use crate::geom::Point2;
use crate::numeric::Real;

/// One `(field, label) = value` assignment applied at the start of a case.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub field: String,
    pub label: String,
    pub value: Real,
}

/// One sweep case: a fixed set of field assignments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Case {
    pub index: usize,
    pub assignments: Vec<Assignment>,
}

impl Case {
    pub fn new(index: usize, assignments: Vec<Assignment>) -> Self {
        Self { index, assignments }
    }

    /// Column label, e.g. `bobine=100;gap=2`.
    pub fn label(&self) -> String {
        self.assignments
            .iter()
            .map(|a| format!("{}={}", a.label, a.value))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn value_for(&self, label: &str) -> Option<Real> {
        self.assignments
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.value)
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case {} [{}]", self.index, self.label())
    }
}

/// A displacement of the moving group relative to its baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub dx: Real,
    pub dy: Real,
}

impl Position {
    pub const BASELINE: Position = Position { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: Real, dy: Real) -> Self {
        Self { dx, dy }
    }

    pub fn as_point(self) -> Point2 {
        Point2::new(self.dx, self.dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_label_joins_assignments() {
        let case = Case::new(
            0,
            vec![
                Assignment {
                    field: "Loading".to_string(),
                    label: "A".to_string(),
                    value: 100.0,
                },
                Assignment {
                    field: "Loading".to_string(),
                    label: "B".to_string(),
                    value: 2.5,
                },
            ],
        );
        assert_eq!(case.label(), "A=100;B=2.5");
        assert_eq!(case.value_for("B"), Some(2.5));
        assert_eq!(case.value_for("C"), None);
    }
}
