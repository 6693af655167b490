//! fs-core: stable foundation for fieldsweep.
//!
//! Contains:
//! - numeric (Real + tolerances + rounding helpers)
//! - geom (2D points, rectangles, the tracked bounding box of a moving group)
//! - model (sweep cases and positions)
//! - integral (known integral identifiers and their output names)
//! - error (shared error types)

pub mod error;
pub mod geom;
pub mod integral;
pub mod model;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{FsError, FsResult};
pub use geom::*;
pub use integral::IntegralKind;
pub use model::*;
pub use numeric::*;
