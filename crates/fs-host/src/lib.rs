//! fs-host: the robustness layer between fieldsweep and an external field-simulation engine.
//!
//! Provides:
//! - A dynamic automation surface (`AutomationObject`, `Variant`) modelling
//!   late-bound collections, properties and methods
//! - `SignatureResolver`, the ranked "first call shape that works" primitive
//! - The `FieldHost` capability trait consumed by the sweep orchestrator
//! - `Session`, the one concrete adapter: it probes call shapes for geometry
//!   moves, mesh/solve control, result extraction and case field assignment
//! - `sim`, a deterministic in-memory engine with configurable call-shape
//!   dialects
//!
//! # Architecture
//!
//! Nothing above this crate knows which call shapes a given installation
//! accepts. Every operation re-resolves its shape on each call, so objects of
//! different kinds within one run (a vertex, a raw point, a selection) can
//! each take whichever form they support.

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod fields;
pub mod geometry;
pub mod mesh;
pub mod resolver;
pub mod session;
pub mod sim;
pub mod variant;

// Re-exports for ergonomics
pub use capability::{
    FieldHost, IntegralComponent, IntegralKind, MoveMethod, MoveReport, SolveOutcome,
};
pub use dispatch::AutomationObject;
pub use error::{DispatchError, DispatchResult, HostError, HostResult};
pub use mesh::SolvePolicy;
pub use resolver::{Resolved, SignatureResolver, Unresolved};
pub use session::{Session, SessionOptions};
pub use variant::{ObjectRef, Variant};
