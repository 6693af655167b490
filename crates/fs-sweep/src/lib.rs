//! fs-sweep: case generation and the parametric sweep orchestrator.

pub mod cancel;
pub mod cases;
pub mod orchestrator;
pub mod progress;

pub use cancel::CancelToken;
pub use cases::{
    CaseError, CaseMode, CaseResult, LabelValues, all_combinations, cases_from_expression,
    generate_cases, paired_combinations, parse_value_expression, sample_line,
};
pub use orchestrator::{
    MeshPolicy, OutputSpec, SweepFailure, SweepPlan, SweepReport, SweepStatus, SweepTiming,
    run_sweep, run_sweep_with_progress,
};
pub use progress::{SweepProgressEvent, SweepStage};
