use fs_core::Position;

/// Orchestrator state reported to progress listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStage {
    Init,
    ApplyingCase,
    MovingToBaseline,
    MovingToPosition,
    Meshing,
    Solving,
    Extracting,
    Recording,
    ReturningToBaseline,
    Done,
    Cancelled,
    Failed,
}

impl SweepStage {
    pub fn name(self) -> &'static str {
        match self {
            SweepStage::Init => "init",
            SweepStage::ApplyingCase => "applying case",
            SweepStage::MovingToBaseline => "moving to baseline",
            SweepStage::MovingToPosition => "moving to position",
            SweepStage::Meshing => "meshing",
            SweepStage::Solving => "solving",
            SweepStage::Extracting => "extracting",
            SweepStage::Recording => "recording",
            SweepStage::ReturningToBaseline => "returning to baseline",
            SweepStage::Done => "done",
            SweepStage::Cancelled => "cancelled",
            SweepStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SweepStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct SweepProgressEvent {
    pub stage: SweepStage,
    pub case_index: Option<usize>,
    pub position_index: Option<usize>,
    pub position: Option<Position>,
    pub cases_total: usize,
    pub positions_total: usize,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl SweepProgressEvent {
    /// Fraction of `(case, position)` pairs finished, in `[0, 1]`.
    pub fn fraction_complete(&self) -> f64 {
        let total = self.cases_total * self.positions_total;
        if total == 0 {
            return 0.0;
        }
        let done = match (self.case_index, self.position_index) {
            (Some(c), Some(p)) => c * self.positions_total + p,
            (Some(c), None) => c * self.positions_total,
            _ => 0,
        };
        if self.stage == SweepStage::Done {
            return 1.0;
        }
        (done as f64 / total as f64).clamp(0.0, 1.0)
    }
}
