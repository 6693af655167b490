//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

/// One case column group of the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAxis {
    pub index: usize,
    pub label: String,
}

/// One extracted value: `(position, case, output[.component])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultCell {
    pub position_index: usize,
    pub dx: f64,
    pub dy: f64,
    pub case_index: usize,
    pub column: String,
    pub value: f64,
}

/// How a stored sweep ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunStatus {
    Completed,
    Cancelled {
        case_index: usize,
        position_index: Option<usize>,
    },
    Failed {
        stage: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub name: String,
    pub timestamp: String,
    pub tool_version: String,
    pub status: RunStatus,
    pub positions: Vec<[f64; 2]>,
    pub cases: Vec<CaseAxis>,
    pub outputs: Vec<String>,
    pub cell_count: usize,
    #[serde(default)]
    pub restore_warnings: Vec<String>,
    pub elapsed_s: f64,
}
