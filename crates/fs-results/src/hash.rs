//! Content-based hashing for run IDs.

use fs_project::schema::{EngineDef, SweepDef};
use sha2::{Digest, Sha256};

pub fn compute_run_id(engine: &EngineDef, sweep: &SweepDef, tool_version: &str) -> String {
    let mut hasher = Sha256::new();

    let engine_json = serde_json::to_string(engine).unwrap_or_default();
    hasher.update(engine_json.as_bytes());

    let sweep_json = serde_json::to_string(sweep).unwrap_or_default();
    hasher.update(sweep_json.as_bytes());

    hasher.update(tool_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
