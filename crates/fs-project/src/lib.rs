//! fs-project: sweep configuration and action plan file formats.

pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, integral_id, output_name, validate_config, validate_plan};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Files saved by spreadsheet tools on Windows often start with a BOM.
fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

pub fn parse_config_yaml(text: &str) -> ProjectResult<SweepConfig> {
    let config: SweepConfig = serde_yaml::from_str(strip_bom(text))?;
    let config = migrate_to_latest(config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_yaml(path: &Path) -> ProjectResult<SweepConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_yaml(&content)
}

pub fn save_yaml(path: &Path, config: &SweepConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<SweepConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: SweepConfig = serde_json::from_str(strip_bom(&content))?;
    let config = migrate_to_latest(config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &SweepConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn parse_plan_json(text: &str) -> ProjectResult<ActionPlan> {
    let plan: ActionPlan = serde_json::from_str(strip_bom(text))?;
    validate_plan(&plan)?;
    Ok(plan)
}

pub fn load_plan(path: &Path) -> ProjectResult<ActionPlan> {
    let content = std::fs::read_to_string(path)?;
    parse_plan_json(&content)
}
