//! Sweep configuration loading and plan construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fs_core::{Case, Position};
use fs_project::schema::{CaseModeDef, SweepConfig};
use fs_sweep::{CaseMode, MeshPolicy, OutputSpec, SweepPlan};

use crate::error::{AppError, AppResult};

/// A validated configuration with its paths resolved.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: SweepConfig,
}

impl LoadedConfig {
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

fn resolve(base: &Path, p: &mut Option<PathBuf>) {
    if let Some(path) = p
        && path.is_relative()
    {
        *path = base.join(&*path);
    }
}

/// Load, migrate and validate a YAML configuration, then resolve relative
/// paths against the file's directory and check the value expression.
pub fn load_config(path: &Path) -> AppResult<LoadedConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut config = fs_project::parse_config_yaml(&content)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    resolve(base, &mut config.engine.problem);
    resolve(base, &mut config.engine.model);
    resolve(base, &mut config.output.csv);

    build_cases(&config)?;

    Ok(LoadedConfig {
        path: path.to_path_buf(),
        config,
    })
}

pub fn case_mode(mode: CaseModeDef) -> CaseMode {
    match mode {
        CaseModeDef::All => CaseMode::All,
        CaseModeDef::Paired => CaseMode::Paired,
    }
}

pub fn build_cases(config: &SweepConfig) -> AppResult<Vec<Case>> {
    let sweep = &config.sweep;
    let cases =
        fs_sweep::cases_from_expression(&sweep.field, &sweep.values, case_mode(sweep.mode))?;
    if cases.is_empty() {
        return Err(AppError::InvalidInput("value expression produced no cases".to_string()));
    }
    Ok(cases)
}

pub fn build_positions(config: &SweepConfig) -> AppResult<Vec<Position>> {
    let s = &config.sweep;
    Ok(fs_sweep::sample_line(
        s.start[0], s.start[1], s.end[0], s.end[1], s.step,
    )?)
}

pub fn build_outputs(config: &SweepConfig) -> AppResult<Vec<OutputSpec>> {
    config
        .sweep
        .outputs
        .iter()
        .map(|o| {
            let config_error = |e: fs_project::ValidationError| AppError::Config(e.to_string());
            Ok(OutputSpec {
                name: fs_project::output_name(o).map_err(config_error)?,
                integral_id: fs_project::integral_id(o).map_err(config_error)?,
            })
        })
        .collect()
}

pub fn build_plan(config: &SweepConfig) -> AppResult<SweepPlan> {
    let sweep = &config.sweep;
    Ok(SweepPlan {
        cases: build_cases(config)?,
        positions: build_positions(config)?,
        move_labels: sweep.move_labels.clone(),
        contour_labels: sweep.effective_contour_labels().to_vec(),
        outputs: build_outputs(config)?,
        mesh: MeshPolicy {
            remesh: sweep.mesh.remesh,
            mesh_each_position: sweep.mesh.mesh_each_position,
            mesh_once_per_case: sweep.mesh.mesh_once_per_case,
        },
        settle: Duration::from_secs_f64(sweep.settle_s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> SweepConfig {
        fs_project::parse_config_yaml(yaml).unwrap()
    }

    #[test]
    fn plan_from_config() {
        let cfg = config(
            "version: 1\nsweep:\n  values: \"A=1,2;B=3\"\n  move_labels: [m]\n  contour_labels: [c]\n  end: [2, 0]\n  step: 1\n  settle_s: 0.25\n  outputs: [{integral: 13}, {integral: MaxwellForce, name: F}]\n",
        );
        let plan = build_plan(&cfg).unwrap();
        assert_eq!(plan.cases.len(), 2);
        assert_eq!(plan.positions.len(), 3);
        assert_eq!(plan.contour_labels, ["c"]);
        assert_eq!(plan.settle, Duration::from_millis(250));
        assert_eq!(
            plan.outputs,
            vec![
                OutputSpec {
                    name: "MagneticEnergy".to_string(),
                    integral_id: 13
                },
                OutputSpec {
                    name: "F".to_string(),
                    integral_id: 15
                },
            ]
        );
    }

    #[test]
    fn paired_mismatch_is_invalid_input() {
        let cfg = config(
            "version: 1\nsweep:\n  values: \"A=1,2;B=3\"\n  mode: paired\n  move_labels: [m]\n  end: [2, 0]\n  step: 1\n",
        );
        let err = build_cases(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
