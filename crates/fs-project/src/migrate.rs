//! Schema migration framework.

use crate::ProjectError;
use crate::schema::SweepConfig;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut config: SweepConfig) -> Result<SweepConfig, ProjectError> {
    while config.version < LATEST_VERSION {
        config = migrate_one_version(config)?;
    }
    Ok(config)
}

fn migrate_one_version(config: SweepConfig) -> Result<SweepConfig, ProjectError> {
    match config.version {
        0 => migrate_v0_to_v1(config),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 swept one label's current: `current_label` + `currents`.
fn migrate_v0_to_v1(mut config: SweepConfig) -> Result<SweepConfig, ProjectError> {
    let sweep = &mut config.sweep;
    let label = sweep.current_label.take();
    let currents = sweep.currents.take();

    if sweep.values.trim().is_empty() {
        let label = label.unwrap_or_else(|| "bobine".to_string());
        let Some(currents) = currents else {
            return Err(ProjectError::Migration {
                what: "version 0 sweep has neither `values` nor `currents`".to_string(),
            });
        };
        let list = currents
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        sweep.values = format!("{label}={list}");
    }

    config.version = 1;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v0(yaml: &str) -> SweepConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn v0_currents_become_value_expression() {
        let cfg = v0(
            "version: 0\nsweep:\n  current_label: coil\n  currents: [100, 250.5]\n  move_labels: [a]\n  end: [1, 0]\n  step: 1\n",
        );
        let cfg = migrate_to_latest(cfg).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.sweep.values, "coil=100,250.5");
        assert_eq!(cfg.sweep.field, "Loading");
        assert!(cfg.sweep.current_label.is_none());
        assert!(cfg.sweep.currents.is_none());
    }

    #[test]
    fn v0_label_defaults_to_bobine() {
        let cfg = v0("version: 0\nsweep:\n  currents: [1]\n  end: [1, 0]\n  step: 1\n");
        assert_eq!(migrate_to_latest(cfg).unwrap().sweep.values, "bobine=1");
    }

    #[test]
    fn v0_without_currents_fails() {
        let cfg = v0("version: 0\nsweep:\n  end: [1, 0]\n  step: 1\n");
        assert!(matches!(
            migrate_to_latest(cfg),
            Err(ProjectError::Migration { .. })
        ));
    }
}
