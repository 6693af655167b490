#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// A one-block mover under a coil, with the fault section left to the caller.
pub fn plunger_yaml(faults: &str) -> String {
    format!(
        r#"version: 1
name: plunger-force
engine:
  backend: simulated
  simulated:
    blocks:
      - {{ label: air, rect: [-20, -20, 20, 20] }}
      - {{ label: steel mover, rect: [0, 0, 2, 1] }}
      - {{ label: bobine, rect: [0, 3, 4, 4] }}
    labels:
      - {{ name: bobine, at: [2, 3.5], fields: {{ Loading: 0 }} }}
      - {{ name: steel mover, at: [1, 0.5] }}
      - {{ name: air }}
    faults: {{ {faults} }}
sweep:
  values: "bobine=100,200"
  move_labels: [steel mover]
  end: [2.0, 0.0]
  step: 1.0
  solve: {{ poll_interval_s: 0, max_polls: 5 }}
output:
  csv: outputs/force_table.csv
"#
    )
}

pub fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("sweep.yaml");
    fs::write(&path, yaml).unwrap();
    path
}
