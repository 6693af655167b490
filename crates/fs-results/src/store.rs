//! Run storage API.

use std::fs;
use std::path::{Path, PathBuf};

use crate::table::SweepTable;
use crate::types::{RunManifest, ResultCell};
use crate::{ResultsError, ResultsResult};

/// Stored sweeps under `<root>/<run_id>/`.
#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store beside a configuration file: `<config dir>/.fieldsweep/runs`.
    pub fn for_config(config_path: &Path) -> ResultsResult<Self> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "config path has no parent directory".to_string(),
            })?;
        Self::new(config_dir.join(".fieldsweep").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, table: &SweepTable) -> ResultsResult<PathBuf> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        table.save_csv(&run_dir.join("table.csv"))?;

        let mut cells_content = String::new();
        for cell in table.cells() {
            let line = serde_json::to_string(&cell)?;
            cells_content.push_str(&line);
            cells_content.push('\n');
        }
        fs::write(run_dir.join("cells.jsonl"), cells_content)?;

        Ok(run_dir)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_cells(&self, run_id: &str) -> ResultsResult<Vec<ResultCell>> {
        let cells_path = self.run_dir(run_id).join("cells.jsonl");

        if !cells_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(cells_path)?;
        let mut cells = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                let cell: ResultCell = serde_json::from_str(line)?;
                cells.push(cell);
            }
        }

        Ok(cells)
    }

    /// Manifest plus the table rebuilt from its cells.
    pub fn load_table(&self, run_id: &str) -> ResultsResult<(RunManifest, SweepTable)> {
        let manifest = self.load_manifest(run_id)?;
        let cells = self.load_cells(run_id)?;
        let positions = manifest
            .positions
            .iter()
            .map(|p| fs_core::Position::new(p[0], p[1]))
            .collect();
        let table = SweepTable::from_cells(
            positions,
            manifest.cases.clone(),
            manifest.outputs.clone(),
            &cells,
        )?;
        Ok((manifest, table))
    }

    /// Every stored run, newest first. Unreadable entries are skipped.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
