//! Wide result table: one row per position, one column per case and output.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fs_core::Position;

use crate::types::{CaseAxis, ResultCell};
use crate::{ResultsError, ResultsResult};

/// Recorded sweep values plus the axes that order them.
///
/// Output columns are registered the first time a row carries them, so vector
/// components appear in the order the host reported them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepTable {
    positions: Vec<Position>,
    cases: Vec<CaseAxis>,
    outputs: Vec<String>,
    cells: BTreeMap<(usize, usize, usize), f64>,
}

impl SweepTable {
    pub fn new(positions: Vec<Position>, cases: Vec<CaseAxis>) -> Self {
        Self {
            positions,
            cases,
            outputs: Vec::new(),
            cells: BTreeMap::new(),
        }
    }

    /// Rebuild a table from stored cells.
    pub fn from_cells(
        positions: Vec<Position>,
        cases: Vec<CaseAxis>,
        outputs: Vec<String>,
        cells: &[ResultCell],
    ) -> ResultsResult<Self> {
        let mut table = Self::new(positions, cases);
        table.outputs = outputs;
        for cell in cells {
            table.record_row(
                cell.position_index,
                cell.case_index,
                &[(cell.column.clone(), cell.value)],
            )?;
        }
        Ok(table)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn cases(&self) -> &[CaseAxis] {
        &self.cases
    }

    /// Output column names (`<output>` or `<output>.<component>`).
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn row_count(&self) -> usize {
        self.positions.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn case_slot(&self, case_index: usize) -> Option<usize> {
        self.cases.iter().position(|c| c.index == case_index)
    }

    fn output_slot(&mut self, column: &str) -> usize {
        match self.outputs.iter().position(|o| o == column) {
            Some(i) => i,
            None => {
                self.outputs.push(column.to_string());
                self.outputs.len() - 1
            }
        }
    }

    /// Store every value extracted for one `(position, case)` pair.
    pub fn record_row(
        &mut self,
        position_index: usize,
        case_index: usize,
        values: &[(String, f64)],
    ) -> ResultsResult<()> {
        if position_index >= self.positions.len() {
            return Err(ResultsError::OutOfRange {
                axis: "position",
                index: position_index,
                len: self.positions.len(),
            });
        }
        let case_slot = self.case_slot(case_index).ok_or(ResultsError::OutOfRange {
            axis: "case",
            index: case_index,
            len: self.cases.len(),
        })?;
        for (column, value) in values {
            let out = self.output_slot(column);
            self.cells.insert((position_index, case_slot, out), *value);
        }
        Ok(())
    }

    pub fn get(&self, position_index: usize, case_index: usize, column: &str) -> Option<f64> {
        let case_slot = self.case_slot(case_index)?;
        let out = self.outputs.iter().position(|o| o == column)?;
        self.cells.get(&(position_index, case_slot, out)).copied()
    }

    /// Whether any value was recorded for the pair.
    pub fn has_row(&self, position_index: usize, case_index: usize) -> bool {
        let Some(case_slot) = self.case_slot(case_index) else {
            return false;
        };
        (0..self.outputs.len()).any(|o| self.cells.contains_key(&(position_index, case_slot, o)))
    }

    /// Result column headers, `<case-label>:<output>`, case-major.
    pub fn column_headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.cases.len() * self.outputs.len());
        for case in &self.cases {
            for output in &self.outputs {
                headers.push(format!("{}:{}", case.label, output));
            }
        }
        headers
    }

    /// All cells in row order.
    pub fn cells(&self) -> Vec<ResultCell> {
        self.cells
            .iter()
            .map(|(&(p, c, o), &value)| ResultCell {
                position_index: p,
                dx: self.positions[p].dx,
                dy: self.positions[p].dy,
                case_index: self.cases[c].index,
                column: self.outputs[o].clone(),
                value,
            })
            .collect()
    }

    fn row_values(&self, position_index: usize) -> Vec<Option<f64>> {
        let mut row = Vec::with_capacity(self.cases.len() * self.outputs.len());
        for c in 0..self.cases.len() {
            for o in 0..self.outputs.len() {
                row.push(self.cells.get(&(position_index, c, o)).copied());
            }
        }
        row
    }

    /// Write the table as CSV: `dx,dy` then one column per case and output.
    pub fn write_csv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        let mut header = vec!["dx".to_string(), "dy".to_string()];
        header.extend(self.column_headers());
        let header: Vec<String> = header.iter().map(|h| escape_csv_field(h)).collect();
        writeln!(w, "{}", header.join(","))?;

        for (i, pos) in self.positions.iter().enumerate() {
            let mut fields = vec![pos.dx.to_string(), pos.dy.to_string()];
            fields.extend(
                self.row_values(i)
                    .into_iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            writeln!(w, "{}", fields.join(","))?;
        }
        w.flush()
    }

    pub fn to_csv_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_csv(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn save_csv(&self, path: &Path) -> ResultsResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let w = BufWriter::new(File::create(path)?);
        self.write_csv(w)?;
        Ok(())
    }

    /// Tab separated rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let mut header = vec!["dx".to_string(), "dy".to_string()];
        header.extend(self.column_headers());
        out.push_str(&header.join("\t"));
        out.push('\n');
        for (i, pos) in self.positions.iter().enumerate() {
            let mut fields = vec![pos.dx.to_string(), pos.dy.to_string()];
            fields.extend(
                self.row_values(i)
                    .into_iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            out.push_str(&fields.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// Quote a field if it contains a separator, quote or line break.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> (Vec<Position>, Vec<CaseAxis>) {
        (
            vec![
                Position::new(0.0, 0.0),
                Position::new(1.0, 0.0),
                Position::new(2.0, 0.0),
            ],
            vec![
                CaseAxis {
                    index: 0,
                    label: "A=100".to_string(),
                },
                CaseAxis {
                    index: 1,
                    label: "A=200".to_string(),
                },
            ],
        )
    }

    #[test]
    fn escape_only_when_needed() {
        assert_eq!(escape_csv_field("A=1;B=2:F"), "A=1;B=2:F");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn full_grid_renders_three_rows_two_columns() {
        let (positions, cases) = axes();
        let mut t = SweepTable::new(positions, cases);
        for p in 0..3 {
            for c in 0..2 {
                let v = (p * 10 + c) as f64;
                t.record_row(p, c, &[("F".to_string(), v)]).unwrap();
            }
        }
        assert_eq!(t.cell_count(), 6);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column_headers(), ["A=100:F", "A=200:F"]);
        assert_eq!(
            t.to_csv_string(),
            "dx,dy,A=100:F,A=200:F\n0,0,0,1\n1,0,10,11\n2,0,20,21\n"
        );
    }

    #[test]
    fn missing_cells_render_empty() {
        let (positions, cases) = axes();
        let mut t = SweepTable::new(positions, cases);
        t.record_row(
            0,
            0,
            &[("F.X".to_string(), 1.5), ("F.Y".to_string(), -2.0)],
        )
        .unwrap();
        assert!(t.has_row(0, 0));
        assert!(!t.has_row(0, 1));
        let csv = t.to_csv_string();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "dx,dy,A=100:F.X,A=100:F.Y,A=200:F.X,A=200:F.Y");
        assert_eq!(lines[1], "0,0,1.5,-2,,");
        assert_eq!(lines[2], "1,0,,,,");
        assert!(t.render_text().starts_with("dx\tdy\tA=100:F.X"));
    }

    #[test]
    fn out_of_range_rejected() {
        let (positions, cases) = axes();
        let mut t = SweepTable::new(positions, cases);
        assert!(matches!(
            t.record_row(3, 0, &[("F".to_string(), 1.0)]),
            Err(ResultsError::OutOfRange { axis: "position", .. })
        ));
        assert!(matches!(
            t.record_row(0, 7, &[("F".to_string(), 1.0)]),
            Err(ResultsError::OutOfRange { axis: "case", .. })
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn cells_round_trip_through_from_cells() {
        let (positions, cases) = axes();
        let mut t = SweepTable::new(positions.clone(), cases.clone());
        t.record_row(2, 1, &[("F".to_string(), 4.0)]).unwrap();
        let rebuilt =
            SweepTable::from_cells(positions, cases, t.outputs().to_vec(), &t.cells()).unwrap();
        assert_eq!(rebuilt, t);
        assert_eq!(rebuilt.get(2, 1, "F"), Some(4.0));
    }
}
