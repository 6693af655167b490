//! Case and position grid generation.

use fs_core::{
    Assignment, Case, FsError, POSITION_DECIMALS, Position, Real, ensure_finite, round_to,
};

pub type CaseResult<T> = Result<T, CaseError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CaseError {
    #[error("Value expression is empty")]
    EmptyExpression,

    #[error("Group '{group}' has no '=' (expected label=v1,v2)")]
    MissingEquals { group: String },

    #[error("Group '{group}' has an empty label")]
    EmptyLabel { group: String },

    #[error("Label '{label}' has no values")]
    EmptyValues { label: String },

    #[error("Label '{label}': '{token}' is not a number")]
    InvalidNumber { label: String, token: String },

    #[error("Paired values need equal lengths: '{label}' has {found}, expected {expected}")]
    LengthMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("Step must be positive and finite, got {step}")]
    InvalidStep { step: Real },

    #[error(transparent)]
    Numeric(#[from] FsError),
}

/// Values swept for one label, in the order given.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelValues {
    pub label: String,
    pub values: Vec<Real>,
}

/// How value lists combine into cases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CaseMode {
    /// Cartesian product, first label varying slowest.
    #[default]
    All,
    /// Case `i` takes the `i`-th value of every list.
    Paired,
}

fn normalise(text: &str) -> String {
    text.replace('\u{ff0c}', ",")
        .replace('\u{ff1b}', ";")
        .replace('\u{ff1d}', "=")
}

/// Parse `label1=v1,v2; label2=v3`.
///
/// Labels keep their first-seen order; a repeated label extends its list.
pub fn parse_value_expression(text: &str) -> CaseResult<Vec<LabelValues>> {
    let text = normalise(text);
    let mut out: Vec<LabelValues> = Vec::new();

    for group in text.split(['\n', ';']) {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let (label, values) = group.split_once('=').ok_or_else(|| CaseError::MissingEquals {
            group: group.to_string(),
        })?;
        let label = label.trim();
        if label.is_empty() {
            return Err(CaseError::EmptyLabel {
                group: group.to_string(),
            });
        }

        let mut parsed = Vec::new();
        for token in values.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let v: Real = token.parse().map_err(|_| CaseError::InvalidNumber {
                label: label.to_string(),
                token: token.to_string(),
            })?;
            if !v.is_finite() {
                return Err(CaseError::InvalidNumber {
                    label: label.to_string(),
                    token: token.to_string(),
                });
            }
            parsed.push(v);
        }
        if parsed.is_empty() {
            return Err(CaseError::EmptyValues {
                label: label.to_string(),
            });
        }

        match out.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.values.extend(parsed),
            None => out.push(LabelValues {
                label: label.to_string(),
                values: parsed,
            }),
        }
    }

    if out.is_empty() {
        return Err(CaseError::EmptyExpression);
    }
    Ok(out)
}

fn make_case(index: usize, field: &str, mapping: &[LabelValues], picks: &[usize]) -> Case {
    let assignments = mapping
        .iter()
        .zip(picks)
        .map(|(lv, &i)| Assignment {
            field: field.to_string(),
            label: lv.label.clone(),
            value: lv.values[i],
        })
        .collect();
    Case::new(index, assignments)
}

/// Full cartesian product of the value lists.
pub fn all_combinations(field: &str, mapping: &[LabelValues]) -> Vec<Case> {
    if mapping.is_empty() || mapping.iter().any(|lv| lv.values.is_empty()) {
        return Vec::new();
    }
    let total: usize = mapping.iter().map(|lv| lv.values.len()).product();
    let mut cases = Vec::with_capacity(total);
    let mut picks = vec![0usize; mapping.len()];

    for index in 0..total {
        cases.push(make_case(index, field, mapping, &picks));
        // odometer: the last label varies fastest
        for slot in (0..picks.len()).rev() {
            picks[slot] += 1;
            if picks[slot] < mapping[slot].values.len() {
                break;
            }
            picks[slot] = 0;
        }
    }
    cases
}

/// Index-paired cases; every list must have the same length.
pub fn paired_combinations(field: &str, mapping: &[LabelValues]) -> CaseResult<Vec<Case>> {
    let Some(first) = mapping.first() else {
        return Ok(Vec::new());
    };
    let n = first.values.len();
    if let Some(bad) = mapping.iter().find(|lv| lv.values.len() != n) {
        return Err(CaseError::LengthMismatch {
            label: bad.label.clone(),
            expected: n,
            found: bad.values.len(),
        });
    }
    Ok((0..n)
        .map(|i| make_case(i, field, mapping, &vec![i; mapping.len()]))
        .collect())
}

pub fn generate_cases(
    field: &str,
    mapping: &[LabelValues],
    mode: CaseMode,
) -> CaseResult<Vec<Case>> {
    match mode {
        CaseMode::All => Ok(all_combinations(field, mapping)),
        CaseMode::Paired => paired_combinations(field, mapping),
    }
}

/// Parse an expression and expand it into cases.
pub fn cases_from_expression(field: &str, text: &str, mode: CaseMode) -> CaseResult<Vec<Case>> {
    let mapping = parse_value_expression(text)?;
    generate_cases(field, &mapping, mode)
}

/// Positions along the segment `(x0, y0) -> (x1, y1)`.
///
/// `floor(length / step) + 1` evenly spaced samples from start to end,
/// rounded to [`POSITION_DECIMALS`]. A segment shorter than `step` (coincident
/// endpoints included) gives only the start.
pub fn sample_line(
    x0: Real,
    y0: Real,
    x1: Real,
    y1: Real,
    step: Real,
) -> CaseResult<Vec<Position>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(CaseError::InvalidStep { step });
    }
    for v in [x0, y0, x1, y1] {
        ensure_finite(v, "trajectory endpoint")?;
    }

    let rounded = |x: Real, y: Real| {
        Position::new(round_to(x, POSITION_DECIMALS), round_to(y, POSITION_DECIMALS))
    };

    let (ex, ey) = (x1 - x0, y1 - y0);
    let length = ex.hypot(ey);
    if round_to(length, POSITION_DECIMALS) == 0.0 {
        return Ok(vec![rounded(x0, y0)]);
    }

    // 1e-9 keeps 3.0 / 1.0 from flooring to 2 on float noise
    let n = (length / step + 1e-9).floor() as usize + 1;
    if n == 1 {
        return Ok(vec![rounded(x0, y0)]);
    }
    let last = (n - 1) as Real;
    Ok((0..n)
        .map(|i| {
            let t = i as Real / last;
            rounded(x0 + ex * t, y0 + ey * t)
        })
        .collect())
}
