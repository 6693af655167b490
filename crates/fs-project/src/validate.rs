//! Configuration and action plan validation.

use std::collections::HashSet;

use fs_core::IntegralKind;

use crate::schema::{ActionDef, ActionPlan, IntegralRef, OutputSpecDef, SweepConfig};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing value: {field}")]
    MissingValue { field: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown integral: {name}")]
    UnknownIntegral { name: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn labels_present(field: &str, labels: &[String]) -> Result<(), ValidationError> {
    if labels.is_empty() {
        return Err(ValidationError::MissingValue {
            field: field.to_string(),
        });
    }
    if labels.iter().any(|l| l.trim().is_empty()) {
        return Err(invalid(field, "\"\"", "labels must not be blank"));
    }
    Ok(())
}

/// Numeric id of an output's integral.
pub fn integral_id(output: &OutputSpecDef) -> Result<i32, ValidationError> {
    match &output.integral {
        IntegralRef::Id(id) => Ok(*id),
        IntegralRef::Name(name) => name
            .trim()
            .parse::<i32>()
            .ok()
            .or_else(|| IntegralKind::from_name(name.trim()).map(IntegralKind::id))
            .ok_or_else(|| ValidationError::UnknownIntegral { name: name.clone() }),
    }
}

/// Column name of an output: explicit name, else the integral's known name.
pub fn output_name(output: &OutputSpecDef) -> Result<String, ValidationError> {
    if let Some(name) = output.name.as_deref().map(str::trim)
        && !name.is_empty()
    {
        return Ok(name.to_string());
    }
    Ok(IntegralKind::output_name(integral_id(output)?))
}

pub fn validate_config(config: &SweepConfig) -> Result<(), ValidationError> {
    if config.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    let sweep = &config.sweep;
    if sweep.field.trim().is_empty() {
        return Err(ValidationError::MissingValue {
            field: "sweep.field".to_string(),
        });
    }
    if sweep.values.trim().is_empty() {
        return Err(ValidationError::MissingValue {
            field: "sweep.values".to_string(),
        });
    }
    labels_present("sweep.move_labels", &sweep.move_labels)?;
    if !sweep.contour_labels.is_empty() {
        labels_present("sweep.contour_labels", &sweep.contour_labels)?;
    }

    for (field, v) in [
        ("sweep.start[0]", sweep.start[0]),
        ("sweep.start[1]", sweep.start[1]),
        ("sweep.end[0]", sweep.end[0]),
        ("sweep.end[1]", sweep.end[1]),
    ] {
        finite(field, v)?;
    }
    if !(sweep.step.is_finite() && sweep.step > 0.0) {
        return Err(invalid("sweep.step", sweep.step, "must be > 0"));
    }
    if !(sweep.settle_s.is_finite() && sweep.settle_s >= 0.0) {
        return Err(invalid("sweep.settle_s", sweep.settle_s, "must be >= 0"));
    }
    if !(sweep.solve.poll_interval_s.is_finite() && sweep.solve.poll_interval_s >= 0.0) {
        return Err(invalid(
            "sweep.solve.poll_interval_s",
            sweep.solve.poll_interval_s,
            "must be >= 0",
        ));
    }
    if sweep.solve.max_polls == 0 {
        return Err(invalid("sweep.solve.max_polls", 0, "must be >= 1"));
    }
    if sweep.outputs.is_empty() {
        return Err(ValidationError::MissingValue {
            field: "sweep.outputs".to_string(),
        });
    }
    let mut names = HashSet::new();
    for output in &sweep.outputs {
        let name = output_name(output)?;
        if !names.insert(name.clone()) {
            return Err(ValidationError::DuplicateName {
                name,
                context: "sweep.outputs".to_string(),
            });
        }
    }

    let sim = &config.engine.simulated;
    for block in &sim.blocks {
        let [l, b, r, t] = block.rect;
        if [l, b, r, t].iter().any(|v| !v.is_finite()) || l >= r || b >= t {
            return Err(invalid(
                "engine.simulated.blocks.rect",
                format!("{:?}", block.rect),
                "expected [left, bottom, right, top] with left < right and bottom < top",
            ));
        }
    }
    let mut label_names = HashSet::new();
    for label in &sim.labels {
        if !label_names.insert(label.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: label.name.clone(),
                context: "engine.simulated.labels".to_string(),
            });
        }
    }
    if !sim.coupling.is_finite() {
        return Err(invalid("engine.simulated.coupling", sim.coupling, "must be finite"));
    }

    Ok(())
}

pub fn validate_plan(plan: &ActionPlan) -> Result<(), ValidationError> {
    if plan.actions.is_empty() {
        return Err(ValidationError::MissingValue {
            field: "actions".to_string(),
        });
    }
    for (i, action) in plan.actions.iter().enumerate() {
        let ctx = |name: &str| format!("actions[{i}].{name}");
        match action {
            ActionDef::MoveShape { labels, dx, dy }
            | ActionDef::MoveVertices { labels, dx, dy }
            | ActionDef::MoveBlockLabels { labels, dx, dy }
            | ActionDef::MoveVerticesByBlockLabel {
                label: labels,
                dx,
                dy,
            } => {
                labels_present(&ctx("labels"), &labels.names())?;
                finite(&ctx("dx"), *dx)?;
                finite(&ctx("dy"), *dy)?;
            }
            ActionDef::MoveVerticesInRect {
                rect,
                dx,
                dy,
                epsilon,
            }
            | ActionDef::MoveBlocksInRect {
                rect,
                dx,
                dy,
                epsilon,
            } => {
                check_rect(&ctx("rect"), rect)?;
                finite(&ctx("dx"), *dx)?;
                finite(&ctx("dy"), *dy)?;
                if !(epsilon.is_finite() && *epsilon >= 0.0) {
                    return Err(invalid(&ctx("epsilon"), epsilon, "must be >= 0"));
                }
            }
            ActionDef::AddRectWithBlockLabel { rect, inset, label } => {
                check_rect(&ctx("rect"), rect)?;
                if !(inset.is_finite() && *inset >= 0.0) {
                    return Err(invalid(&ctx("inset"), inset, "must be >= 0"));
                }
                if label.trim().is_empty() {
                    return Err(ValidationError::MissingValue { field: ctx("label") });
                }
            }
        }
    }
    Ok(())
}

fn check_rect(field: &str, rect: &[f64; 4]) -> Result<(), ValidationError> {
    if rect.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(invalid(field, format!("{rect:?}"), "must be finite"))
    }
}
