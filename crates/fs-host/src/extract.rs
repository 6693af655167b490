//! Result extraction: result-region lookup and contour integrals.

use tracing::{debug, warn};

use crate::capability::IntegralComponent;
use crate::dispatch::{self, call_object, items, read_f64, read_object, read_string, same_name};
use crate::error::{DispatchError, DispatchResult, HostError, HostResult};
use crate::resolver::SignatureResolver;
use crate::session::Session;
use crate::variant::{ObjectRef, Variant};

const AXES: [&str; 3] = ["X", "Y", "Z"];

fn extraction(detail: impl Into<String>) -> HostError {
    HostError::Extraction {
        detail: detail.into(),
    }
}

/// The problem's result object, present only after a successful solve.
pub fn result(session: &Session) -> HostResult<ObjectRef> {
    match dispatch::read(session.problem(), "Result") {
        Ok(Variant::Object(r)) => Ok(r),
        Ok(_) => Err(extraction("no results available after solve")),
        Err(e) => Err(extraction(format!("cannot read results: {e}"))),
    }
}

fn result_block_label(block: &ObjectRef) -> String {
    ["Label", "Name"]
        .into_iter()
        .find_map(|m| read_string(block, m).ok().filter(|s| !s.is_empty()))
        .unwrap_or_default()
}

fn result_blocks(session: &Session) -> HostResult<Vec<ObjectRef>> {
    let blocks = read_object(&result(session)?, "Blocks")?;
    Ok(items(&blocks))
}

/// Up to `limit` result-region labels, for diagnostics.
pub fn list_result_labels(session: &Session, limit: usize) -> HostResult<Vec<String>> {
    Ok(result_blocks(session)?
        .iter()
        .map(result_block_label)
        .filter(|l| !l.is_empty())
        .take(limit)
        .collect())
}

/// Result region named `label`: exact case-insensitive match, then a
/// substring match when `lenient`.
pub fn find_result_region(
    session: &Session,
    label: &str,
    lenient: bool,
) -> HostResult<Option<ObjectRef>> {
    let blocks = result_blocks(session)?;
    if let Some(b) = blocks.iter().find(|b| same_name(&result_block_label(b), label)) {
        return Ok(Some(b.clone()));
    }
    if lenient {
        let needle = label.trim().to_lowercase();
        return Ok(blocks
            .into_iter()
            .find(|b| result_block_label(b).to_lowercase().contains(&needle)));
    }
    Ok(None)
}

fn add_to_contour(contour: &ObjectRef, name: &str) -> bool {
    let arg = [Variant::from(name)];
    SignatureResolver::new("add contour block")
        .shape("AddBlock1(label)", || contour.invoke("AddBlock1", &arg).map(|_| ()))
        .shape("AddBlock(label)", || contour.invoke("AddBlock", &arg).map(|_| ()))
        .shape("AddBlock2(label)", || contour.invoke("AddBlock2", &arg).map(|_| ()))
        .resolve()
        .is_ok()
}

/// Split an integral value into named axis components or one scalar.
pub fn decompose(value: &Variant) -> DispatchResult<Vec<IntegralComponent>> {
    match value {
        Variant::Object(obj) => {
            let components: Vec<IntegralComponent> = AXES
                .iter()
                .filter_map(|axis| {
                    read_f64(obj, axis)
                        .ok()
                        .map(|v| IntegralComponent::axis(axis, v))
                })
                .collect();
            if components.is_empty() {
                Err(DispatchError::TypeMismatch {
                    member: "GetIntegral".to_string(),
                    expected: "number or vector",
                    found: "object",
                })
            } else {
                Ok(components)
            }
        }
        other => other
            .as_f64()
            .map(|v| vec![IntegralComponent::scalar(v)])
            .ok_or_else(|| DispatchError::TypeMismatch {
                member: "GetIntegral".to_string(),
                expected: "number or vector",
                found: other.kind(),
            }),
    }
}

fn unwrap_value(raw: Variant) -> Variant {
    if let Variant::Object(obj) = &raw
        && let Ok(inner) = obj.get("Value")
        && !inner.is_empty()
    {
        return inner;
    }
    raw
}

/// Evaluate integral `integral_id` over a contour around `labels`.
pub fn evaluate_integral(
    session: &Session,
    labels: &[String],
    integral_id: i32,
) -> HostResult<Vec<IntegralComponent>> {
    let result = result(session)?;
    let contour = call_object(&result, "GetFieldWindow", &[Variant::Int(1)])
        .and_then(|w| read_object(&w, "Contour"))
        .map_err(|e| extraction(format!("cannot access contour: {e}")))?;
    if let Err(e) = contour.invoke("Clear", &[]) {
        debug!(error = %e, "contour clear not available");
    }

    let lenient = session.options().lenient_result_lookup;
    let mut added = 0;
    for label in labels {
        let name = match find_result_region(session, label, lenient) {
            Ok(Some(block)) => result_block_label(&block),
            _ => label.clone(),
        };
        if add_to_contour(&contour, &name) {
            added += 1;
        } else {
            let known = list_result_labels(session, 50).unwrap_or_default();
            warn!(label = %label, known = ?known, "failed to add block to contour");
        }
    }
    if added == 0 {
        return Err(extraction(format!(
            "no blocks added to contour (labels: {})",
            labels.join(", ")
        )));
    }

    let id = Variant::Int(i64::from(integral_id));
    let raw = SignatureResolver::new("get integral")
        .halt_on_engine_failure()
        .shape("GetIntegral(id, contour)", || {
            result.invoke("GetIntegral", &[id.clone(), Variant::Object(contour.clone())])
        })
        .shape("GetIntegral(id)", || result.invoke("GetIntegral", &[id.clone()]))
        .resolve()
        .map_err(|err| extraction(format!("integral {integral_id}: {}", err.message())))?
        .value;
    let components = decompose(&unwrap_value(raw))
        .map_err(|e| extraction(format!("integral {integral_id}: {e}")))?;
    debug!(integral_id, added, components = components.len(), "integral evaluated");
    Ok(components)
}
