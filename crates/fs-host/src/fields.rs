//! Block-label field assignment (case application) and label markers.

use fs_core::{Point2, Real, Tolerances, nearly_equal};
use tracing::{debug, warn};

use crate::dispatch::{call_object, items, read_f64, read_object, read_string, same_name, write};
use crate::error::{DispatchError, HostError, HostResult};
use crate::resolver::SignatureResolver;
use crate::session::Session;
use crate::variant::{ObjectRef, Variant};

/// Label type index of block labels.
const BLOCK_LABELS: i64 = 3;

/// The block-label collection, from the data document or the problem.
pub fn label_collection(session: &Session) -> HostResult<ObjectRef> {
    let problem = session.problem();
    let kind = [Variant::Int(BLOCK_LABELS)];
    SignatureResolver::new("block labels")
        .shape("DataDoc.Labels(3)", || {
            call_object(&read_object(problem, "DataDoc")?, "Labels", &kind)
        })
        .shape("Problem.Labels(3)", || call_object(problem, "Labels", &kind))
        .resolve()
        .map(|r| r.value)
        .map_err(|err| HostError::NotFound {
            what: "block label collection",
            name: err.message(),
        })
}

fn labels_named(session: &Session, label: &str) -> HostResult<Vec<ObjectRef>> {
    Ok(items(&label_collection(session)?)
        .into_iter()
        .filter(|l| read_string(l, "Name").is_ok_and(|n| same_name(&n, label)))
        .collect())
}

/// Names of all block labels.
pub fn list_label_names(session: &Session) -> HostResult<Vec<String>> {
    Ok(items(&label_collection(session)?)
        .iter()
        .filter_map(|l| read_string(l, "Name").ok())
        .collect())
}

/// Current value of `field` on the first block label named `label`.
pub fn read_label_field(session: &Session, label: &str, field: &str) -> HostResult<Real> {
    let target = labels_named(session, label)?
        .into_iter()
        .next()
        .ok_or_else(|| HostError::NotFound {
            what: "block label",
            name: label.to_string(),
        })?;
    Ok(read_f64(&read_object(&target, "Content")?, field)?)
}

/// Field that carries a block's source loading.
const LOADING: &str = "Loading";

/// Assign `value` to `field` on every block label named `label`.
///
/// The content object is written back to the label afterwards, and the value
/// is read back to confirm it took effect. A `Loading` assignment is mirrored
/// into `LoadingEx` and switches the label to total-current mode. The label
/// data is then saved.
pub fn set_label_field(
    session: &Session,
    label: &str,
    field: &str,
    value: Real,
) -> HostResult<()> {
    let field_error = |detail: String| HostError::Field {
        label: label.to_string(),
        detail,
    };
    let targets = labels_named(session, label).map_err(|e| field_error(e.to_string()))?;
    if targets.is_empty() {
        return Err(field_error("block label not found".to_string()));
    }
    for target in &targets {
        let content = read_object(target, "Content").map_err(|e| field_error(e.to_string()))?;
        write(&content, field, Variant::Real(value))
            .map_err(|e| field_error(format!("cannot set {field}: {e}")))?;
        if field.eq_ignore_ascii_case(LOADING) {
            set_loading_companions(&content, label, value);
        }
        if let Err(e) = write(target, "Content", Variant::Object(content.clone())) {
            debug!(label, error = %e, "content write-back not accepted");
        }
        let stored = read_f64(&content, field).map_err(|e| field_error(e.to_string()))?;
        if !nearly_equal(stored, value, Tolerances::default()) {
            return Err(field_error(format!("{field} reads back {stored}, expected {value}")));
        }
    }
    save_label_data(session);
    debug!(label, field, value, labels = targets.len(), "field assigned");
    Ok(())
}

fn set_loading_companions(content: &ObjectRef, label: &str, value: Real) {
    if let Err(e) = write(content, "LoadingEx", Variant::Real(value)) {
        debug!(label, error = %e, "LoadingEx not set");
    }
    if let Err(e) = write(content, "TotalCurrent", Variant::Bool(true)) {
        debug!(label, error = %e, "TotalCurrent not set");
    }
}

/// Save the data document, then the problem. Both are attempted.
pub fn save_label_data(session: &Session) {
    let problem = session.problem();
    let data_doc = SignatureResolver::new("save data document")
        .shape("DataDoc.Save()", || read_object(problem, "DataDoc")?.invoke("Save", &[]))
        .resolve();
    let problem_doc = SignatureResolver::new("save problem")
        .shape("Problem.Save()", || problem.invoke("Save", &[]))
        .resolve();
    match (data_doc, problem_doc) {
        (Err(a), Err(b)) => {
            warn!(data_doc = %a.message(), problem = %b.message(), "label data not saved");
        }
        (Err(e), Ok(_)) => debug!(error = %e.message(), "data document not saved"),
        (Ok(_), Err(e)) => debug!(error = %e.message(), "problem not saved"),
        (Ok(_), Ok(_)) => {}
    }
}

/// Place a block-label marker named `name` at `at`.
pub fn add_label_marker(session: &Session, name: &str, at: Point2) -> HostResult<ObjectRef> {
    let labels = label_collection(session)?;
    let label = Variant::from(name);
    let added = SignatureResolver::new("add label marker")
        .shape("Add(point, name)", || {
            labels.invoke("Add", &[session.point_xy(at.x, at.y)?, label.clone()])
        })
        .shape("Add(point)", || labels.invoke("Add", &[session.point_xy(at.x, at.y)?]))
        .shape("Add(x, y, name)", || {
            labels.invoke("Add", &[at.x.into(), at.y.into(), label.clone()])
        })
        .shape("Add(x, y)", || labels.invoke("Add", &[at.x.into(), at.y.into()]))
        .resolve()
        .map_err(|err| HostError::Field {
            label: name.to_string(),
            detail: err.message(),
        })?;
    let marker = match added.value {
        Variant::Object(o) => o,
        _ => items(&labels)
            .pop()
            .ok_or_else(|| DispatchError::raised(labels.type_name(), "Add", "no marker returned"))?,
    };
    if let Err(e) = write(&marker, "Name", label) {
        warn!(name, error = %e, "could not name label marker");
    }
    Ok(marker)
}
