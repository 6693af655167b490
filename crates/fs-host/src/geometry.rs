//! Geometry mutation: entity, region, vertex and rectangle-selection moves.
//!
//! Atomic moves (one call on a block or selection) are always preferred; the
//! per-vertex fallback deduplicates vertices by rounded coordinate so a vertex
//! shared between adjacent blocks moves exactly once.

use std::collections::HashSet;

use fs_core::{Point2, Real, Rect, VERTEX_KEY_DECIMALS, coord_key};
use tracing::{debug, warn};

use crate::capability::{MoveMethod, MoveReport};
use crate::dispatch::{
    call_object, count, items, read_f64, read_object, read_string, same_name, write,
};
use crate::error::{DispatchError, DispatchResult, HostError, HostResult};
use crate::resolver::{Resolved, SignatureResolver, Unresolved};
use crate::session::Session;
use crate::variant::{ObjectRef, Variant};

/// A movable vertex as exposed by the host.
#[derive(Clone)]
pub enum VertexHandle {
    /// A geometry vertex with a `Point` member.
    Entity(ObjectRef),
    /// A bare point value with `X`/`Y` members.
    Point(ObjectRef),
}

impl VertexHandle {
    pub fn position(&self) -> DispatchResult<Point2> {
        match self {
            VertexHandle::Entity(v) => point_of(&read_object(v, "Point")?),
            VertexHandle::Point(p) => point_of(p),
        }
    }
}

fn point_of(p: &ObjectRef) -> DispatchResult<Point2> {
    Ok(Point2::new(read_f64(p, "X")?, read_f64(p, "Y")?))
}

fn classify_vertex(obj: ObjectRef) -> Option<(VertexHandle, Point2)> {
    let entity = VertexHandle::Entity(obj.clone());
    if let Ok(p) = entity.position() {
        return Some((entity, p));
    }
    let point = VertexHandle::Point(obj);
    point.position().ok().map(|p| (point, p))
}

fn vertex_key(p: Point2) -> (i64, i64) {
    (coord_key(p.x, VERTEX_KEY_DECIMALS), coord_key(p.y, VERTEX_KEY_DECIMALS))
}

/// Move one entity by `(dx, dy)`. Returns the accepted call shape.
pub fn move_entity(
    session: &Session,
    entity: &ObjectRef,
    dx: Real,
    dy: Real,
) -> Result<&'static str, Unresolved> {
    SignatureResolver::new("move entity")
        .shape("Move(vector)", || {
            let v = session.point_xy(dx, dy)?;
            entity.invoke("Move", &[v]).map(|_| ())
        })
        .shape("Move(dx, dy)", || {
            entity.invoke("Move", &[dx.into(), dy.into()]).map(|_| ())
        })
        .shape("Move()", || entity.invoke("Move", &[]).map(|_| ()))
        .shape("Point = PointXY", || assign_point(session, entity, dx, dy))
        .shape("Point.X/Y", || shift_point_fields(entity, dx, dy))
        .resolve()
        .map(|r| r.shape)
}

fn assign_point(session: &Session, entity: &ObjectRef, dx: Real, dy: Real) -> DispatchResult<()> {
    let p = point_of(&read_object(entity, "Point")?)?;
    let moved = session.point_xy(p.x + dx, p.y + dy)?;
    write(entity, "Point", moved)
}

fn shift_point_fields(entity: &ObjectRef, dx: Real, dy: Real) -> DispatchResult<()> {
    let point = read_object(entity, "Point")?;
    shift_xy(&point, dx, dy)
}

fn shift_xy(point: &ObjectRef, dx: Real, dy: Real) -> DispatchResult<()> {
    let p = point_of(point)?;
    write(point, "X", Variant::Real(p.x + dx))?;
    write(point, "Y", Variant::Real(p.y + dy))
}

fn move_vertex(session: &Session, vertex: &VertexHandle, dx: Real, dy: Real) -> bool {
    match vertex {
        VertexHandle::Entity(v) => move_entity(session, v, dx, dy).is_ok(),
        VertexHandle::Point(p) => shift_xy(p, dx, dy).is_ok(),
    }
}

/// One atomic move of a block, range or selection.
pub fn atomic_move(
    session: &Session,
    target: &ObjectRef,
    dx: Real,
    dy: Real,
) -> Result<Resolved<()>, Unresolved> {
    SignatureResolver::new("atomic move")
        .shape("Move(0, vector)", || {
            let v = session.point_xy(dx, dy)?;
            target.invoke("Move", &[Variant::Int(0), v]).map(|_| ())
        })
        .shape("Move(vector)", || {
            let v = session.point_xy(dx, dy)?;
            target.invoke("Move", &[v]).map(|_| ())
        })
        .shape("Move(dx, dy)", || {
            target.invoke("Move", &[dx.into(), dy.into()]).map(|_| ())
        })
        .resolve()
}

/// Move a whole block, falling back to its vertices.
pub fn move_region(
    session: &Session,
    region: &ObjectRef,
    dx: Real,
    dy: Real,
) -> HostResult<MoveReport> {
    match atomic_move(session, region, dx, dy) {
        Ok(r) => Ok(MoveReport {
            moved: 1,
            total: 1,
            method: MoveMethod::Selection(r.shape),
        }),
        Err(err) => {
            debug!(error = %err, "atomic region move rejected, moving vertices");
            let vertices = dedupe_vertices(block_vertex_objects(region).unwrap_or_default());
            let (moved, total) = move_vertex_set(session, &vertices, dx, dy);
            if moved == 0 {
                return Err(HostError::Move {
                    target: region.type_name().to_string(),
                    detail: err.message(),
                });
            }
            Ok(MoveReport {
                moved,
                total,
                method: MoveMethod::Vertices,
            })
        }
    }
}

/// The model's block collection.
pub fn blocks(session: &Session) -> DispatchResult<ObjectRef> {
    read_object(&session.shapes()?, "Blocks")
}

fn as_members(obj: ObjectRef) -> Vec<ObjectRef> {
    if count(&obj).is_some() { items(&obj) } else { vec![obj] }
}

fn labeled_lookup(
    col: &ObjectRef,
    method: &str,
    args: &[Variant],
) -> DispatchResult<Vec<ObjectRef>> {
    let found = as_members(call_object(col, method, args)?);
    if found.is_empty() {
        Err(DispatchError::raised(col.type_name(), method, "no matching blocks"))
    } else {
        Ok(found)
    }
}

/// Every block carrying `label`.
pub fn find_regions(session: &Session, label: &str) -> HostResult<Vec<ObjectRef>> {
    let col = blocks(session)?;
    let name = Variant::from(label);
    let blank = Variant::from("");
    let resolved = SignatureResolver::new("find region")
        .shape("LabeledAs(label)", || labeled_lookup(&col, "LabeledAs", &[name.clone()]))
        .shape("LabeledAs(\"\", \"\", label)", || {
            labeled_lookup(&col, "LabeledAs", &[blank.clone(), blank.clone(), name.clone()])
        })
        .shape("GetLabeledAs(label)", || labeled_lookup(&col, "GetLabeledAs", &[name.clone()]))
        .shape("scan", || {
            let found: Vec<ObjectRef> = items(&col)
                .into_iter()
                .filter(|b| read_string(b, "Label").is_ok_and(|l| same_name(&l, label)))
                .collect();
            if found.is_empty() {
                Err(DispatchError::raised("Blocks", "Label", "no block with this label"))
            } else {
                Ok(found)
            }
        })
        .resolve();
    resolved.map(|r| r.value).map_err(|_| HostError::NotFound {
        what: "region",
        name: label.to_string(),
    })
}

/// First block carrying `label`.
pub fn find_region(session: &Session, label: &str) -> HostResult<ObjectRef> {
    find_regions(session, label)?
        .into_iter()
        .next()
        .ok_or_else(|| HostError::NotFound {
            what: "region",
            name: label.to_string(),
        })
}

/// Block labels in model order, without duplicates.
pub fn list_region_labels(session: &Session) -> HostResult<Vec<String>> {
    let col = blocks(session)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for block in items(&col) {
        if let Ok(label) = read_string(&block, "Label") {
            let label = label.trim().to_string();
            if !label.is_empty() && seen.insert(label.to_lowercase()) {
                out.push(label);
            }
        }
    }
    Ok(out)
}

fn rect_from_members(obj: &ObjectRef) -> DispatchResult<Rect> {
    Ok(Rect::new(
        read_f64(obj, "Left")?,
        read_f64(obj, "Bottom")?,
        read_f64(obj, "Right")?,
        read_f64(obj, "Top")?,
    ))
}

fn block_vertex_objects(block: &ObjectRef) -> DispatchResult<Vec<ObjectRef>> {
    Ok(items(&read_object(block, "Vertices")?))
}

/// Bounding box of one block.
pub fn block_bounds(block: &ObjectRef) -> Option<Rect> {
    SignatureResolver::new("block bounds")
        .shape("Left/Bottom/Right/Top", || rect_from_members(block))
        .shape("Dimensions", || rect_from_members(&read_object(block, "Dimensions")?))
        .shape("vertex extents", || {
            let points = block_vertex_objects(block)?
                .into_iter()
                .filter_map(classify_vertex)
                .map(|(_, p)| p);
            Rect::from_points(points)
                .ok_or_else(|| DispatchError::raised(block.type_name(), "Vertices", "no vertices"))
        })
        .resolve()
        .ok()
        .map(|r| r.value)
}

/// Union of the bounding boxes of all blocks carrying any of `labels`.
pub fn union_bounds(session: &Session, labels: &[String]) -> HostResult<Rect> {
    let mut rects = Vec::new();
    for label in labels {
        for region in find_regions(session, label)? {
            let rect = block_bounds(&region).ok_or_else(|| HostError::NotFound {
                what: "bounds",
                name: label.clone(),
            })?;
            rects.push(rect);
        }
    }
    Rect::union_all(&rects).ok_or(HostError::NotFound {
        what: "region",
        name: labels.join(","),
    })
}

fn dedupe_vertices(objects: Vec<ObjectRef>) -> Vec<VertexHandle> {
    let mut seen = HashSet::new();
    objects
        .into_iter()
        .filter_map(classify_vertex)
        .filter(|(_, p)| seen.insert(vertex_key(*p)))
        .map(|(v, _)| v)
        .collect()
}

fn move_vertex_set(
    session: &Session,
    vertices: &[VertexHandle],
    dx: Real,
    dy: Real) -> (usize,
    usize,
) {
    let moved = vertices
        .iter()
        .filter(|v| move_vertex(session, v, dx, dy))
        .count();
    (moved, vertices.len())
}

/// Deduplicated vertices of every block carrying any of `labels`.
pub fn collect_vertices(session: &Session, labels: &[String]) -> HostResult<Vec<VertexHandle>> {
    let mut objects = Vec::new();
    for label in labels {
        for region in find_regions(session, label)? {
            objects.extend(block_vertex_objects(&region).unwrap_or_default());
        }
    }
    Ok(dedupe_vertices(objects))
}

/// Move the deduplicated vertex set of `labels`. Returns `(moved, total)`.
pub fn move_vertices_for_labels(
    session: &Session,
    labels: &[String],
    dx: Real,
    dy: Real,
) -> HostResult<(usize, usize)> {
    let vertices = collect_vertices(session, labels)?;
    let (moved, total) = move_vertex_set(session, &vertices, dx, dy);
    if moved < total {
        warn!(moved, total, "some vertices did not move");
    }
    Ok((moved, total))
}

/// Objects of `collection` lying inside `rect`.
pub fn select_in_rect(
    session: &Session,
    collection: &ObjectRef,
    rect: Rect,
) -> Result<ObjectRef, Unresolved> {
    SignatureResolver::new("select in rectangle")
        .shape("InRectangle(p1, p2)", || {
            let p1 = session.point_xy(rect.left, rect.bottom)?;
            let p2 = session.point_xy(rect.right, rect.top)?;
            call_object(collection, "InRectangle", &[p1, p2])
        })
        .shape("InRectangle(x1, y1, x2, y2)", || {
            let args = [rect.left, rect.bottom, rect.right, rect.top].map(Variant::Real);
            call_object(collection, "InRectangle", &args)
        })
        .resolve()
        .map(|r| r.value)
}

/// Select the blocks inside `rect` (grown by `epsilon`) and move them in one
/// call. `None` when nothing was selected or no move shape was accepted.
pub fn move_blocks_in_rect(
    session: &Session,
    rect: Rect,
    dx: Real,
    dy: Real,
    epsilon: Real,
) -> Option<MoveReport> {
    let area = rect.expanded(epsilon);
    let sources = [
        ("Blocks", blocks(session)),
        ("Selection", read_object(session.model(), "Selection")),
    ];
    for (source, col) in sources {
        let Ok(col) = col else { continue };
        let selection = match select_in_rect(session, &col, area) {
            Ok(sel) => sel,
            Err(err) => {
                debug!(source, error = %err, "rectangle selection unavailable");
                continue;
            }
        };
        let selected = count(&selection).unwrap_or(0).max(0) as usize;
        if selected == 0 {
            continue;
        }
        match atomic_move(session, &selection, dx, dy) {
            Ok(r) => {
                debug!(source, selected, shape = r.shape, "moved rectangle selection");
                return Some(MoveReport {
                    moved: selected,
                    total: selected,
                    method: MoveMethod::Selection(r.shape),
                });
            }
            Err(err) => debug!(source, error = %err, "selection move rejected"),
        }
    }
    None
}

/// Sweep-time group move: atomic rectangle selection first, then the
/// labels' vertices.
pub fn move_group(
    session: &Session,
    labels: &[String],
    rect: Rect,
    dx: Real,
    dy: Real,
) -> HostResult<MoveReport> {
    let epsilon = session.options().group_epsilon;
    if let Some(report) = move_blocks_in_rect(session, rect, dx, dy, epsilon) {
        return Ok(report);
    }
    let (moved, total) = move_vertices_for_labels(session, labels, dx, dy)?;
    if moved == 0 {
        return Err(HostError::Move {
            target: labels.join(","),
            detail: format!("moved 0 of {total} vertices"),
        });
    }
    Ok(MoveReport {
        moved,
        total,
        method: MoveMethod::Vertices,
    })
}

/// Move every vertex inside `rect` (grown by `epsilon`). Returns `(moved, total)`.
pub fn move_vertices_in_rect(
    session: &Session,
    rect: Rect,
    dx: Real,
    dy: Real,
    epsilon: Real,
) -> HostResult<(usize, usize)> {
    let area = rect.expanded(epsilon);
    let vertices = read_object(&session.shapes()?, "Vertices")?;
    let selection = select_in_rect(session, &vertices, area).map_err(|err| HostError::Move {
        target: format!("vertices in {area}"),
        detail: err.message(),
    })?;
    let selected = count(&selection).unwrap_or(0).max(0) as usize;
    if selected == 0 {
        return Ok((0, 0));
    }
    if atomic_move(session, &selection, dx, dy).is_ok() {
        return Ok((selected, selected));
    }
    let handles = dedupe_vertices(items(&selection));
    Ok(move_vertex_set(session, &handles, dx, dy))
}

/// Move the label markers named in `names`. Point assignment is tried first
/// since markers rarely support `Move`. Returns the number moved.
pub fn move_block_labels(
    session: &Session,
    names: &[String],
    dx: Real,
    dy: Real,
) -> HostResult<usize> {
    let labels = crate::fields::label_collection(session)?;
    let mut moved = 0;
    for marker in items(&labels) {
        let Ok(name) = read_string(&marker, "Name") else { continue };
        if !names.iter().any(|n| same_name(n, &name)) {
            continue;
        }
        let shape = SignatureResolver::new("move label marker")
            .shape("Point = PointXY", || assign_point(session, &marker, dx, dy))
            .shape("Point.X/Y", || shift_point_fields(&marker, dx, dy))
            .resolve()
            .map(|r| r.shape)
            .or_else(|_| atomic_move(session, &marker, dx, dy).map(|r| r.shape));
        match shape {
            Ok(shape) => {
                debug!(label = %name, shape, "moved label marker");
                moved += 1;
            }
            Err(err) => warn!(label = %name, error = %err, "label marker did not move"),
        }
    }
    Ok(moved)
}

/// Move the vertices of the current selection narrowed to `label`, falling
/// back to the labelled blocks' vertices.
pub fn move_vertices_by_block_label(
    session: &Session,
    label: &str,
    dx: Real,
    dy: Real,
) -> HostResult<(usize, usize)> {
    let via_selection = read_object(session.model(), "Selection")
        .and_then(|sel| call_object(&sel, "LabeledAs", &[Variant::from(label)]))
        .and_then(|sel| read_object(&sel, "Vertices"))
        .map(|v| items(&v));
    let handles = match via_selection {
        Ok(objects) if !objects.is_empty() => dedupe_vertices(objects),
        _ => collect_vertices(session, &[label.to_string()])?,
    };
    Ok(move_vertex_set(session, &handles, dx, dy))
}

/// Move every block carrying `label` as a whole. Returns the number moved.
pub fn move_shapes_by_label(
    session: &Session,
    label: &str,
    dx: Real,
    dy: Real,
) -> HostResult<usize> {
    let mut moved = 0;
    for region in find_regions(session, label)? {
        move_region(session, &region, dx, dy)?;
        moved += 1;
    }
    Ok(moved)
}

fn add_edge(
    shapes: &ObjectRef,
    session: &Session,
    from: &ObjectRef,
    to: &ObjectRef,
    a: Point2,
    b: Point2,
) -> DispatchResult<()> {
    SignatureResolver::new("add edge")
        .shape("AddEdge(v1, v2)", || {
            shapes
                .invoke("AddEdge", &[Variant::Object(from.clone()), Variant::Object(to.clone())])
                .map(|_| ())
        })
        .shape("AddEdge(p1, p2)", || {
            let p1 = session.point_xy(a.x, a.y)?;
            let p2 = session.point_xy(b.x, b.y)?;
            shapes.invoke("AddEdge", &[p1, p2]).map(|_| ())
        })
        .shape("AddEdgeXY(x1, y1, x2, y2)", || {
            let args = [a.x, a.y, b.x, b.y].map(Variant::Real);
            shapes.invoke("AddEdgeXY", &args).map(|_| ())
        })
        .resolve()
        .map(|_| ())
        .map_err(|err| DispatchError::raised(shapes.type_name(), "AddEdge", err.message()))
}

/// Draw `rect` shrunk by `inset`, rebuild, label the new block and drop a
/// label marker at its centre. Returns the drawn rectangle.
pub fn add_rect_with_block_label(
    session: &Session,
    rect: Rect,
    inset: Real,
    label: &str,
) -> HostResult<Rect> {
    let drawn = rect.inset(inset).ok_or_else(|| HostError::Move {
        target: format!("rectangle {rect}"),
        detail: "inset too large; rectangle collapsed".to_string(),
    })?;
    let shapes = session.shapes()?;
    let corners = drawn.corners();
    let mut vertices = Vec::with_capacity(corners.len());
    for c in corners {
        vertices.push(call_object(&shapes, "AddVertexXY", &[c.x.into(), c.y.into()])?);
    }
    for i in 0..corners.len() {
        let j = (i + 1) % corners.len();
        add_edge(&shapes, session, &vertices[i], &vertices[j], corners[i], corners[j])?;
    }
    session.rebuild();

    if !label.is_empty() {
        let sources = [blocks(session), read_object(session.model(), "Selection")];
        let labelled = sources.into_iter().flatten().any(|col| {
            select_in_rect(session, &col, drawn)
                .map(|sel| write(&sel, "Label", Variant::from(label)).is_ok())
                .unwrap_or(false)
        });
        if !labelled {
            warn!(label, "could not label the new block");
        }
        let c = drawn.center();
        if let Err(err) = crate::fields::add_label_marker(session, label, c) {
            warn!(label, error = %err, "could not place label marker");
        }
    }
    Ok(drawn)
}
