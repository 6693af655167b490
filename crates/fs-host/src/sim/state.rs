//! In-memory model behind the simulated engine.

use std::collections::{BTreeMap, HashMap, HashSet};

use fs_core::{Point2, Real, Rect, VERTEX_KEY_DECIMALS, coord_key};

use super::dialect::{SimDialect, SimFaults};

/// Operation counters for assertions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimStats {
    /// Accepted geometry move calls (entity, block or selection).
    pub move_calls: usize,
    /// Individual vertex displacements applied.
    pub vertex_translations: usize,
    pub mesh_builds: usize,
    pub mesh_removals: usize,
    pub solve_calls: usize,
    pub solves_completed: usize,
    pub busy_polls: usize,
    pub analyses: usize,
    pub integrals: usize,
    pub field_writes: usize,
    pub data_doc_saves: usize,
    pub problem_saves: usize,
    pub rebuilds: usize,
    pub opened_problem: Option<String>,
    pub opened_model: Option<String>,
    pub saved_as: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimBlock {
    pub label: String,
    /// Vertex indices in ring order.
    pub ring: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimLabel {
    pub name: String,
    pub marker: Option<Point2>,
    pub content: BTreeMap<String, Real>,
}

/// Geometry and label fixture for a simulated engine.
///
/// Vertices are pooled by rounded coordinate, so rectangles that touch share
/// their common corners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimModel {
    pub vertices: Vec<Point2>,
    pub blocks: Vec<SimBlock>,
    pub labels: Vec<SimLabel>,
}

impl SimModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the vertex at `p`, adding it if absent.
    pub fn vertex_at(&mut self, p: Point2) -> usize {
        let key = point_key(p);
        match self.vertices.iter().position(|v| point_key(*v) == key) {
            Some(i) => i,
            None => {
                self.vertices.push(p);
                self.vertices.len() - 1
            }
        }
    }

    /// Add an axis-aligned rectangular block.
    pub fn with_rect_block(mut self, label: &str, rect: Rect) -> Self {
        let ring = rect.corners().into_iter().map(|c| self.vertex_at(c)).collect();
        self.blocks.push(SimBlock {
            label: label.to_string(),
            ring,
        });
        self
    }

    /// Add a block label with its content fields.
    pub fn with_label(
        mut self,
        name: &str,
        marker: Option<Point2>,
        fields: &[(&str, Real)],
    ) -> Self {
        self.labels.push(SimLabel {
            name: name.to_string(),
            marker,
            content: fields.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        });
        self
    }
}

pub(crate) fn point_key(p: Point2) -> (i64, i64) {
    (coord_key(p.x, VERTEX_KEY_DECIMALS), coord_key(p.y, VERTEX_KEY_DECIMALS))
}

/// Shared mutable engine state.
pub(crate) struct SimState {
    pub model: SimModel,
    pub pending_edges: Vec<(usize, usize)>,
    pub mesh_built: bool,
    pub solved: bool,
    pub model_loaded: bool,
    pub busy_remaining: usize,
    pub contour: Vec<String>,
    pub coupling: Real,
    pub dialect: SimDialect,
    pub faults: SimFaults,
    pub stats: SimStats,
}

impl SimState {
    pub fn new(model: SimModel, dialect: SimDialect) -> Self {
        Self {
            model,
            pending_edges: Vec::new(),
            mesh_built: false,
            solved: false,
            model_loaded: true,
            busy_remaining: 0,
            contour: Vec::new(),
            coupling: 1.0,
            dialect,
            faults: SimFaults::default(),
            stats: SimStats::default(),
        }
    }

    pub fn blocks_labeled(&self, label: &str) -> Vec<usize> {
        self.model
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.label.trim().eq_ignore_ascii_case(label.trim()))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn block_rect(&self, block: usize) -> Option<Rect> {
        let b = self.model.blocks.get(block)?;
        Rect::from_points(b.ring.iter().filter_map(|&v| self.model.vertices.get(v).copied()))
    }

    /// Unique vertex indices of `blocks`, in first-seen order.
    pub fn block_vertices(&self, blocks: &[usize]) -> Vec<usize> {
        let mut seen = HashSet::new();
        blocks
            .iter()
            .filter_map(|&b| self.model.blocks.get(b))
            .flat_map(|b| b.ring.iter().copied())
            .filter(|v| seen.insert(*v))
            .collect()
    }

    pub fn blocks_in_rect(&self, ids: &[usize], rect: Rect) -> Vec<usize> {
        ids.iter()
            .copied()
            .filter(|&b| self.block_rect(b).is_some_and(|r| rect.contains_rect(&r)))
            .collect()
    }

    pub fn vertices_in_rect(&self, ids: &[usize], rect: Rect) -> Vec<usize> {
        ids.iter()
            .copied()
            .filter(|&v| self.model.vertices.get(v).is_some_and(|p| rect.contains_point(*p)))
            .collect()
    }

    /// Reserve one move call; `Err` once geometry is locked.
    pub fn begin_move(&mut self) -> Result<(), String> {
        if let Some(limit) = self.faults.lock_geometry_after
            && self.stats.move_calls >= limit
        {
            return Err("geometry is locked".to_string());
        }
        self.stats.move_calls += 1;
        Ok(())
    }

    pub fn translate(&mut self, vertices: &[usize], dx: Real, dy: Real) {
        for &v in vertices {
            if let Some(p) = self.model.vertices.get_mut(v) {
                *p = p.offset(dx, dy);
                self.stats.vertex_translations += 1;
            }
        }
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.mesh_built = false;
        self.solved = false;
    }

    pub fn total_loading(&self) -> Real {
        self.model
            .labels
            .iter()
            .filter_map(|l| l.content.get("Loading"))
            .sum()
    }

    /// Integral over the current contour: `coupling * loading * centroid`,
    /// where the centroid is taken over the contour blocks' vertices.
    pub fn integral(&self) -> Option<Point2> {
        let blocks: Vec<usize> = self
            .contour
            .iter()
            .flat_map(|label| self.blocks_labeled(label))
            .collect();
        let vertices = self.block_vertices(&blocks);
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as Real;
        let (sx, sy) = vertices
            .iter()
            .filter_map(|&v| self.model.vertices.get(v))
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let k = self.coupling * self.total_loading();
        Some(Point2::new(k * sx / n, k * sy / n))
    }

    /// Turn pending edges into a block when they close a single ring.
    pub fn close_pending_ring(&mut self) -> bool {
        if self.pending_edges.len() < 3 {
            return false;
        }
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(a, b) in &self.pending_edges {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
        if adjacency.values().any(|n| n.len() != 2) {
            return false;
        }
        let Some(&(start, mut next)) = self.pending_edges.first() else {
            return false;
        };
        let mut ring = vec![start];
        let mut prev = start;
        while next != start {
            ring.push(next);
            let Some(&after) = adjacency
                .get(&next)
                .and_then(|n| n.iter().find(|&&v| v != prev))
            else {
                return false;
            };
            prev = next;
            next = after;
            if ring.len() > self.pending_edges.len() {
                return false;
            }
        }
        if ring.len() != self.pending_edges.len() {
            return false;
        }
        self.model.blocks.push(SimBlock {
            label: String::new(),
            ring,
        });
        self.pending_edges.clear();
        self.invalidate();
        true
    }
}
