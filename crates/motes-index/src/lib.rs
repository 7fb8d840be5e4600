//! Spatial indexing abstractions for particle neighborhood queries.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of entries a node holds directly before it subdivides.
pub const NODE_CAPACITY: usize = 4;

/// Depth at which nodes stop subdividing and keep overflow entries inline.
///
/// Coincident points (for example a burst of particles spawned on one click)
/// would otherwise split the same corner forever.
pub const MAX_DEPTH: u8 = 12;

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// The root boundary cannot partition the plane (non-finite or negative extent).
    #[error("invalid boundary: {0}")]
    InvalidBoundary(&'static str),
}

/// Axis-aligned rectangle used for partition cells and range queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Boundary {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Boundary {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square-ish region spanning `half_width`/`half_height` on each side of a center point.
    #[must_use]
    pub fn centered(cx: f32, cy: f32, half_width: f32, half_height: f32) -> Self {
        Self::new(
            cx - half_width,
            cy - half_height,
            half_width * 2.0,
            half_height * 2.0,
        )
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether the point lies inside the rectangle; all four edges are inclusive.
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Rectangle overlap test, inclusive of shared edges.
    #[must_use]
    pub fn intersects(&self, other: &Boundary) -> bool {
        !(other.x > self.right()
            || other.right() < self.x
            || other.y > self.bottom()
            || other.bottom() < self.y)
    }

    /// Equal quadrants in northwest, northeast, southwest, southeast order.
    #[must_use]
    pub fn quadrants(&self) -> [Boundary; 4] {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        [
            Boundary::new(self.x, self.y, half_w, half_h),
            Boundary::new(self.x + half_w, self.y, half_w, half_h),
            Boundary::new(self.x, self.y + half_h, half_w, half_h),
            Boundary::new(self.x + half_w, self.y + half_h, half_w, half_h),
        ]
    }

    /// Reject rectangles that cannot serve as a root cell.
    pub fn validate(&self) -> Result<(), IndexError> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(IndexError::InvalidBoundary("coordinates must be finite"));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(IndexError::InvalidBoundary("extent must be non-negative"));
        }
        Ok(())
    }
}

/// Common behaviour exposed by neighborhood indices.
pub trait NeighborhoodIndex {
    /// Rebuild internal structures from scratch using the supplied positions.
    ///
    /// Entry ids handed to visitors are offsets into `positions`.
    fn rebuild(&mut self, bounds: Boundary, positions: &[(f32, f32)]) -> Result<(), IndexError>;

    /// Visit every stored entry whose position lies inside `range`.
    fn query_range(&self, range: &Boundary, visitor: &mut dyn FnMut(usize));
}

/// Stored point reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub id: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
struct Node {
    boundary: Boundary,
    depth: u8,
    entries: Vec<Entry>,
    /// Arena offset of the northwest child; the other three follow contiguously.
    children: Option<usize>,
}

impl Node {
    fn new(boundary: Boundary, depth: u8) -> Self {
        Self {
            boundary,
            depth,
            entries: Vec::with_capacity(NODE_CAPACITY),
            children: None,
        }
    }
}

/// Region quadtree whose nodes live in a flat arena and reference children by offset.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<Node>,
    len: usize,
}

impl QuadTree {
    /// Create an empty tree covering `boundary`.
    #[must_use]
    pub fn new(boundary: Boundary) -> Self {
        Self {
            nodes: vec![Node::new(boundary, 0)],
            len: 0,
        }
    }

    /// Root boundary of the tree.
    #[must_use]
    pub fn boundary(&self) -> Boundary {
        self.nodes[0].boundary
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop every node and entry, keeping a fresh root over `boundary`.
    pub fn reset(&mut self, boundary: Boundary) {
        self.nodes.clear();
        self.nodes.push(Node::new(boundary, 0));
        self.len = 0;
    }

    /// Insert a point reference. Returns `false` when the point lies outside the root boundary.
    ///
    /// Full nodes subdivide once and hand the point to the first quadrant (NW, NE, SW, SE)
    /// that contains it, so points on shared edges land in the earliest quadrant.
    pub fn insert(&mut self, id: usize, x: f32, y: f32) -> bool {
        if !self.nodes[0].boundary.contains(x, y) {
            return false;
        }
        let entry = Entry { id, x, y };
        let mut current = 0;
        loop {
            let node = &self.nodes[current];
            if node.entries.len() < NODE_CAPACITY || node.depth >= MAX_DEPTH {
                self.nodes[current].entries.push(entry);
                self.len += 1;
                return true;
            }
            let first_child = match node.children {
                Some(first) => first,
                None => self.subdivide(current),
            };
            let next = (first_child..first_child + 4)
                .find(|&child| self.nodes[child].boundary.contains(x, y));
            match next {
                Some(child) => current = child,
                // Quadrant arithmetic can round a point off the seam; keep it here.
                None => {
                    self.nodes[current].entries.push(entry);
                    self.len += 1;
                    return true;
                }
            }
        }
    }

    fn subdivide(&mut self, parent: usize) -> usize {
        let first = self.nodes.len();
        let depth = self.nodes[parent].depth + 1;
        for quadrant in self.nodes[parent].boundary.quadrants() {
            self.nodes.push(Node::new(quadrant, depth));
        }
        self.nodes[parent].children = Some(first);
        first
    }

    /// Visit stored entries whose position falls inside `range`.
    pub fn visit_range(&self, range: &Boundary, visitor: &mut dyn FnMut(&Entry)) {
        let mut stack = vec![0usize];
        while let Some(current) = stack.pop() {
            let node = &self.nodes[current];
            if !node.boundary.intersects(range) {
                continue;
            }
            for entry in &node.entries {
                if range.contains(entry.x, entry.y) {
                    visitor(entry);
                }
            }
            if let Some(first) = node.children {
                stack.extend(first..first + 4);
            }
        }
    }

    /// Collect ids inside `range`. Order depends on insertion history and carries no meaning.
    #[must_use]
    pub fn query(&self, range: &Boundary) -> Vec<usize> {
        let mut found = Vec::new();
        self.visit_range(range, &mut |entry| found.push(entry.id));
        found
    }
}

impl Default for QuadTree {
    fn default() -> Self {
        Self::new(Boundary::default())
    }
}

impl NeighborhoodIndex for QuadTree {
    fn rebuild(&mut self, bounds: Boundary, positions: &[(f32, f32)]) -> Result<(), IndexError> {
        bounds.validate()?;
        self.reset(bounds);
        for (id, &(x, y)) in positions.iter().enumerate() {
            self.insert(id, x, y);
        }
        Ok(())
    }

    fn query_range(&self, range: &Boundary, visitor: &mut dyn FnMut(usize)) {
        self.visit_range(range, &mut |entry| visitor(entry.id));
    }
}
