//! Voxel tree: edges bounded by junctions, built from a component image.
//!
//! Edges and junctions live in two arenas; an edge refers to the junction at
//! each of its ends by index. Junction incidence is derived by query.

pub mod build;
pub mod order;
pub mod prune;
pub mod image;

use crate::core::types::Vec3;

pub use image::TreeAttribute;
pub use prune::{prune, PruneConfig, PruneReport};

/// One skeleton voxel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreePoint {
    pub coords: [usize; 3],
    pub anchor: bool,
    pub branch_order: u32,
    pub branch_label: u32,
}

impl TreePoint {
    pub fn new(coords: [usize; 3], anchor: bool) -> Self {
        Self { coords, anchor, branch_order: 0, branch_label: 0 }
    }

    /// Voxel coordinates as a vector
    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.coords[0] as f32, self.coords[1] as f32, self.coords[2] as f32)
    }
}

/// Branch-order bookkeeping for an edge end or a junction
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BranchInfo {
    /// 0 while unset
    pub label: u32,
    /// 0 while unset
    pub order: u32,
    /// Path length to the anchors, in world units
    pub length: f32,
    /// Still waiting for a final order
    pub in_queue: bool,
}

impl BranchInfo {
    pub fn is_labeled(&self) -> bool {
        self.label > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Junctions at both ends
    Inner,
    /// At least one free extremity
    End,
}

/// Side of an edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeEnd {
    First,
    Last,
}

impl EdgeEnd {
    pub const BOTH: [EdgeEnd; 2] = [EdgeEnd::First, EdgeEnd::Last];

    pub fn other(self) -> Self {
        match self {
            EdgeEnd::First => EdgeEnd::Last,
            EdgeEnd::Last => EdgeEnd::First,
        }
    }
}

/// Chain of edge voxels between zero, one or two junctions
#[derive(Clone, Debug)]
pub struct Edge {
    /// Component label
    pub label: u32,
    pub kind: EdgeKind,
    /// Voxels ordered from the first end to the last
    pub points: Vec<TreePoint>,
    pub first_junction: Option<usize>,
    pub last_junction: Option<usize>,
    /// World length, including the steps to the junction centroids
    pub length: f32,
    pub first_info: BranchInfo,
    pub last_info: BranchInfo,
}

impl Edge {
    pub fn junction(&self, end: EdgeEnd) -> Option<usize> {
        match end {
            EdgeEnd::First => self.first_junction,
            EdgeEnd::Last => self.last_junction,
        }
    }

    pub fn info(&self, end: EdgeEnd) -> &BranchInfo {
        match end {
            EdgeEnd::First => &self.first_info,
            EdgeEnd::Last => &self.last_info,
        }
    }

    pub fn info_mut(&mut self, end: EdgeEnd) -> &mut BranchInfo {
        match end {
            EdgeEnd::First => &mut self.first_info,
            EdgeEnd::Last => &mut self.last_info,
        }
    }

    /// Voxel at an end of the chain
    pub fn end_point(&self, end: EdgeEnd) -> &TreePoint {
        match end {
            EdgeEnd::First => &self.points[0],
            EdgeEnd::Last => &self.points[self.points.len() - 1],
        }
    }

    pub fn junction_count(&self) -> usize {
        self.first_junction.is_some() as usize + self.last_junction.is_some() as usize
    }

    pub fn has_anchor(&self) -> bool {
        self.points.iter().any(|p| p.anchor)
    }

    pub fn voxel_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_end_edge(&self) -> bool {
        self.kind == EdgeKind::End
    }

    /// Highest order carried by either end
    pub fn order(&self) -> u32 {
        self.first_info.order.max(self.last_info.order)
    }
}

/// Connected cluster of junction voxels, seen as a single node
#[derive(Clone, Debug)]
pub struct Junction {
    /// Component label
    pub label: u32,
    pub voxels: Vec<TreePoint>,
    /// Centroid, in voxel coordinates
    pub center: Vec3,
    pub anchor: bool,
    pub info: BranchInfo,
}

/// Skeleton graph of edges and junctions
#[derive(Clone, Debug)]
pub struct VoxelTree {
    dims: [usize; 3],
    voxel_size: Vec3,
    edges: Vec<Edge>,
    junctions: Vec<Junction>,
}

impl VoxelTree {
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.junctions
    }

    /// Number of components, edges and junctions together
    pub fn component_count(&self) -> usize {
        self.edges.len() + self.junctions.len()
    }

    pub fn has_anchors(&self) -> bool {
        self.edges.iter().any(Edge::has_anchor) || self.junctions.iter().any(|j| j.anchor)
    }

    pub fn end_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_end_edge()).count()
    }

    /// Edge ends attached to junction `j`
    pub fn incident_edges(&self, j: usize) -> Vec<(usize, EdgeEnd)> {
        let mut incident = Vec::new();
        for (e, edge) in self.edges.iter().enumerate() {
            for end in EdgeEnd::BOTH {
                if edge.junction(end) == Some(j) {
                    incident.push((e, end));
                }
            }
        }
        incident
    }

    /// Incidence lists of every junction, computed in one pass
    pub(crate) fn incidence(&self) -> Vec<Vec<(usize, EdgeEnd)>> {
        let mut incidence = vec![Vec::new(); self.junctions.len()];
        for (e, edge) in self.edges.iter().enumerate() {
            for end in EdgeEnd::BOTH {
                if let Some(j) = edge.junction(end) {
                    incidence[j].push((e, end));
                }
            }
        }
        incidence
    }

    /// World position of a voxel
    #[inline]
    pub fn world(&self, p: &TreePoint) -> Vec3 {
        p.position() * self.voxel_size
    }

    /// World position of a junction centroid
    #[inline]
    pub fn junction_world(&self, j: usize) -> Vec3 {
        self.junctions[j].center * self.voxel_size
    }
}
