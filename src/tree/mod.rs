//! Exported skeleton tree: world-space points and the edges through them

pub mod vtk;

use crate::core::types::Vec3;
use crate::voxel_tree::{EdgeEnd, EdgeKind, VoxelTree};

pub use vtk::{save_vtk, write_edge_vtk, write_vtk, OutputLayout, PointColor, VtkOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointKind {
    /// Sample inside an edge chain
    Edge,
    /// Representative of a junction, at its centroid
    Junction,
    /// Free extremity of an edge
    End,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// World position
    pub position: Vec3,
    pub kind: PointKind,
    pub anchor: bool,
    pub branch_label: u32,
    pub branch_order: u32,
    pub component: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeEdge {
    pub kind: EdgeKind,
    /// Component label of the edge
    pub label: u32,
    /// Indices into [`Tree::points`], junction points included at the ends
    pub points: Vec<usize>,
}

/// Point/edge view of a voxel tree
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    pub points: Vec<Point>,
    pub edges: Vec<TreeEdge>,
}

impl Tree {
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Points of an edge, in order
    pub fn edge_points<'a>(&'a self, edge: &'a TreeEdge) -> impl Iterator<Item = &'a Point> + 'a {
        edge.points.iter().map(move |&i| &self.points[i])
    }
}

impl VoxelTree {
    /// Convert to world-space points and edges. Junction points come first,
    /// one per junction.
    pub fn to_tree(&self) -> Tree {
        let mut points = Vec::with_capacity(
            self.junctions().len() + self.edges().iter().map(|e| e.points.len()).sum::<usize>(),
        );
        for (j, junction) in self.junctions().iter().enumerate() {
            points.push(Point {
                position: self.junction_world(j),
                kind: PointKind::Junction,
                anchor: junction.anchor,
                branch_label: junction.info.label,
                branch_order: junction.info.order,
                component: junction.label,
            });
        }

        let mut edges = Vec::with_capacity(self.edges().len());
        for edge in self.edges() {
            let last = edge.points.len() - 1;
            let mut indices = Vec::with_capacity(edge.points.len() + 2);
            if let Some(j) = edge.junction(EdgeEnd::First) {
                indices.push(j);
            }
            for (i, p) in edge.points.iter().enumerate() {
                let free_end = (i == 0 && edge.first_junction.is_none())
                    || (i == last && edge.last_junction.is_none());
                indices.push(points.len());
                points.push(Point {
                    position: self.world(p),
                    kind: if free_end { PointKind::End } else { PointKind::Edge },
                    anchor: p.anchor,
                    branch_label: p.branch_label,
                    branch_order: p.branch_order,
                    component: edge.label,
                });
            }
            if let Some(j) = edge.junction(EdgeEnd::Last) {
                indices.push(j);
            }
            edges.push(TreeEdge { kind: edge.kind, label: edge.label, points: indices });
        }

        Tree { points, edges }
    }
}
