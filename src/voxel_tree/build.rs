//! Building the voxel tree from a component image

use std::collections::HashSet;
use std::time::Instant;

use crate::component::{ComponentImage, Label};
use crate::core::error::Error;
use crate::core::logging::elapsed_ms;
use crate::core::types::{try_reserve, Result, Vec3};
use crate::topology::{Connectivity, Neighbors};
use crate::volume::Volume;
use crate::voxel_tree::{BranchInfo, Edge, EdgeKind, Junction, TreePoint, VoxelTree};

impl VoxelTree {
    /// Build the tree of a component image. `anchors` (value > 0) marks the
    /// protected voxels; branch orders are left unset.
    pub fn build<L: Label>(image: &ComponentImage<L>, anchors: Option<&Volume<u8>>) -> Result<Self> {
        let start = Instant::now();
        if let Some(anchors) = anchors {
            image.labels().ensure_same_dims(anchors)?;
        }
        let dims = image.dims();
        let labels = image.labels();
        let neighbors = Neighbors::new(Connectivity::full(labels.is_planar()), dims);
        let is_anchor = |index: usize| anchors.is_some_and(|a| a.data()[index] > 0);

        // voxel indices of every component, in scan order
        let mut members: Vec<Vec<usize>> = Vec::new();
        try_reserve(&mut members, image.components().len(), "component members")?;
        for c in image.components() {
            let mut voxels = Vec::new();
            try_reserve(&mut voxels, c.size, "component voxels")?;
            members.push(voxels);
        }
        for index in 0..labels.len() {
            let label = image.label_at(index);
            if label > 0 {
                members[label as usize - 1].push(index);
            }
        }

        let edge_count = image.edge_count();
        let mut junctions = Vec::new();
        try_reserve(&mut junctions, image.junction_count(), "junctions")?;
        for (j, voxels) in members[edge_count..].iter().enumerate() {
            let points: Vec<TreePoint> = voxels
                .iter()
                .map(|&i| TreePoint::new(labels.coords(i), is_anchor(i)))
                .collect();
            let center = points.iter().map(TreePoint::position).sum::<Vec3>() / points.len().max(1) as f32;
            let anchor = points.iter().any(|p| p.anchor);
            junctions.push(Junction {
                label: (edge_count + j + 1) as u32,
                voxels: points,
                center,
                anchor,
                info: BranchInfo::default(),
            });
        }

        let mut tree = VoxelTree { dims, voxel_size: image.voxel_size(), edges: Vec::new(), junctions };
        try_reserve(&mut tree.edges, edge_count, "edges")?;

        for (e, voxels) in members[..edge_count].iter().enumerate() {
            let label = (e + 1) as u32;
            let chain = walk_chain(image, &neighbors, label, voxels)?;
            let (first_junction, last_junction) = end_junctions(image, &neighbors, label, &chain)?;

            let points: Vec<TreePoint> = chain
                .iter()
                .map(|&i| TreePoint::new(labels.coords(i), is_anchor(i)))
                .collect();
            let kind = if first_junction.is_some() && last_junction.is_some() {
                EdgeKind::Inner
            } else {
                EdgeKind::End
            };
            let mut edge = Edge {
                label,
                kind,
                points,
                first_junction,
                last_junction,
                length: 0.0,
                first_info: BranchInfo::default(),
                last_info: BranchInfo::default(),
            };
            edge.length = tree.edge_length(&edge);
            tree.edges.push(edge);
        }

        log::info!(
            "Voxel tree: {} edges ({} end edges), {} junctions in {:.1}ms",
            tree.edges.len(),
            tree.end_edge_count(),
            tree.junctions.len(),
            elapsed_ms(start)
        );
        Ok(tree)
    }

    /// Label `skeleton` and build its tree
    pub fn from_skeleton(skeleton: &Volume<u8>, anchors: Option<&Volume<u8>>) -> Result<Self> {
        let image = ComponentImage::<u32>::build(skeleton)?;
        Self::build(&image, anchors)
    }

    /// Euclidean arc length between chain samples `from..=to`
    pub(crate) fn arc_length(&self, points: &[TreePoint], from: usize, to: usize) -> f32 {
        if to <= from {
            return 0.0;
        }
        points[from..=to]
            .windows(2)
            .map(|w| self.world(&w[0]).distance(self.world(&w[1])))
            .sum()
    }

    /// Chain length plus the steps from each end to its junction centroid
    fn edge_length(&self, edge: &Edge) -> f32 {
        let last = edge.points.len() - 1;
        let mut length = self.arc_length(&edge.points, 0, last);
        if let Some(j) = edge.first_junction {
            length += self.world(&edge.points[0]).distance(self.junction_world(j));
        }
        if let Some(j) = edge.last_junction {
            length += self.world(&edge.points[last]).distance(self.junction_world(j));
        }
        length
    }
}

/// Order the voxels of edge component `label` along the chain
fn walk_chain<L: Label>(
    image: &ComponentImage<L>,
    neighbors: &Neighbors,
    label: u32,
    voxels: &[usize],
) -> Result<Vec<usize>> {
    let labels = image.labels();
    let same_label = |i: usize| {
        let mut found = Vec::with_capacity(2);
        neighbors.for_each(labels.coords(i), |j| {
            if image.label_at(j) == label {
                found.push(j);
            }
        });
        found
    };

    let mut start = None;
    for &v in voxels {
        let n = same_label(v).len();
        if n > 2 {
            return Err(Error::consistency(format!(
                "edge {} voxel {} has {} neighbors in the chain",
                label, v, n
            )));
        }
        if n <= 1 && start.is_none() {
            start = Some(v);
        }
    }
    let start = match start {
        Some(v) => v,
        None => {
            log::warn!("Edge {} is a closed loop of {} voxels", label, voxels.len());
            voxels[0]
        }
    };

    let mut chain = Vec::new();
    try_reserve(&mut chain, voxels.len(), "edge chain")?;
    let mut visited = HashSet::with_capacity(voxels.len());
    let mut current = Some(start);
    while let Some(v) = current {
        chain.push(v);
        visited.insert(v);
        current = same_label(v).into_iter().find(|j| !visited.contains(j));
    }

    if chain.len() != voxels.len() {
        return Err(Error::consistency(format!(
            "edge {} walk reached {} of {} voxels",
            label,
            chain.len(),
            voxels.len()
        )));
    }
    Ok(chain)
}

/// Junctions touching the first and last voxels of a chain
fn end_junctions<L: Label>(
    image: &ComponentImage<L>,
    neighbors: &Neighbors,
    label: u32,
    chain: &[usize],
) -> Result<(Option<usize>, Option<usize>)> {
    let edge_count = image.edge_count();
    let junctions_near = |i: usize| {
        let mut found: Vec<usize> = Vec::new();
        neighbors.for_each(image.labels().coords(i), |j| {
            let l = image.label_at(j);
            if image.is_junction(l) {
                let index = l as usize - edge_count - 1;
                if !found.contains(&index) {
                    found.push(index);
                }
            }
        });
        found
    };

    let first = junctions_near(chain[0]);
    if chain.len() == 1 {
        if first.len() > 2 {
            return Err(Error::consistency(format!(
                "single-voxel edge {} touches {} junctions",
                label,
                first.len()
            )));
        }
        return Ok((first.first().copied(), first.get(1).copied()));
    }

    let last = junctions_near(chain[chain.len() - 1]);
    for (side, found) in [("first", &first), ("last", &last)] {
        if found.len() > 1 {
            return Err(Error::consistency(format!(
                "{} end of edge {} touches {} junctions",
                side,
                label,
                found.len()
            )));
        }
    }
    Ok((first.first().copied(), last.first().copied()))
}
