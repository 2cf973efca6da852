//! Writing tree attributes back into a volume

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::volume::Volume;
use crate::voxel_tree::{TreePoint, VoxelTree};

/// Per-voxel value written by [`VoxelTree::to_image`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeAttribute {
    /// Component label of the edge or junction
    #[default]
    Component,
    BranchLabel,
    BranchOrder,
}

impl VoxelTree {
    /// Volume holding `attribute` on every tree voxel, 0 elsewhere
    pub fn to_image(&self, attribute: TreeAttribute) -> Result<Volume<u32>> {
        let value = |component: u32, p: &TreePoint| match attribute {
            TreeAttribute::Component => component,
            TreeAttribute::BranchLabel => p.branch_label,
            TreeAttribute::BranchOrder => p.branch_order,
        };

        let edge_values = self
            .edges
            .par_iter()
            .flat_map_iter(|e| e.points.iter().map(move |p| (p.coords, value(e.label, p))));
        let junction_values = self
            .junctions
            .par_iter()
            .flat_map_iter(|j| j.voxels.iter().map(move |p| (p.coords, value(j.label, p))));
        let values: Vec<([usize; 3], u32)> = edge_values.chain(junction_values).collect();

        let mut image = Volume::new(self.dims, 0u32)?.with_voxel_size(self.voxel_size);
        for ([x, y, z], v) in values {
            image.set(x, y, z, v);
        }
        Ok(image)
    }
}
