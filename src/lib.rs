//! Skeletree - Topological thinning and voxel trees for 3D volumes

pub mod core;
pub mod volume;
pub mod topology;
pub mod thinning;
pub mod component;
pub mod voxel_tree;
pub mod tree;
pub mod pipeline;

pub use crate::core::{Error, Result};
