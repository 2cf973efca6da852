//! Topological thinning of classified volumes.
//!
//! Candidates are grouped into priority buckets and eroded one bucket at a
//! time, direction by direction, keeping only points whose removal leaves
//! the topology intact. End conditions freeze curve or surface extremities.

pub mod config;
pub mod classify;
pub mod bucket;
pub mod rules;
pub mod scheduler;
pub mod chamfer;

pub use config::{ChangeDirection, EndPointPolicy, ThinningConfig, ValueOrdering};
pub use classify::{apply_anchors, binarize, threshold, VoxelState, FOREGROUND};
pub use scheduler::{thin, ThinningReport};
pub use chamfer::{chamfer_distance, thin_with_chamfer, ChamferMask};
