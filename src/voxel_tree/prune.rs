//! Removing spurious end edges from a skeleton

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::logging::elapsed_ms;
use crate::core::types::Result;
use crate::volume::Volume;
use crate::voxel_tree::{Edge, VoxelTree};

/// Pruning thresholds. Unset fields disable the matching criterion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// End edges at most this long (world units) are erased
    pub min_length: Option<f32>,
    /// End edges with at most this many voxels are erased
    pub min_voxels: Option<usize>,
    /// Erase the smallest end edges while there are more than this
    pub max_end_edges: Option<usize>,
    /// Erase end edges above this branch order (needs anchors)
    pub max_order: Option<u32>,
}

impl PruneConfig {
    pub fn is_enabled(&self) -> bool {
        self.min_length.is_some()
            || self.min_voxels.is_some()
            || self.max_end_edges.is_some()
            || self.max_order.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_length.is_some_and(|l| !(l >= 0.0)) {
            return Err(Error::InvalidConfig(format!("min_length must be >= 0, got {:?}", self.min_length)));
        }
        if self.max_order == Some(0) {
            return Err(Error::InvalidConfig("max_order must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Only a voxel count was given: compare edges by size
    fn by_voxels(&self) -> bool {
        self.min_length.is_none() && self.min_voxels.is_some()
    }
}

/// What a pruning run removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Edges erased by length, size or count
    pub short_edges: usize,
    /// Edges erased by branch order
    pub high_order_edges: usize,
    /// Voxels cleared from the skeleton
    pub voxels: usize,
}

/// Prune `skeleton` in place and return the relabeled tree of what is left.
///
/// After every erasure the component image and the tree are rebuilt, so
/// junctions left with two edges merge back into a single edge.
pub fn prune(
    skeleton: &mut Volume<u8>,
    anchors: Option<&Volume<u8>>,
    config: &PruneConfig,
) -> Result<(VoxelTree, PruneReport)> {
    config.validate()?;
    let start = Instant::now();
    let mut report = PruneReport::default();
    let mut tree = VoxelTree::from_skeleton(skeleton, anchors)?;

    if config.min_length.is_some() || config.min_voxels.is_some() || config.max_end_edges.is_some() {
        while let Some(e) = smallest_spur(&tree, config) {
            let edge = &tree.edges()[e];
            let end_edges = tree.end_edge_count();
            let erase = config.max_end_edges.is_some_and(|m| end_edges > m)
                || config.min_length.is_some_and(|l| edge.length <= l)
                || config.min_voxels.is_some_and(|v| edge.voxel_count() <= v);
            if !erase {
                break;
            }
            log::debug!(
                "Pruning edge {}: {} voxels, length {:.2}, {} end edges",
                edge.label,
                edge.voxel_count(),
                edge.length,
                end_edges
            );
            report.voxels += erase_edge(skeleton, edge);
            report.short_edges += 1;
            tree = VoxelTree::from_skeleton(skeleton, anchors)?;
        }
    }

    let anchored = anchors.is_some() && tree.has_anchors();
    if let Some(max_order) = config.max_order {
        if anchored {
            loop {
                tree.compute_branch_order()?;
                let victims: Vec<usize> = tree
                    .edges()
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.is_end_edge() && !e.has_anchor() && e.order() > max_order)
                    .map(|(i, _)| i)
                    .collect();
                if victims.is_empty() {
                    break;
                }
                log::debug!("Pruning {} edges above order {}", victims.len(), max_order);
                for &e in &victims {
                    report.voxels += erase_edge(skeleton, &tree.edges()[e]);
                }
                report.high_order_edges += victims.len();
                tree = VoxelTree::from_skeleton(skeleton, anchors)?;
            }
        } else {
            log::warn!("Order pruning skipped: no anchors");
        }
    }

    if anchored {
        tree.compute_branch_order()?;
    }

    log::info!(
        "Pruning done in {:.1}ms: {} short and {} high-order edges, {} voxels removed",
        elapsed_ms(start),
        report.short_edges,
        report.high_order_edges,
        report.voxels
    );
    Ok((tree, report))
}

/// Smallest end edge hanging from exactly one junction, anchors excluded
fn smallest_spur(tree: &VoxelTree, config: &PruneConfig) -> Option<usize> {
    let by_voxels = config.by_voxels();
    let size = |e: &Edge| if by_voxels { e.voxel_count() as f32 } else { e.length };
    let mut smallest: Option<(usize, f32)> = None;
    for (i, edge) in tree.edges().iter().enumerate() {
        if !edge.is_end_edge() || edge.junction_count() != 1 || edge.has_anchor() {
            continue;
        }
        let s = size(edge);
        if smallest.is_none_or(|(_, best)| s < best) {
            smallest = Some((i, s));
        }
    }
    smallest.map(|(i, _)| i)
}

/// Clear the voxels of an edge, returning how many were set
fn erase_edge(skeleton: &mut Volume<u8>, edge: &Edge) -> usize {
    let mut cleared = 0;
    for p in &edge.points {
        let [x, y, z] = p.coords;
        if skeleton.get(x, y, z) > 0 {
            skeleton.set(x, y, z, 0);
            cleared += 1;
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Diagonal bar with a two-voxel spur on its middle voxel
    fn spur_volume() -> Volume<u8> {
        let mut vol = Volume::new([15, 15, 1], 0u8).unwrap();
        for i in 1..14 {
            vol.set(i, i, 0, 255);
        }
        vol.set(8, 6, 0, 255);
        vol.set(9, 5, 0, 255);
        vol
    }

    #[test]
    fn test_short_spur_is_removed() {
        let mut vol = spur_volume();
        let before = VoxelTree::from_skeleton(&vol, None).unwrap();
        assert_eq!(before.edges().len(), 3);

        let config = PruneConfig { min_length: Some(4.0), ..Default::default() };
        let (tree, report) = prune(&mut vol, None, &config).unwrap();
        assert_eq!(report.short_edges, 1);
        assert_eq!(tree.edges().len(), 1);
        assert!(tree.junctions().is_empty());
        assert_eq!(tree.edges()[0].voxel_count(), 13);
        assert_eq!(vol.get(9, 5, 0), 0);
        assert_eq!(vol.get(7, 7, 0), 255);
    }

    #[test]
    fn test_long_edges_are_kept() {
        let mut vol = spur_volume();
        let config = PruneConfig { min_length: Some(1.0), ..Default::default() };
        let (tree, report) = prune(&mut vol, None, &config).unwrap();
        assert_eq!(report.short_edges, 0);
        assert_eq!(tree.edges().len(), 3);
    }

    #[test]
    fn test_voxel_count_criterion() {
        let mut vol = spur_volume();
        let config = PruneConfig { min_voxels: Some(2), ..Default::default() };
        let (tree, report) = prune(&mut vol, None, &config).unwrap();
        assert_eq!(report.short_edges, 1);
        assert_eq!(tree.edges().len(), 1);
    }

    #[test]
    fn test_anchored_spur_is_kept() {
        let mut vol = spur_volume();
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        anchors.set(9, 5, 0, 1);
        let config = PruneConfig { max_end_edges: Some(2), ..Default::default() };
        let (tree, report) = prune(&mut vol, Some(&anchors), &config).unwrap();
        // one of the bar halves goes instead
        assert_eq!(report.short_edges, 1);
        assert!(tree.edges().iter().any(|e| e.has_anchor()));
        assert_eq!(vol.get(9, 5, 0), 255);
    }

    #[test]
    fn test_order_pruning() {
        let mut vol = spur_volume();
        let mut anchors = Volume::new(vol.dims(), 0u8).unwrap();
        anchors.set(1, 1, 0, 1);
        let config = PruneConfig { max_order: Some(1), ..Default::default() };
        let (tree, report) = prune(&mut vol, Some(&anchors), &config).unwrap();
        assert_eq!(report.high_order_edges, 1);
        assert_eq!(tree.edges().len(), 1);
        assert_eq!(tree.max_order(), 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(PruneConfig { max_order: Some(0), ..Default::default() }.validate().is_err());
        assert!(PruneConfig { min_length: Some(-1.0), ..Default::default() }.validate().is_err());
        assert!(!PruneConfig::default().is_enabled());
        let config: PruneConfig = serde_json::from_str(r#"{"min_voxels": 3}"#).unwrap();
        assert_eq!(config.min_voxels, Some(3));
        assert!(config.is_enabled());
    }
}
