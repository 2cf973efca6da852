//! End-to-end skeletonization: threshold, thin, label, order, prune, export

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::logging::elapsed_ms;
use crate::core::types::Result;
use crate::thinning::{
    apply_anchors, thin, thin_with_chamfer, threshold, ChamferMask, ThinningConfig, ThinningReport,
    FOREGROUND,
};
use crate::tree::{save_vtk, VtkOptions};
use crate::volume::Volume;
use crate::voxel_tree::{prune, PruneConfig, PruneReport, TreeAttribute, VoxelTree};

/// Grey-level bounds of the classification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Values below are background
    pub low: f32,
    /// Values at or above are anchors; no anchors when not above `low`
    pub high: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { low: 1.0, high: 0.0 }
    }
}

/// Settings of every stage, stored as JSON
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub threshold: ThresholdConfig,
    /// Mask of the distance map used when no priority volume is given
    pub chamfer: ChamferMask,
    pub thinning: ThinningConfig,
    pub prune: PruneConfig,
    pub export: VtkOptions,
    /// Value written into the label volume
    pub attribute: TreeAttribute,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdConfig::default(),
            chamfer: ChamferMask::Mask3,
            thinning: ThinningConfig::curve(),
            prune: PruneConfig::default(),
            export: VtkOptions::default(),
            attribute: TreeAttribute::BranchOrder,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.thinning.validate()?;
        self.prune.validate()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Format(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Format(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Everything a run produces
#[derive(Debug)]
pub struct PipelineOutput {
    /// Thinned, pruned binary volume
    pub skeleton: Volume<u8>,
    pub tree: VoxelTree,
    pub thinning: ThinningReport,
    pub pruning: Option<PruneReport>,
}

/// Chains the stages with one configuration
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Skeletonize `grey`. `anchors` (value > 0) adds protected voxels; without
    /// `priority` the chamfer distance of the classification drives thinning.
    pub fn run(
        &self,
        grey: &Volume<u16>,
        anchors: Option<&Volume<u8>>,
        priority: Option<&Volume<u16>>,
    ) -> Result<PipelineOutput> {
        let start = Instant::now();
        let config = &self.config;

        let mut volume = threshold(grey, config.threshold.low, config.threshold.high);
        if let Some(anchors) = anchors {
            volume.ensure_same_dims(anchors)?;
            apply_anchors(&mut volume, anchors);
        }
        let anchor_mask = volume.map(|v| (v == FOREGROUND) as u8);
        let anchored = anchor_mask.data().iter().any(|&v| v > 0);
        log::debug!("Classification done, anchors: {}", anchored);

        let thinning = match priority {
            Some(priority) => thin(&mut volume, priority, &config.thinning)?,
            None => thin_with_chamfer(&mut volume, config.chamfer, &config.thinning)?,
        };

        let anchors = anchored.then_some(&anchor_mask);
        let (tree, pruning) = if config.prune.is_enabled() {
            let (tree, report) = prune(&mut volume, anchors, &config.prune)?;
            (tree, Some(report))
        } else {
            let mut tree = VoxelTree::from_skeleton(&volume, anchors)?;
            if anchored {
                tree.compute_branch_order()?;
            }
            (tree, None)
        };

        log::info!(
            "Pipeline done in {:.1}ms: {} edges, {} junctions, max order {}",
            elapsed_ms(start),
            tree.edges().len(),
            tree.junctions().len(),
            tree.max_order()
        );
        Ok(PipelineOutput { skeleton: volume, tree, thinning, pruning })
    }

    /// Label volume of the configured attribute
    pub fn label_image(&self, output: &PipelineOutput) -> Result<Volume<u32>> {
        output.tree.to_image(self.config.attribute)
    }

    /// Write the tree as VTK under `path`
    pub fn export(&self, output: &PipelineOutput, path: &Path) -> Result<Vec<PathBuf>> {
        save_vtk(path, &output.tree.to_tree(), &self.config.export)
    }
}
