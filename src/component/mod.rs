//! Component image: a thinned volume split into labeled edge and junction
//! components.
//!
//! Edge voxels have at most two foreground neighbors, junction voxels three
//! or more. Each family is labeled separately; edge labels come first
//! (`1..=E`), junction labels follow (`E+1..=E+J`).

pub mod labeling;

use std::time::Instant;

use crate::core::error::Error;
use crate::core::logging::elapsed_ms;
use crate::core::types::{Result, Vec3};
use crate::volume::Volume;

pub use labeling::{count_live_neighbors, label_family};

/// Integer type used to store component labels
pub trait Label: Copy + Default + PartialEq + Send + Sync + Into<u32> + std::fmt::Debug {
    /// Largest label the type can hold
    const CAPACITY: usize;

    /// Convert a label known to fit
    fn from_label(label: u32) -> Self;
}

macro_rules! impl_label {
    ($($t:ty),*) => {
        $(
            impl Label for $t {
                const CAPACITY: usize = <$t>::MAX as usize;

                #[inline]
                fn from_label(label: u32) -> Self {
                    label as $t
                }
            }
        )*
    };
}

impl_label!(u8, u16, u32);

/// Family of a component
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Edge,
    Junction,
}

/// One labeled component
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    pub label: u32,
    pub kind: ComponentKind,
    /// Number of voxels
    pub size: usize,
}

/// Label volume plus per-component bookkeeping
#[derive(Clone, Debug)]
pub struct ComponentImage<L: Label = u32> {
    labels: Volume<L>,
    components: Vec<Component>,
    edge_count: usize,
}

impl<L: Label> ComponentImage<L> {
    /// Label the foreground (value > 0) of a thinned volume
    pub fn build(skeleton: &Volume<u8>) -> Result<Self> {
        let start = Instant::now();
        let counts = count_live_neighbors(skeleton);

        let mut labels = vec![0u32; skeleton.len()];
        let edge_sizes = label_family(skeleton, &mut labels, 1, |i| {
            skeleton.data()[i] > 0 && counts.data()[i] <= 2
        })?;
        let edge_count = edge_sizes.len();
        if edge_count == 0 {
            return Err(Error::NoEdges);
        }
        if edge_count > L::CAPACITY {
            return Err(Error::LabelOverflow {
                family: "edge",
                count: edge_count,
                total: edge_count,
                capacity: L::CAPACITY,
            });
        }

        let junction_sizes = label_family(skeleton, &mut labels, edge_count as u32 + 1, |i| {
            skeleton.data()[i] > 0 && counts.data()[i] > 2
        })?;
        let total = edge_count + junction_sizes.len();
        if total > L::CAPACITY {
            return Err(Error::LabelOverflow {
                family: "junction",
                count: junction_sizes.len(),
                total,
                capacity: L::CAPACITY,
            });
        }

        let components = edge_sizes
            .iter()
            .map(|&size| (ComponentKind::Edge, size))
            .chain(junction_sizes.iter().map(|&size| (ComponentKind::Junction, size)))
            .enumerate()
            .map(|(i, (kind, size))| Component { label: i as u32 + 1, kind, size })
            .collect();

        let labels = Volume::from_vec(skeleton.dims(), labels)?
            .with_voxel_size(skeleton.voxel_size())
            .map(L::from_label);

        log::info!(
            "Component image: {} edges, {} junctions in {:.1}ms",
            edge_count,
            junction_sizes.len(),
            elapsed_ms(start)
        );

        Ok(Self { labels, components, edge_count })
    }

    pub fn labels(&self) -> &Volume<L> {
        &self.labels
    }

    pub fn dims(&self) -> [usize; 3] {
        self.labels.dims()
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.labels.voxel_size()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn junction_count(&self) -> usize {
        self.components.len() - self.edge_count
    }

    /// Label at a linear voxel index, 0 for background
    #[inline]
    pub fn label_at(&self, index: usize) -> u32 {
        self.labels.data()[index].into()
    }

    /// Component by label, `None` for 0 or unknown labels
    pub fn component(&self, label: u32) -> Option<&Component> {
        label.checked_sub(1).and_then(|i| self.components.get(i as usize))
    }

    #[inline]
    pub fn is_edge(&self, label: u32) -> bool {
        label >= 1 && (label as usize) <= self.edge_count
    }

    #[inline]
    pub fn is_junction(&self, label: u32) -> bool {
        (label as usize) > self.edge_count && (label as usize) <= self.components.len()
    }
}
