//! Discrete topology: neighborhoods, topological numbers, thickness tests

pub mod neighborhood;
pub mod numbers;
pub mod thickness;

pub use neighborhood::{
    Connectivity, Neighborhood, NeighborhoodExtractor, Neighbors, extract_neighborhood, CENTER,
};
pub use numbers::{TopologicalNumbers, topological_numbers};
pub use thickness::{check_thickness, direction_count};
