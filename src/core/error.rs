//! Error types for skeletree

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Allocation error: could not reserve {requested} elements for {what}")]
    Allocation { what: &'static str, requested: usize },

    #[error("Value {value} at voxel {index} is outside the bucket span [{min}, {max}]")]
    ValueOutOfRange { value: u32, index: usize, min: u32, max: u32 },

    #[error("Too many {family} components: {count} (edges + junctions = {total}, label capacity {capacity})")]
    LabelOverflow {
        family: &'static str,
        count: usize,
        total: usize,
        capacity: usize,
    },

    #[error("No edge component found")]
    NoEdges,

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: [usize; 3], got: [usize; 3] },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal consistency error: {0}")]
    Consistency(String),

    #[error("Format error: {0}")]
    Format(String),
}

impl Error {
    /// Shorthand for an internal-consistency error
    pub(crate) fn consistency(msg: impl Into<String>) -> Self {
        Error::Consistency(msg.into())
    }
}
