//! Core type aliases and re-exports

pub use glam::Vec3;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Reserve room for `additional` elements or report an allocation error.
pub(crate) fn try_reserve<T>(v: &mut Vec<T>, additional: usize, what: &'static str) -> Result<()> {
    v.try_reserve(additional)
        .map_err(|_| crate::core::error::Error::Allocation { what, requested: additional })
}
