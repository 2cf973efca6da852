//! Thinning configuration

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::topology::Connectivity;

/// Order in which priority buckets are processed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueOrdering {
    #[default]
    Increasing,
    Decreasing,
}

/// What a committed change does to a voxel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeDirection {
    /// Thinning: removed points become background
    #[default]
    ForegroundToBackground,
    /// Thickening: added points become foreground
    BackgroundToForeground,
}

/// Which non-simple points are frozen as end points
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndPointPolicy {
    /// Keep surface points (`T_low >= 2`)
    #[default]
    Surface,
    /// Keep points with exactly two background components
    PureSurface,
    /// Keep curve points (`T_high >= 2`), and curve extremities
    Curve,
    /// Keep points with at most two foreground components and two live neighbors
    PureCurve,
    /// No end points: shrink to a topological kernel
    None,
}

/// Parameters for the priority-ordered thinning
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinningConfig {
    /// Width of one priority bucket (>= 1)
    pub bin_length: u32,
    /// Processing order of the buckets
    pub ordering: ValueOrdering,
    /// Thinning or thickening
    pub change: ChangeDirection,
    /// Thickness mode of the directional check
    pub thickness: Connectivity,
    /// End point detection
    pub end_point: EndPointPolicy,
    /// Minimum number of cycles in a bucket before end points may appear
    pub cycles_before_ending: Option<u32>,
    /// Minimum priority before end points may appear
    pub value_before_ending: Option<u32>,
    /// Bound on the total number of cycles
    pub max_iteration: Option<u32>,
    /// Declared priority span; derived from the data (`0..=max`) when unset
    pub value_span: Option<[u32; 2]>,
}

impl Default for ThinningConfig {
    fn default() -> Self {
        Self {
            bin_length: 1,
            ordering: ValueOrdering::Increasing,
            change: ChangeDirection::ForegroundToBackground,
            thickness: Connectivity::C26,
            end_point: EndPointPolicy::Surface,
            cycles_before_ending: None,
            value_before_ending: None,
            max_iteration: None,
            value_span: None,
        }
    }
}

impl ThinningConfig {
    /// Curve skeleton settings, as used for centerline extraction
    pub fn curve() -> Self {
        Self {
            end_point: EndPointPolicy::Curve,
            ..Default::default()
        }
    }

    /// Surface skeleton settings
    pub fn surface() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.bin_length == 0 {
            return Err(Error::InvalidConfig("bin_length must be at least 1".to_string()));
        }
        if let Some([lo, hi]) = self.value_span {
            if lo > hi {
                return Err(Error::InvalidConfig(format!(
                    "value span [{}, {}] is empty",
                    lo, hi
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = ThinningConfig::default();
        assert_eq!(c.bin_length, 1);
        assert_eq!(c.ordering, ValueOrdering::Increasing);
        assert_eq!(c.change, ChangeDirection::ForegroundToBackground);
        assert_eq!(c.thickness, Connectivity::C26);
        assert_eq!(c.end_point, EndPointPolicy::Surface);
        assert!(c.max_iteration.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let c = ThinningConfig { bin_length: 0, ..Default::default() };
        assert!(c.validate().is_err());
        let c = ThinningConfig { value_span: Some([5, 2]), ..Default::default() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_json_partial_config() {
        let c: ThinningConfig =
            serde_json::from_str(r#"{ "end_point": "Curve", "thickness": "18" }"#).unwrap();
        assert_eq!(c.end_point, EndPointPolicy::Curve);
        assert_eq!(c.thickness, Connectivity::C18);
        assert_eq!(c.bin_length, 1);
    }
}
