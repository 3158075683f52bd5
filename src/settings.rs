//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::vector::ColorSpace;

/// All tunable parameters for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Palette size `K` (default: 16).
    pub k_means_clusters: usize,
    /// Clustering color space (default: Lab).
    pub k_means_color_space: ColorSpace,
    /// K-means convergence threshold `ε` (default: 1.0).
    pub k_means_min_delta: f64,
    /// PRNG seed; `None` seeds from wall-clock time (default: None).
    pub random_seed: Option<i64>,
    /// Narrow-strip cleanup passes (default: 3).
    pub narrow_strip_passes: u32,
    /// Reducer size threshold `T`; facets smaller than this are absorbed
    /// into a neighbor (default: 10).
    pub remove_facets_smaller_than: u64,
    /// Reducer facet-count cap `M`; `None` disables the cap pass (default:
    /// None).
    pub max_facets: Option<usize>,
    /// Process facets largest-first in the threshold pass (default: false).
    pub remove_large_first: bool,
    /// Border-smoothing midpoint-subdivision passes (default: 2).
    pub halve_border_segments: u32,
    /// Pre-core downscale bounds, applied by the collaborator before the
    /// core runs (default: None).
    pub resize_max_width: Option<u32>,
    pub resize_max_height: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            k_means_clusters: 16,
            k_means_color_space: ColorSpace::Lab,
            k_means_min_delta: 1.0,
            random_seed: None,
            narrow_strip_passes: 3,
            remove_facets_smaller_than: 10,
            max_facets: None,
            remove_large_first: false,
            halve_border_segments: 2,
            resize_max_width: None,
            resize_max_height: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_sane() {
        let s = Settings::default();
        assert!(s.k_means_clusters >= 1);
        assert!(s.k_means_min_delta > 0.0);
        assert_eq!(s.max_facets, None);
        assert_eq!(s.random_seed, None);
    }

    #[test]
    fn settings_roundtrip_through_json() {
        let s = Settings {
            k_means_clusters: 8,
            random_seed: Some(42),
            max_facets: Some(200),
            ..Settings::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.k_means_clusters, 8);
        assert_eq!(back.random_seed, Some(42));
        assert_eq!(back.max_facets, Some(200));
    }
}
