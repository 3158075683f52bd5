//! Color quantizer: unique-color histogram -> K-means clustering -> palette
//! + per-pixel color-index grid.

use std::collections::HashMap;

use image::RgbImage;
use log::debug;

use crate::error::Result;
use crate::grid::ColorIndexGrid;
use crate::kmeans::KMeans;
use crate::random::Random;
use crate::vector::{ColorSpace, WeightedVector};

/// Result of quantizing an image: the ordered palette and the per-pixel
/// color-index grid.
pub struct QuantizeResult {
    pub palette: Vec<[u8; 3]>,
    pub idx: ColorIndexGrid,
}

/// Quantize `image` into at most `k` colors in `color_space`, using
/// `rng`/`epsilon`/`max_iterations` to drive K-means to convergence.
///
/// If `k` exceeds the number of unique colors, the extra clusters are
/// dropped and `k` effectively shrinks to the unique-color count.
pub fn quantize(
    image: &RgbImage,
    k: usize,
    color_space: ColorSpace,
    rng: &mut Random,
    epsilon: f64,
    max_iterations: u32,
) -> Result<QuantizeResult> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok(QuantizeResult {
            palette: Vec::new(),
            idx: ColorIndexGrid::new(0, 0),
        });
    }

    // Stage 1: histogram exact 24-bit RGB -> frequency, unique colors kept in
    // first-seen raster order so K-means centroid seeding stays reproducible
    // across runs (HashMap iteration order is randomized per instance).
    let mut histogram: HashMap<[u8; 3], u64> = HashMap::new();
    let mut unique_colors: Vec<[u8; 3]> = Vec::new();
    for pixel in image.pixels() {
        let rgb = pixel.0;
        match histogram.entry(rgb) {
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(1);
                unique_colors.push(rgb);
            }
            std::collections::hash_map::Entry::Occupied(mut e) => {
                *e.get_mut() += 1;
            }
        }
    }
    debug!("quantizer: {} unique colors in {}x{} image", histogram.len(), width, height);

    let effective_k = k.min(unique_colors.len()).max(1);

    // Stage 2: color-space map, weight = frequency, tag = original RGB.
    let points: Vec<WeightedVector> = unique_colors
        .iter()
        .map(|&rgb| {
            let weight = histogram[&rgb] as f64;
            WeightedVector::new(color_space.to_values(rgb), weight, rgb)
        })
        .collect();

    // Stage 3: cluster.
    let mut km = KMeans::new(&points, effective_k, rng, None);
    km.converge(epsilon, max_iterations)?;
    debug!(
        "quantizer: k-means converged after {} iterations (delta={:.4})",
        km.current_iteration(),
        km.delta()
    );

    // Stage 4: output. Palette = centroids converted back to RGB.
    let palette: Vec<[u8; 3]> = km.centroids().iter().map(|c| color_space.to_rgb(&c.values)).collect();

    // Per-pixel cluster lookup, memoized by original RGB.
    let mut color_to_cluster: HashMap<[u8; 3], u32> = HashMap::new();
    for (point_idx, rgb) in unique_colors.iter().enumerate() {
        let cluster = km.classify(&points[point_idx]);
        color_to_cluster.insert(*rgb, cluster as u32);
    }

    let mut idx = ColorIndexGrid::new(width as usize, height as usize);
    for (x, y, pixel) in image.enumerate_pixels() {
        let cluster = color_to_cluster[&pixel.0];
        idx.set(x as usize, y as usize, cluster);
    }

    Ok(QuantizeResult { palette, idx })
}
