//! Pipeline orchestration: quantize -> clean -> build -> reduce -> trace ->
//! locate, in strict sequence on a single thread.

use image::RgbImage;
use log::info;

use crate::border;
use crate::error::{PbnError, Result};
use crate::facet::FacetSlot;
use crate::facet_builder::{build_all_facets, build_neighbors};
use crate::facet_reducer;
use crate::grid::{ColorIndexGrid, FacetIdGrid};
use crate::narrow_strip;
use crate::polylabel;
use crate::quantizer::{self, QuantizeResult};
use crate::random::Random;
use crate::settings::Settings;

/// A progress callback receives a stage name and a fraction in `[0, 1]`.
pub type ProgressCallback = dyn FnMut(&str, f64);

/// Final output handed to collaborators (SVG/PNG serializers, the CLI, the
/// explorer harness): the palette, both grids, and the facet list with
/// every derived per-facet attribute populated.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub width: usize,
    pub height: usize,
    pub palette: Vec<[u8; 3]>,
    pub idx: ColorIndexGrid,
    pub fid: FacetIdGrid,
    pub facets: Vec<FacetSlot>,
}

/// Run the full pipeline over a decoded RGB buffer.
pub fn run(image: &RgbImage, settings: &Settings, mut progress: Option<&mut ProgressCallback>) -> Result<PipelineResult> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PbnError::InvalidInput("image has zero width or height".to_string()));
    }
    if settings.k_means_clusters < 1 {
        return Err(PbnError::InvalidInput("k_means_clusters must be >= 1".to_string()));
    }

    let mut rng = match settings.random_seed {
        Some(seed) => Random::new(seed),
        None => Random::from_time(),
    };

    report(&mut progress, "quantize", 0.0);
    let QuantizeResult { palette, mut idx } = quantizer::quantize(
        image,
        settings.k_means_clusters,
        settings.k_means_color_space,
        &mut rng,
        settings.k_means_min_delta,
        1000,
    )?;
    info!(
        "pipeline: quantized {}x{} image into {} colors",
        width,
        height,
        palette.len()
    );
    report(&mut progress, "quantize", 1.0);

    report(&mut progress, "narrow_strip", 0.0);
    let changed = narrow_strip::clean(&mut idx, &palette, settings.narrow_strip_passes);
    info!("pipeline: narrow-strip cleanup rewrote {} pixels", changed);
    report(&mut progress, "narrow_strip", 1.0);

    report(&mut progress, "build_facets", 0.0);
    let mut fid = FacetIdGrid::new(width as usize, height as usize);
    let mut facets = build_all_facets(&idx, &mut fid);
    for slot in facets.iter_mut() {
        if let Some(f) = slot.as_present_mut() {
            build_neighbors(f, &fid);
        }
    }
    info!("pipeline: built {} facets", facets.len());
    report(&mut progress, "build_facets", 1.0);

    report(&mut progress, "reduce", 0.0);
    match progress.as_mut() {
        Some(cb) => {
            let mut adapter = |f: f64| cb("reduce", f);
            facet_reducer::reduce(
                &mut facets,
                &mut idx,
                &mut fid,
                settings.remove_facets_smaller_than,
                settings.max_facets,
                settings.remove_large_first,
                &palette,
                Some(&mut adapter),
            )?;
        }
        None => {
            facet_reducer::reduce(
                &mut facets,
                &mut idx,
                &mut fid,
                settings.remove_facets_smaller_than,
                settings.max_facets,
                settings.remove_large_first,
                &palette,
                None,
            )?;
        }
    }
    let present_count = facets.iter().filter(|s| s.is_present()).count();
    info!("pipeline: {} facets survived reduction", present_count);
    report(&mut progress, "reduce", 1.0);

    report(&mut progress, "trace_borders", 0.0);
    border::trace_and_smooth_all(&mut facets, &fid, settings.halve_border_segments);
    report(&mut progress, "trace_borders", 1.0);

    report(&mut progress, "locate_labels", 0.0);
    for slot in facets.iter_mut() {
        if let Some(f) = slot.as_present_mut() {
            let label = polylabel::locate_label(f, &fid);
            f.label_anchor = Some(label.point);
            f.label_bbox = Some((
                label.point.0 - label.distance,
                label.point.1 - label.distance,
                label.point.0 + label.distance,
                label.point.1 + label.distance,
            ));
        }
    }
    report(&mut progress, "locate_labels", 1.0);

    Ok(PipelineResult {
        width: width as usize,
        height: height as usize,
        palette,
        idx,
        fid,
        facets,
    })
}

fn report(progress: &mut Option<&mut ProgressCallback>, stage: &str, fraction: f64) {
    if let Some(cb) = progress.as_mut() {
        cb(stage, fraction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_image(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_fn(w, h, |_, _| Rgb(rgb))
    }

    #[test]
    fn zero_sized_image_is_invalid_input() {
        let image = RgbImage::new(0, 0);
        let settings = Settings::default();
        let result = run(&image, &settings, None);
        assert!(matches!(result, Err(PbnError::InvalidInput(_))));
    }

    #[test]
    fn zero_clusters_is_invalid_input() {
        let image = solid_image(4, 4, [1, 2, 3]);
        let settings = Settings {
            k_means_clusters: 0,
            ..Settings::default()
        };
        let result = run(&image, &settings, None);
        assert!(matches!(result, Err(PbnError::InvalidInput(_))));
    }

    #[test]
    fn single_color_image_yields_one_facet_with_a_label() {
        let image = solid_image(10, 10, [255, 0, 0]);
        let settings = Settings {
            random_seed: Some(1),
            remove_facets_smaller_than: 0,
            ..Settings::default()
        };
        let result = run(&image, &settings, None).unwrap();
        let present: Vec<_> = result.facets.iter().filter(|s| s.is_present()).collect();
        assert_eq!(present.len(), 1);
        let facet = present[0].as_present().unwrap();
        assert_eq!(facet.point_count, 100);
        assert!(facet.label_anchor.is_some());
    }

    #[test]
    fn progress_callback_reaches_full_completion_for_every_stage() {
        let image = solid_image(6, 6, [10, 20, 30]);
        let settings = Settings::default();
        let mut last_by_stage: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        {
            let mut cb = |stage: &str, fraction: f64| {
                last_by_stage.insert(stage.to_string(), fraction);
            };
            run(&image, &settings, Some(&mut cb)).unwrap();
        }
        for stage in ["quantize", "narrow_strip", "build_facets", "reduce", "trace_borders", "locate_labels"] {
            assert_eq!(last_by_stage.get(stage), Some(&1.0));
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        // A deterministic multi-color image (>= 8 distinct colors): the
        // reproducibility guarantee only bites when the color histogram has
        // more than one entry, since `HashMap` iteration order is randomized
        // per instance and a single-color fixture can't expose that.
        let palette_colors = [
            [10, 20, 30],
            [200, 50, 60],
            [30, 200, 40],
            [90, 90, 200],
            [240, 240, 10],
            [5, 5, 5],
            [128, 64, 200],
            [60, 180, 180],
        ];
        let image = RgbImage::from_fn(8, 8, |x, y| Rgb(palette_colors[((x + y) % 8) as usize]));
        let settings = Settings {
            random_seed: Some(7),
            k_means_clusters: 4,
            k_means_color_space: crate::vector::ColorSpace::Lab,
            remove_facets_smaller_than: 0,
            ..Settings::default()
        };
        let a = run(&image, &settings, None).unwrap();
        let b = run(&image, &settings, None).unwrap();
        assert_eq!(a.palette, b.palette);
        assert_eq!(a.idx.width(), b.idx.width());
        for y in 0..a.height {
            for x in 0..a.width {
                assert_eq!(a.idx.get(x, y), b.idx.get(x, y));
                assert_eq!(a.fid.get(x, y), b.fid.get(x, y));
            }
        }
    }
}
