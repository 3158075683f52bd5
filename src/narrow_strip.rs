//! Narrow-strip cleaner: rewrites 1-pixel-wide color anomalies in the
//! color-index grid before facet construction.

use crate::grid::ColorIndexGrid;

fn euclidean_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Run `passes` cleanup passes over `idx`. On each pass, every interior
/// pixel whose color differs from all 4 neighbors, and whose neighbors
/// together use at most two distinct colors, is rewritten to the closer of
/// those neighbor colors (ties go to the smaller neighbor color index).
/// Edge and corner pixels are never touched. Returns the total number of
/// pixels changed across all passes; callers may stop early when a pass
/// changes nothing.
pub fn clean(idx: &mut ColorIndexGrid, palette: &[[u8; 3]], passes: u32) -> usize {
    let width = idx.width();
    let height = idx.height();
    if width < 3 || height < 3 {
        return 0;
    }

    let mut total_changed = 0usize;
    for _ in 0..passes {
        let mut changes: Vec<(usize, usize, u32)> = Vec::new();

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = idx.get(x, y);
                let neighbor_colors = [
                    idx.get(x - 1, y),
                    idx.get(x + 1, y),
                    idx.get(x, y - 1),
                    idx.get(x, y + 1),
                ];

                if neighbor_colors.iter().any(|&c| c == center) {
                    continue;
                }

                let mut distinct: Vec<u32> = Vec::new();
                for &c in &neighbor_colors {
                    if !distinct.contains(&c) {
                        distinct.push(c);
                    }
                }
                if distinct.len() > 2 {
                    continue;
                }

                let center_rgb = palette[center as usize];
                let mut best_color = neighbor_colors[0];
                let mut best_dist = f64::INFINITY;
                for &c in &neighbor_colors {
                    let d = euclidean_distance(center_rgb, palette[c as usize]);
                    if d < best_dist || (d == best_dist && c < best_color) {
                        best_dist = d;
                        best_color = c;
                    }
                }

                changes.push((x, y, best_color));
            }
        }

        if changes.is_empty() {
            break;
        }

        for (x, y, color) in &changes {
            idx.set(*x, *y, *color);
        }
        total_changed += changes.len();
    }

    total_changed
}
