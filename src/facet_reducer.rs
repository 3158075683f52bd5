//! Facet reducer: remove facets below a size threshold and enforce a max
//! facet count, reassigning orphaned pixels to neighbors and rebuilding
//! affected facets in place.
//!
//! A threshold pass then a cap pass, per-pixel nearest-neighbor-by-
//! Manhattan-distance-to-border-point reassignment with a color-distance
//! tie-break, reflood-in-place rebuild, a fallback orphan sweep, and
//! dirty-neighbor propagation. Nearest-neighbor search is a bbox-pruned
//! linear scan over border points rather than a spatial index; see
//! DESIGN.md.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::{PbnError, Result};
use crate::facet::FacetSlot;
use crate::facet_builder::{build_facet, build_neighbors};
use crate::grid::{ColorIndexGrid, FacetIdGrid};

/// Precompute the pairwise Euclidean RGB distance matrix for a palette.
pub fn build_color_distance_matrix(palette: &[[u8; 3]]) -> Vec<Vec<f64>> {
    let n = palette.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let dr = palette[i][0] as f64 - palette[j][0] as f64;
            let dg = palette[i][1] as f64 - palette[j][1] as f64;
            let db = palette[i][2] as f64 - palette[j][2] as f64;
            matrix[i][j] = (dr * dr + dg * dg + db * db).sqrt();
        }
    }
    matrix
}

const PROGRESS_THROTTLE: Duration = Duration::from_millis(500);

fn maybe_progress(
    progress: &mut Option<&mut dyn FnMut(f64)>,
    last: &mut Instant,
    value: f64,
) {
    if let Some(cb) = progress {
        let now = Instant::now();
        if now.duration_since(*last) >= PROGRESS_THROTTLE {
            *last = now;
            cb(value.clamp(0.0, 1.0));
        }
    }
}

/// Remove facets with `point_count < threshold`, then (if `cap` is set)
/// repeatedly remove the smallest present facet until `|present| <= cap`.
/// `large_first` controls Phase 1's processing order.
#[allow(clippy::too_many_arguments)]
pub fn reduce(
    facets: &mut Vec<FacetSlot>,
    idx: &mut ColorIndexGrid,
    fid: &mut FacetIdGrid,
    threshold: u64,
    cap: Option<usize>,
    large_first: bool,
    palette: &[[u8; 3]],
    mut progress: Option<&mut dyn FnMut(f64)>,
) -> Result<()> {
    if threshold == 0 && cap.is_none() {
        if let Some(cb) = progress.as_mut() {
            cb(1.0);
        }
        return Ok(());
    }

    let width = idx.width();
    let height = idx.height();
    let mut visited = vec![false; width * height];
    let color_distances = build_color_distance_matrix(palette);

    let mut last_progress = Instant::now() - PROGRESS_THROTTLE;

    // Phase 1: threshold pass.
    let mut processing_ids: Vec<u32> = facets
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.as_present().map(|_| i as u32))
        .collect();
    processing_ids.sort_by_key(|&id| facets[id as usize].as_present().unwrap().point_count);
    if large_first {
        processing_ids.reverse();
    }

    let n = processing_ids.len().max(1);
    for (i, id) in processing_ids.iter().enumerate() {
        let should_delete = facets[*id as usize]
            .as_present()
            .map(|f| f.point_count < threshold)
            .unwrap_or(false);
        if should_delete {
            trace!("reducer: deleting facet {} (below threshold {})", id, threshold);
            delete_facet(*id, facets, idx, fid, &color_distances, &mut visited)?;
        }
        maybe_progress(&mut progress, &mut last_progress, 0.5 * (i + 1) as f64 / n as f64);
    }

    let after_phase1 = facets.iter().filter(|s| s.is_present()).count();
    debug!("reducer: {} facets present after threshold pass", after_phase1);

    // Phase 2: cap pass.
    if let Some(max_count) = cap {
        let mut present_count = after_phase1;
        let start_count = present_count;
        while present_count > max_count {
            let mut ids: Vec<u32> = facets
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.as_present().map(|_| i as u32))
                .collect();
            if ids.is_empty() {
                break;
            }
            ids.sort_by_key(|&id| facets[id as usize].as_present().unwrap().point_count);
            let smallest = ids[0];
            trace!("reducer: deleting smallest facet {} to enforce cap {}", smallest, max_count);
            delete_facet(smallest, facets, idx, fid, &color_distances, &mut visited)?;
            present_count -= 1;

            let denom = (start_count as i64 - max_count as i64).max(1) as f64;
            let remaining = (present_count as i64 - max_count as i64).max(0) as f64;
            let progress_val = 0.5 + 0.5 * (1.0 - remaining / denom);
            maybe_progress(&mut progress, &mut last_progress, progress_val);
        }
        debug!("reducer: {} facets present after cap pass", present_count);
    }

    if let Some(cb) = progress.as_mut() {
        cb(1.0);
    }

    verify_invariants(facets, idx, fid, palette)
}

/// Delete `facet_id`: reassign every one of its pixels to the closest
/// surviving neighbor, rebuild affected neighbors, and tombstone the slot.
/// Isolated facets (no neighbors) are tombstoned with no pixel rewrites.
fn delete_facet(
    facet_id: u32,
    facets: &mut Vec<FacetSlot>,
    idx: &mut ColorIndexGrid,
    fid: &mut FacetIdGrid,
    color_distances: &[Vec<f64>],
    visited: &mut [bool],
) -> Result<()> {
    let (bbox, neighbor_ids, facet_color) = {
        let facet = match facets[facet_id as usize].as_present_mut() {
            Some(f) => f,
            None => return Ok(()),
        };
        if facet.dirty {
            build_neighbors(facet, fid);
        }
        (facet.bbox, facet.neighbors.clone(), facet.color)
    };

    if neighbor_ids.is_empty() {
        facets[facet_id as usize] = FacetSlot::Absent;
        return Ok(());
    }

    for &n in &neighbor_ids {
        if let Some(nf) = facets[n as usize].as_present_mut() {
            if nf.dirty {
                build_neighbors(nf, fid);
            }
        }
    }

    for y in bbox.min_y..=bbox.max_y {
        for x in bbox.min_x..=bbox.max_x {
            if fid.get(x, y) != facet_id {
                continue;
            }
            if let Some(closest) =
                closest_neighbor_for_pixel(x, y, &neighbor_ids, facets, facet_color, color_distances)
            {
                let neighbor_color = facets[closest as usize].as_present().unwrap().color;
                idx.set(x, y, neighbor_color);
            }
        }
    }

    rebuild_neighbors(&neighbor_ids, facets, idx, fid, visited);

    // Fallback sweep: a reassignment can create a newly isolated pocket the
    // neighbor's reflood could not reach. Give each still-orphaned pixel the
    // color of any 4-neighbor (left, up, right, down) that is not the
    // removed facet, then rebuild once more.
    let width = idx.width();
    let height = idx.height();
    let mut needs_rebuild_again = false;
    for y in bbox.min_y..=bbox.max_y {
        for x in bbox.min_x..=bbox.max_x {
            if fid.get(x, y) != facet_id {
                continue;
            }
            let assigned = if x > 0 && fid.get(x - 1, y) != facet_id {
                Some(idx.get(x - 1, y))
            } else if y > 0 && fid.get(x, y - 1) != facet_id {
                Some(idx.get(x, y - 1))
            } else if x + 1 < width && fid.get(x + 1, y) != facet_id {
                Some(idx.get(x + 1, y))
            } else if y + 1 < height && fid.get(x, y + 1) != facet_id {
                Some(idx.get(x, y + 1))
            } else {
                None
            };
            if let Some(color) = assigned {
                idx.set(x, y, color);
                needs_rebuild_again = true;
            }
        }
    }
    if needs_rebuild_again {
        rebuild_neighbors(&neighbor_ids, facets, idx, fid, visited);
    }

    facets[facet_id as usize] = FacetSlot::Absent;
    Ok(())
}

/// Find the closest surviving neighbor for pixel `(x, y)` by Manhattan
/// distance to the neighbor's nearest border point, with a color-distance
/// tie-break, then lowest neighbor id.
fn closest_neighbor_for_pixel(
    x: usize,
    y: usize,
    neighbor_ids: &HashSet<u32>,
    facets: &[FacetSlot],
    facet_color: u32,
    color_distances: &[Vec<f64>],
) -> Option<u32> {
    let mut best: Option<u32> = None;
    let mut best_dist = i64::MAX;
    let mut best_color_dist = f64::INFINITY;

    let mut ids: Vec<u32> = neighbor_ids.iter().copied().collect();
    ids.sort_unstable();

    for n in ids {
        let neighbor = match facets[n as usize].as_present() {
            Some(f) if !f.border_points.is_empty() => f,
            _ => continue,
        };

        let bbox = neighbor.bbox;
        let dx = if x < bbox.min_x {
            (bbox.min_x - x) as i64
        } else if x > bbox.max_x {
            (x - bbox.max_x) as i64
        } else {
            0
        };
        let dy = if y < bbox.min_y {
            (bbox.min_y - y) as i64
        } else if y > bbox.max_y {
            (y - bbox.max_y) as i64
        } else {
            0
        };
        if dx + dy > best_dist {
            continue;
        }

        let mut min_d = i64::MAX;
        for &(bx, by) in &neighbor.border_points {
            let d = (bx as i64 - x as i64).abs() + (by as i64 - y as i64).abs();
            if d < min_d {
                min_d = d;
            }
        }

        if min_d < best_dist {
            best_dist = min_d;
            best = Some(n);
            best_color_dist = color_distances[facet_color as usize][neighbor.color as usize];
        } else if min_d == best_dist {
            let cd = color_distances[facet_color as usize][neighbor.color as usize];
            if cd < best_color_dist {
                best_color_dist = cd;
                best = Some(n);
            }
        }
    }

    best
}

/// Reflood each of `neighbor_ids` from one of its border points using the
/// now-updated color-index grid, recomputing its attributes in place. Marks
/// the rebuilt neighbors' own neighbors `dirty` since their shared border
/// may have changed shape.
fn rebuild_neighbors(
    neighbor_ids: &HashSet<u32>,
    facets: &mut Vec<FacetSlot>,
    idx: &ColorIndexGrid,
    fid: &mut FacetIdGrid,
    visited: &mut [bool],
) {
    let mut changed: HashSet<u32> = HashSet::new();
    let width = idx.width();

    for &n in neighbor_ids {
        let (color, seed) = match facets[n as usize].as_present() {
            Some(f) if !f.border_points.is_empty() => (f.color, f.border_points[0]),
            _ => continue,
        };

        if let Some(nf) = facets[n as usize].as_present_mut() {
            if nf.dirty {
                build_neighbors(nf, fid);
            }
            changed.insert(n);
            changed.extend(nf.neighbors.iter().copied());
        }

        let new_facet = build_facet(n, color, seed.0, seed.1, visited, idx, fid);

        if new_facet.point_count == 0 {
            facets[n as usize] = FacetSlot::Absent;
            continue;
        }

        let bbox = new_facet.bbox;
        facets[n as usize] = FacetSlot::Present(new_facet);

        for y in bbox.min_y..=bbox.max_y {
            for x in bbox.min_x..=bbox.max_x {
                if fid.get(x, y) == n {
                    visited[y * width + x] = false;
                }
            }
        }
    }

    for k in changed {
        if let Some(f) = facets[k as usize].as_present_mut() {
            f.dirty = true;
        }
    }
}

/// Assert the pipeline's core post-reduction consistency properties:
/// palette validity and `C[IDX[x,y]] == facet[FID[x,y]].color` everywhere.
fn verify_invariants(
    facets: &[FacetSlot],
    idx: &ColorIndexGrid,
    fid: &FacetIdGrid,
    palette: &[[u8; 3]],
) -> Result<()> {
    let width = idx.width();
    let height = idx.height();
    for y in 0..height {
        for x in 0..width {
            let color = idx.get(x, y);
            if color as usize >= palette.len() {
                return Err(PbnError::InvariantViolated(format!(
                    "pixel ({x},{y}) has out-of-range color index {color}"
                )));
            }
            let facet_id = fid.get(x, y);
            let facet = facets
                .get(facet_id as usize)
                .and_then(FacetSlot::as_present)
                .ok_or_else(|| {
                    PbnError::InvariantViolated(format!(
                        "pixel ({x},{y}) references absent or out-of-range facet {facet_id}"
                    ))
                })?;
            if facet.color != color {
                return Err(PbnError::InvariantViolated(format!(
                    "pixel ({x},{y}) color {color} disagrees with facet {facet_id} color {}",
                    facet.color
                )));
            }
        }
    }
    Ok(())
}
