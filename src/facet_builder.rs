//! Facet builder: build-all (flood-fill the whole color-index grid into
//! facets) and the neighbor pass.
//!
//! Flood-fills on a same-color-and-unvisited predicate, accounting for
//! border points during the fill callback, then computes each facet's
//! neighbor set in a separate batched pass over its border points.

use crate::facet::{BoundingBox, Facet, FacetSlot};
use crate::flood_fill;
use crate::grid::{ColorIndexGrid, FacetIdGrid};

/// Build a single facet starting from `(x, y)`, flood-filling same-color,
/// unvisited pixels and recording point count, bbox, and border points as it
/// goes. `visited` must be `false` everywhere the facet can reach; pixels it
/// claims are left `true` in it.
pub fn build_facet(
    facet_id: u32,
    color: u32,
    x: usize,
    y: usize,
    visited: &mut [bool],
    idx: &ColorIndexGrid,
    fid: &mut FacetIdGrid,
) -> Facet {
    let width = idx.width();
    let height = idx.height();
    let mut facet = Facet::new(facet_id, color, x, y);
    facet.bbox = BoundingBox::from_point(x, y);

    let mut include = |px: usize, py: usize| idx.get(px, py) == color;

    let mut on_fill = |px: usize, py: usize| {
        fid.set(px, py, facet_id);
        facet.point_count += 1;
        facet.bbox.include(px, py);

        let is_boundary = px == 0 || py == 0 || px == width - 1 || py == height - 1;
        let has_different_neighbor = (px > 0 && idx.get(px - 1, py) != color)
            || (px + 1 < width && idx.get(px + 1, py) != color)
            || (py > 0 && idx.get(px, py - 1) != color)
            || (py + 1 < height && idx.get(px, py + 1) != color);

        if is_boundary || has_different_neighbor {
            facet.border_points.push((px, py));
        }
    };

    flood_fill::fill_with_callback(x, y, width, height, visited, &mut include, &mut on_fill);
    facet
}

/// Flood-fill the whole color-index grid into facets, in row-major scan
/// order (matching the reference's raster walk so facet ids are assigned
/// deterministically for a fixed `IDX`).
pub fn build_all_facets(idx: &ColorIndexGrid, fid: &mut FacetIdGrid) -> Vec<FacetSlot> {
    let width = idx.width();
    let height = idx.height();
    let mut visited = vec![false; width * height];
    let mut facets = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] {
                continue;
            }
            let color = idx.get(x, y);
            let facet_id = facets.len() as u32;
            let facet = build_facet(facet_id, color, x, y, &mut visited, idx, fid);
            facets.push(FacetSlot::Present(facet));
        }
    }

    facets
}

/// Recompute `facet.neighbors` from its border points and clear `dirty`.
pub fn build_neighbors(facet: &mut Facet, fid: &FacetIdGrid) {
    let width = fid.width();
    let height = fid.height();
    facet.neighbors.clear();

    for &(x, y) in &facet.border_points {
        if x > 0 {
            let n = fid.get(x - 1, y);
            if n != facet.id && n != FacetIdGrid::NONE {
                facet.neighbors.insert(n);
            }
        }
        if x + 1 < width {
            let n = fid.get(x + 1, y);
            if n != facet.id && n != FacetIdGrid::NONE {
                facet.neighbors.insert(n);
            }
        }
        if y > 0 {
            let n = fid.get(x, y - 1);
            if n != facet.id && n != FacetIdGrid::NONE {
                facet.neighbors.insert(n);
            }
        }
        if y + 1 < height {
            let n = fid.get(x, y + 1);
            if n != facet.id && n != FacetIdGrid::NONE {
                facet.neighbors.insert(n);
            }
        }
    }

    facet.dirty = false;
}
