//! Pole-of-inaccessibility label-point locator (mapbox/polylabel): the
//! interior point of a polygon maximizing distance to the boundary, used to
//! seed stable per-facet label placement.

use std::collections::BinaryHeap;
use std::cmp::Ordering;

use crate::border;
use crate::facet::Facet;
use crate::grid::FacetIdGrid;

pub type Point = (f64, f64);
pub type Ring = Vec<Point>;

/// Result of locating a label point: the point itself and its distance to
/// the nearest boundary edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPoint {
    pub point: Point,
    pub distance: f64,
}

#[derive(Clone)]
struct Cell {
    x: f64,
    y: f64,
    h: f64,
    d: f64,
    max: f64,
}

impl Cell {
    fn new(x: f64, y: f64, h: f64, rings: &[Ring]) -> Self {
        let d = point_to_polygon_dist(x, y, rings);
        Self {
            x,
            y,
            h,
            d,
            max: d + h * std::f64::consts::SQRT_2,
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.max == other.max
    }
}
impl Eq for Cell {}
impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max.total_cmp(&other.max)
    }
}

fn seg_dist_sq(px: f64, py: f64, a: Point, b: Point) -> f64 {
    let (mut x, mut y) = a;
    let dx = b.0 - x;
    let dy = b.1 - y;

    if dx != 0.0 || dy != 0.0 {
        let t = ((px - x) * dx + (py - y) * dy) / (dx * dx + dy * dy);
        if t > 1.0 {
            x = b.0;
            y = b.1;
        } else if t > 0.0 {
            x += dx * t;
            y += dy * t;
        }
    }

    let dx = px - x;
    let dy = py - y;
    dx * dx + dy * dy
}

/// Signed distance from `(x, y)` to the polygon outline: negative outside,
/// positive inside, magnitude the distance to the nearest edge.
fn point_to_polygon_dist(x: f64, y: f64, rings: &[Ring]) -> f64 {
    let mut inside = false;
    let mut min_dist_sq = f64::INFINITY;

    for ring in rings {
        let n = ring.len();
        if n == 0 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let a = ring[i];
            let b = ring[j];

            if (a.1 > y) != (b.1 > y) && x < (b.0 - a.0) * (y - a.1) / (b.1 - a.1) + a.0 {
                inside = !inside;
            }
            min_dist_sq = min_dist_sq.min(seg_dist_sq(x, y, a, b));
            j = i;
        }
    }

    let sign = if inside { 1.0 } else { -1.0 };
    sign * min_dist_sq.sqrt()
}

fn centroid_cell(rings: &[Ring]) -> Cell {
    let outer = &rings[0];
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    let n = outer.len();
    if n == 0 {
        return Cell::new(0.0, 0.0, 0.0, rings);
    }

    let mut j = n - 1;
    for i in 0..n {
        let a = outer[i];
        let b = outer[j];
        let f = a.0 * b.1 - b.0 * a.1;
        cx += (a.0 + b.0) * f;
        cy += (a.1 + b.1) * f;
        area += f * 3.0;
        j = i;
    }

    if area == 0.0 {
        return Cell::new(outer[0].0, outer[0].1, 0.0, rings);
    }
    Cell::new(cx / area, cy / area, 0.0, rings)
}

/// Find the pole of inaccessibility of `rings` (outer ring first, then any
/// holes), to within `precision`.
pub fn polylabel(rings: &[Ring], precision: f64) -> LabelPoint {
    let outer = &rings[0];
    let (mut min_x, mut min_y, mut max_x, mut max_y) =
        (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in outer {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let width = max_x - min_x;
    let height = max_y - min_y;
    let cell_size = width.min(height);
    let mut h = cell_size / 2.0;

    if cell_size == 0.0 || outer.is_empty() {
        let pt = outer.first().copied().unwrap_or((min_x, min_y));
        return LabelPoint { point: pt, distance: 0.0 };
    }

    let mut queue: BinaryHeap<Cell> = BinaryHeap::new();
    let mut y = min_y;
    while y < max_y {
        let mut x = min_x;
        while x < max_x {
            queue.push(Cell::new(x + h, y + h, h, rings));
            x += cell_size;
        }
        y += cell_size;
    }

    let mut best = centroid_cell(rings);
    let bbox_cell = Cell::new(min_x + width / 2.0, min_y + height / 2.0, 0.0, rings);
    if bbox_cell.d > best.d {
        best = bbox_cell;
    }

    while let Some(cell) = queue.pop() {
        if cell.d > best.d {
            best = cell.clone();
        }
        if cell.max - best.d <= precision {
            continue;
        }

        h = cell.h / 2.0;
        queue.push(Cell::new(cell.x - h, cell.y - h, h, rings));
        queue.push(Cell::new(cell.x + h, cell.y - h, h, rings));
        queue.push(Cell::new(cell.x - h, cell.y + h, h, rings));
        queue.push(Cell::new(cell.x + h, cell.y + h, h, rings));
    }

    LabelPoint {
        point: (best.x, best.y),
        distance: best.d,
    }
}

/// Locate `facet`'s label anchor from its traced outer boundary (precision
/// of one pixel) and size a square label bbox from the distance to edge.
/// Facets with fewer than 3 border-tracing points (a single pixel, or a
/// degenerate 2-pixel sliver) fall back to their single traced point with
/// zero distance.
pub fn locate_label(facet: &Facet, fid: &FacetIdGrid) -> LabelPoint {
    let trace = border::trace_pixels(facet.id, facet, fid);
    if trace.len() < 3 {
        let pt = trace.first().copied().unwrap_or((
            facet.bbox.min_x as f64,
            facet.bbox.min_y as f64,
        ));
        return LabelPoint {
            point: (pt.0 as f64, pt.1 as f64),
            distance: 0.0,
        };
    }

    let ring: Ring = trace.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    polylabel(&[ring], 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_pole_is_near_center() {
        let ring: Ring = vec![(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (0.0, 10.0)];
        let result = polylabel(&[ring], 1.0);
        assert!((result.point.0 - 10.0).abs() < 1.0);
        assert!((result.point.1 - 5.0).abs() < 1.0);
        assert!((result.distance - 5.0).abs() < 1.0);
    }

    #[test]
    fn degenerate_zero_area_ring_returns_first_vertex() {
        let ring: Ring = vec![(3.0, 4.0), (3.0, 4.0)];
        let result = polylabel(&[ring], 1.0);
        assert_eq!(result.point, (3.0, 4.0));
        assert_eq!(result.distance, 0.0);
    }

    #[test]
    fn point_inside_square_has_positive_signed_distance() {
        let ring: Ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let d = point_to_polygon_dist(5.0, 5.0, &[ring]);
        assert!(d > 0.0);
    }

    #[test]
    fn point_outside_square_has_negative_signed_distance() {
        let ring: Ring = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let d = point_to_polygon_dist(50.0, 50.0, &[ring]);
        assert!(d < 0.0);
    }
}
