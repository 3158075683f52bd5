//! Scanline, 4-connected flood fill over a predicate.
//!
//! An include predicate plus a shared visited buffer drive the fill rather
//! than a fixed color test, so the same routine serves both the facet
//! builder (color equality) and the reducer's rebuild (reassigned-color
//! equality). Implemented as an iterative run-queue scanline: from the
//! seed, extend left/right to the maximal included run on the seed row,
//! then push maximal runs on the row above/below tagged with the direction
//! they came from so each seed only rescans the opposite row.

/// Which row a queued run should continue scanning into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentDirection {
    /// Came from the fill's own seed; scan both neighboring rows.
    Seed,
    /// Came from the row above; only the row below needs checking next.
    FromAbove,
    /// Came from the row below; only the row above needs checking next.
    FromBelow,
}

struct Run {
    x1: usize,
    x2: usize,
    y: usize,
    from: ParentDirection,
}

/// Flood-fill `include(x, y)` starting at `(seed_x, seed_y)`, collecting all
/// reached points. `visited` is shared scratch space reused across calls by
/// callers that need to avoid per-fill allocation.
pub fn fill_collect(
    seed_x: usize,
    seed_y: usize,
    width: usize,
    height: usize,
    visited: &mut [bool],
    include: &mut dyn FnMut(usize, usize) -> bool,
) -> Vec<(usize, usize)> {
    let mut points = Vec::new();
    fill_with_callback(seed_x, seed_y, width, height, visited, include, &mut |x, y| {
        points.push((x, y));
    });
    points
}

/// Flood-fill `include(x, y)` starting at `(seed_x, seed_y)`, invoking
/// `on_fill` for every reached pixel exactly once. Returns the count of
/// filled pixels.
pub fn fill_with_callback(
    seed_x: usize,
    seed_y: usize,
    width: usize,
    height: usize,
    visited: &mut [bool],
    include: &mut dyn FnMut(usize, usize) -> bool,
    on_fill: &mut dyn FnMut(usize, usize),
) -> usize {
    debug_assert_eq!(visited.len(), width * height);
    if width == 0 || height == 0 || seed_x >= width || seed_y >= height {
        return 0;
    }
    if visited[seed_y * width + seed_x] || !include(seed_x, seed_y) {
        return 0;
    }

    let mut count = 0usize;
    let mut queue: Vec<Run> = vec![Run {
        x1: seed_x,
        x2: seed_x,
        y: seed_y,
        from: ParentDirection::Seed,
    }];

    while let Some(run) = queue.pop() {
        let y = run.y;

        // Extend the seed column left/right on this row to the maximal
        // included, unvisited run, marking and emitting as we go.
        let mut x1 = run.x1;
        while x1 > 0 && !visited[y * width + x1 - 1] && include(x1 - 1, y) {
            x1 -= 1;
        }
        let mut x2 = run.x2;
        while x2 + 1 < width && !visited[y * width + x2 + 1] && include(x2 + 1, y) {
            x2 += 1;
        }

        for x in x1..=x2 {
            let idx = y * width + x;
            if !visited[idx] {
                visited[idx] = true;
                on_fill(x, y);
                count += 1;
            }
        }

        let scan_up = !matches!(run.from, ParentDirection::FromAbove);
        let scan_down = !matches!(run.from, ParentDirection::FromBelow);

        if scan_up && y > 0 {
            push_runs(x1, x2, y - 1, width, visited, include, ParentDirection::FromBelow, &mut queue);
        }
        if scan_down && y + 1 < height {
            push_runs(x1, x2, y + 1, width, visited, include, ParentDirection::FromAbove, &mut queue);
        }
    }

    count
}

/// Scan `[x1, x2]` on row `y` and push each maximal included, unvisited
/// sub-run as a new seed, tagged with the direction it should continue
/// scanning (away from the row it came from).
#[allow(clippy::too_many_arguments)]
fn push_runs(
    x1: usize,
    x2: usize,
    y: usize,
    width: usize,
    visited: &[bool],
    include: &mut dyn FnMut(usize, usize) -> bool,
    from: ParentDirection,
    queue: &mut Vec<Run>,
) {
    let mut x = x1;
    while x <= x2 {
        if visited[y * width + x] || !include(x, y) {
            x += 1;
            continue;
        }
        let run_start = x;
        while x <= x2 && !visited[y * width + x] && include(x, y) {
            x += 1;
        }
        queue.push(Run {
            x1: run_start,
            x2: x - 1,
            y,
            from,
        });
    }
}
