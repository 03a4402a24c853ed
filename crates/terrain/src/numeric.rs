//! Numeric helpers shared by tile generation, edge matching and blending.

use std::cmp::Ordering;

/// Vertices further than this (in grid steps) from a grid line are treated as off-grid.
const GRID_SNAP_TOLERANCE: f64 = 1e-6;

/// Truncates a coordinate toward zero to form one half of an edge key.
pub fn quantize(value: f64) -> i64 {
    value.trunc() as i64
}

/// Absolute-tolerance float comparison used by the already-merged check.
pub fn close_enough(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Position of grid line `i` on a side of length `size` split into `segments`.
///
/// Both outer lines are pinned to exactly `±size / 2` so boundary vertices
/// can be classified with `==`.
pub fn grid_coordinate(i: u32, segments: u32, size: f64) -> f64 {
    let half = size / 2.0;
    if i == 0 {
        -half
    } else if i >= segments {
        half
    } else {
        -half + size * f64::from(i) / f64::from(segments)
    }
}

/// Number of whole grid steps covered by `distance`, or `None` when the
/// distance does not land on a grid line.
pub fn grid_steps(distance: f64, step: f64) -> Option<u32> {
    let steps = distance.abs() / step;
    let snapped = steps.round();
    if (steps - snapped).abs() > GRID_SNAP_TOLERANCE {
        return None;
    }
    Some(snapped as u32)
}

/// Share of the remaining difference applied `j` steps away from an edge.
///
/// Full weight on the edge, fading linearly to zero at `depth`.
pub fn falloff_weight(j: u32, depth: u32) -> f64 {
    if depth == 0 || j >= depth {
        return 0.0;
    }
    f64::from(depth - j) / f64::from(depth)
}

/// Canonical vertex order: ascending in-plane x, then descending in-plane y.
///
/// This is the column-major layout a heightfield consumer expects, with the
/// north-west corner first.
pub fn canonical_cmp(a: [f64; 3], b: [f64; 3]) -> Ordering {
    a[0].total_cmp(&b[0]).then_with(|| b[1].total_cmp(&a[1]))
}
