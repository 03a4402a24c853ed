//! Seam blending between adjacent tiles.
//!
//! Both tiles converge on the mean of their shared boundary, and the
//! correction fades linearly into each tile over `falloff_depth` grid steps.

use std::collections::BTreeMap;

use crate::{
    config::TerrainConfig,
    coord::Corner,
    edges::{Axis, Edge, EdgeIndex, EdgeKey, EdgeVertex},
    errors::TerrainError,
    mesh::TileMesh,
    numeric::{close_enough, falloff_weight, grid_steps, lerp},
};

/// Result of [`SeamBlender::blend`].
#[derive(Debug, Clone)]
pub enum BlendOutcome {
    /// The edges already agreed; nothing was changed.
    AlreadyMerged,
    /// Updated copies of both tiles.
    Blended { a: TileMesh, b: TileMesh },
}

#[derive(Debug, Clone, Copy)]
pub struct SeamBlender {
    falloff_depth: u32,
    tolerance: f64,
}

impl SeamBlender {
    pub fn new(falloff_depth: u32, tolerance: f64) -> Self {
        Self {
            falloff_depth,
            tolerance,
        }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.falloff_depth, config.merge_tolerance)
    }

    pub fn falloff_depth(&self) -> u32 {
        self.falloff_depth
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True when every boundary pair already agrees within tolerance.
    pub fn edges_merged(&self, a: &TileMesh, b: &TileMesh, edge: Edge) -> Result<bool, TerrainError> {
        let pairs = pair_edges(a, b, edge)?;
        Ok(self.pairs_merged(&pairs))
    }

    fn pairs_merged(&self, pairs: &[EdgePair]) -> bool {
        pairs
            .iter()
            .all(|p| close_enough(p.a.elevation(), p.b.elevation(), self.tolerance))
    }

    /// Blends copies of `a` and `b`, where `b` lies across `edge` of `a`.
    ///
    /// The inputs are left untouched.
    pub fn blend(&self, a: &TileMesh, b: &TileMesh, edge: Edge) -> Result<BlendOutcome, TerrainError> {
        let mut a = a.clone();
        let mut b = b.clone();
        if self.blend_in_place(&mut a, &mut b, edge)? {
            Ok(BlendOutcome::Blended { a, b })
        } else {
            Ok(BlendOutcome::AlreadyMerged)
        }
    }

    /// Blends `a` and `b` in place. Returns false when they were already merged.
    ///
    /// Every check runs before the first write, so a failed blend leaves
    /// both tiles as they were.
    pub fn blend_in_place(
        &self,
        a: &mut TileMesh,
        b: &mut TileMesh,
        edge: Edge,
    ) -> Result<bool, TerrainError> {
        if self.falloff_depth == 0 || self.falloff_depth > a.segments() / 2 {
            return Err(TerrainError::InvalidConfig(format!(
                "falloff depth {} must be between 1 and {} (half of {} segments)",
                self.falloff_depth,
                a.segments() / 2,
                a.segments()
            )));
        }

        let pairs = pair_edges(a, b, edge)?;
        if self.pairs_merged(&pairs) {
            tracing::debug!(
                tile = %a.coord(),
                neighbor = %b.coord(),
                %edge,
                "Edges already merged"
            );
            return Ok(false);
        }

        let targets: BTreeMap<EdgeKey, f64> = pairs
            .iter()
            .map(|p| (p.key, (p.a.elevation() + p.b.elevation()) / 2.0))
            .collect();
        let neighbor_targets: BTreeMap<EdgeKey, f64> = targets
            .iter()
            .map(|(key, target)| (key.counterpart(edge), *target))
            .collect();

        let nudged_a = apply_falloff(a, edge, &targets, self.falloff_depth);
        let nudged_b = apply_falloff(b, edge.opposite(), &neighbor_targets, self.falloff_depth);

        tracing::debug!(
            tile = %a.coord(),
            neighbor = %b.coord(),
            %edge,
            nudged_a,
            nudged_b,
            "Blended seam"
        );

        Ok(true)
    }

    /// Brings every copy of one lattice corner point to a common height.
    ///
    /// `tiles` holds each tile sharing the point together with the corner
    /// of that tile sitting on it. Returns true when any elevation changed.
    pub fn reconcile_corner(&self, tiles: &mut [(Corner, &mut TileMesh)]) -> bool {
        if tiles.len() < 2 {
            return false;
        }

        let values: Vec<f64> = tiles
            .iter()
            .map(|(corner, tile)| tile.elevation(tile.corner_index(*corner)))
            .collect();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if close_enough(min, max, self.tolerance) {
            return false;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        for (corner, tile) in tiles.iter_mut() {
            let index = tile.corner_index(*corner);
            tile.set_elevation(index, mean);
        }
        true
    }
}

/// Largest elevation difference across the edge shared by `a` and `b`.
pub fn seam_disagreement(a: &TileMesh, b: &TileMesh, edge: Edge) -> Result<f64, TerrainError> {
    let pairs = pair_edges(a, b, edge)?;
    Ok(pairs
        .iter()
        .map(|p| (p.a.elevation() - p.b.elevation()).abs())
        .fold(0.0, f64::max))
}

/// One boundary point seen from both tiles; `key` is in `a`'s frame.
#[derive(Debug, Clone, Copy)]
struct EdgePair {
    key: EdgeKey,
    a: EdgeVertex,
    b: EdgeVertex,
}

fn pair_edges(a: &TileMesh, b: &TileMesh, edge: Edge) -> Result<Vec<EdgePair>, TerrainError> {
    let mismatch = |reason: String| TerrainError::EdgeMismatch {
        tile: a.coord(),
        edge,
        reason,
    };

    if a.segments() != b.segments() || a.size() != b.size() {
        return Err(mismatch(format!(
            "{} segments over {} vs {} segments over {}",
            a.segments(),
            a.size(),
            b.segments(),
            b.size()
        )));
    }

    let edge_a = EdgeIndex::build(a).into_edge(edge);
    let edge_b = EdgeIndex::build(b).into_edge(edge.opposite());
    if edge_a.len() != edge_b.len() {
        return Err(mismatch(format!(
            "{} boundary vertices vs {}",
            edge_a.len(),
            edge_b.len()
        )));
    }

    edge_a
        .into_iter()
        .map(|(key, vertex_a)| {
            let vertex_b = edge_b
                .get(&key.counterpart(edge))
                .ok_or_else(|| mismatch(format!("no counterpart for key {key}")))?;
            Ok(EdgePair {
                key,
                a: vertex_a,
                b: *vertex_b,
            })
        })
        .collect()
}

/// Nudges every vertex within the falloff band of `edge` toward the target
/// of its projection onto the edge. Returns the number of vertices touched.
///
/// Inside a corner, a vertex strictly closer to a perpendicular edge than
/// to `edge` is left to that edge, so the perpendicular boundary rows only
/// move at the shared corner vertex.
fn apply_falloff(
    tile: &mut TileMesh,
    edge: Edge,
    targets: &BTreeMap<EdgeKey, f64>,
    depth: u32,
) -> usize {
    let half = tile.half_extent();
    let step = tile.step();
    let edge_line = edge.sign() * half;
    let axis = edge.perpendicular_axis();
    let mut nudged = 0;

    for index in 0..tile.vertex_count() {
        let [x, y, elevation] = tile.vertex(index);
        let (across, along) = match axis {
            Axis::X => (x, y),
            Axis::Y => (y, x),
        };

        let Some(j) = grid_steps(edge_line - across, step) else {
            continue;
        };
        if j >= depth {
            continue;
        }
        let Some(to_side) = grid_steps(half - along.abs(), step) else {
            continue;
        };
        if to_side < j {
            continue;
        }

        let key = match axis {
            Axis::X => EdgeKey::from_point(edge_line, along),
            Axis::Y => EdgeKey::from_point(along, edge_line),
        };
        if let Some(target) = targets.get(&key) {
            tile.set_elevation(index, lerp(elevation, *target, falloff_weight(j, depth)));
            nudged += 1;
        }
    }

    nudged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coord::TileCoord, mesh::TileGenerator};

    fn flat(coord: TileCoord, size: f64, segments: u32, height: f64) -> TileMesh {
        TileGenerator::new(size, segments)
            .generate(coord, &move |_x: f64, _z: f64| height)
            .unwrap()
    }

    fn height_at(tile: &TileMesh, column: usize, row: usize) -> f64 {
        tile.elevation(tile.index_of(column, row))
    }

    #[test]
    fn test_flat_pair_meets_in_the_middle() {
        let blender = SeamBlender::new(2, 1e-4);
        let mut a = flat(TileCoord::new(0, 0), 64.0, 4, 10.0);
        let mut b = flat(TileCoord::new(1, 0), 64.0, 4, 20.0);

        assert!(blender.blend_in_place(&mut a, &mut b, Edge::East).unwrap());

        for row in 0..5 {
            assert_eq!(height_at(&a, 4, row), 15.0);
            assert_eq!(height_at(&b, 0, row), 15.0);
            assert_eq!(height_at(&a, 3, 2), 12.5);
            assert_eq!(height_at(&b, 1, 2), 17.5);
        }
        // Depth >= D keeps the original heights.
        for row in 0..5 {
            for column in 0..=2 {
                assert_eq!(height_at(&a, column, row), 10.0);
                assert_eq!(height_at(&b, 4 - column, row), 20.0);
            }
        }
    }

    #[test]
    fn test_interior_beyond_falloff_depth_is_untouched() {
        let blender = SeamBlender::new(4, 1e-4);
        let mut a = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let mut b = flat(TileCoord::new(1, 0), 64.0, 16, 20.0);

        blender.blend_in_place(&mut a, &mut b, Edge::East).unwrap();

        assert!(seam_disagreement(&a, &b, Edge::East).unwrap() < 1e-9);
        for row in 0..=16 {
            assert_eq!(height_at(&a, 16, row), 15.0);
            for column in 0..=12 {
                assert_eq!(height_at(&a, column, row), 10.0);
                assert_eq!(height_at(&b, 16 - column, row), 20.0);
            }
        }
    }

    #[test]
    fn test_blending_is_idempotent() {
        let blender = SeamBlender::new(4, 1e-4);
        let a = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let b = flat(TileCoord::new(0, -1), 64.0, 16, 30.0);

        let BlendOutcome::Blended { a, b } = blender.blend(&a, &b, Edge::North).unwrap() else {
            panic!("first blend should change the tiles");
        };
        assert!(matches!(
            blender.blend(&a, &b, Edge::North).unwrap(),
            BlendOutcome::AlreadyMerged
        ));
        assert!(blender.edges_merged(&a, &b, Edge::North).unwrap());
    }

    #[test]
    fn test_blend_leaves_inputs_untouched() {
        let blender = SeamBlender::new(4, 1e-4);
        let a = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let b = flat(TileCoord::new(-1, 0), 64.0, 16, 0.0);

        let outcome = blender.blend(&a, &b, Edge::West).unwrap();

        assert!(matches!(outcome, BlendOutcome::Blended { .. }));
        assert!(a.heightfield().iter().all(|h| *h == 10.0));
        assert!(b.heightfield().iter().all(|h| *h == 0.0));
    }

    #[test]
    fn test_edges_converge_for_noisy_tiles() {
        let blender = SeamBlender::new(8, 1e-4);
        let generator = TileGenerator::new(1024.0, 63);
        let a = generator
            .generate(TileCoord::new(0, 0), &|x: f64, z: f64| (x * 0.01).sin() * 40.0 + z * 0.003)
            .unwrap();
        let b = generator
            .generate(TileCoord::new(0, 1), &|x: f64, z: f64| (z * 0.02).cos() * 25.0 - x * 0.01)
            .unwrap();
        assert!(seam_disagreement(&a, &b, Edge::South).unwrap() > 1.0);

        let BlendOutcome::Blended { a, b } = blender.blend(&a, &b, Edge::South).unwrap() else {
            panic!("tiles should need blending");
        };

        assert!(seam_disagreement(&a, &b, Edge::South).unwrap() < 1e-4);
    }

    #[test]
    fn test_falloff_is_monotonic() {
        let depth = 4;
        let blender = SeamBlender::new(depth, 1e-4);
        let original = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let mut a = original.clone();
        let mut b = flat(TileCoord::new(1, 0), 64.0, 16, 26.0);

        blender.blend_in_place(&mut a, &mut b, Edge::East).unwrap();

        let row = 8;
        let corrections: Vec<f64> = (0..=16)
            .map(|j| (height_at(&a, 16 - j, row) - height_at(&original, 16 - j, row)).abs())
            .collect();
        assert_eq!(corrections[0], 8.0);
        for window in corrections.windows(2) {
            assert!(window[1] <= window[0], "{corrections:?}");
        }
        assert!(corrections[depth as usize..].iter().all(|c| *c == 0.0));
    }

    #[test]
    fn test_perpendicular_boundary_rows_only_move_at_the_corner() {
        let blender = SeamBlender::new(4, 1e-4);
        let mut a = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let mut b = flat(TileCoord::new(-1, 0), 64.0, 16, 30.0);

        blender.blend_in_place(&mut a, &mut b, Edge::West).unwrap();

        // North boundary row of `a`: only the west corner changes.
        assert_eq!(height_at(&a, 0, 0), 20.0);
        for column in 1..=16 {
            assert_eq!(height_at(&a, column, 0), 10.0);
        }
        // Diagonal vertices near the corner still fade.
        assert_eq!(height_at(&a, 1, 1), 17.5);
    }

    #[test]
    fn test_corner_is_not_overshot_by_two_blends() {
        let blender = SeamBlender::new(4, 1e-4);
        let mut tile = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let mut west = flat(TileCoord::new(-1, 0), 64.0, 16, 30.0);
        let mut north = flat(TileCoord::new(0, -1), 64.0, 16, 50.0);

        blender.blend_in_place(&mut tile, &mut west, Edge::West).unwrap();
        let after_west = tile.elevation(tile.corner_index(Corner::NorthWest));
        assert_eq!(after_west, 20.0);

        blender.blend_in_place(&mut tile, &mut north, Edge::North).unwrap();
        let corner = tile.elevation(tile.corner_index(Corner::NorthWest));

        // One full correction toward the north target, starting from the west one.
        assert_eq!(corner, (20.0 + 50.0) / 2.0);
        assert!((10.0..=50.0).contains(&corner));
    }

    #[test]
    fn test_reconcile_corner_averages_shared_point() {
        let blender = SeamBlender::new(4, 1e-4);
        let mut nw = flat(TileCoord::new(0, 0), 64.0, 16, 10.0);
        let mut ne = flat(TileCoord::new(1, 0), 64.0, 16, 20.0);
        let mut se = flat(TileCoord::new(1, 1), 64.0, 16, 30.0);

        let changed = blender.reconcile_corner(&mut [
            (Corner::SouthEast, &mut nw),
            (Corner::SouthWest, &mut ne),
            (Corner::NorthWest, &mut se),
        ]);

        assert!(changed);
        assert_eq!(nw.elevation(nw.corner_index(Corner::SouthEast)), 20.0);
        assert_eq!(ne.elevation(ne.corner_index(Corner::SouthWest)), 20.0);
        assert_eq!(se.elevation(se.corner_index(Corner::NorthWest)), 20.0);
        // Nothing else moves.
        assert_eq!(nw.elevation(nw.corner_index(Corner::NorthWest)), 10.0);

        assert!(!blender.reconcile_corner(&mut [
            (Corner::SouthEast, &mut nw),
            (Corner::SouthWest, &mut ne),
        ]));
    }

    #[test]
    fn test_mismatched_segments_fail_before_writing() {
        let blender = SeamBlender::new(2, 1e-4);
        let mut a = flat(TileCoord::new(0, 0), 64.0, 8, 10.0);
        let mut b = flat(TileCoord::new(1, 0), 64.0, 4, 20.0);

        let result = blender.blend_in_place(&mut a, &mut b, Edge::East);

        assert!(matches!(result, Err(TerrainError::EdgeMismatch { .. })));
        assert!(a.heightfield().iter().all(|h| *h == 10.0));
        assert!(b.heightfield().iter().all(|h| *h == 20.0));
    }

    #[test]
    fn test_falloff_deeper_than_half_tile_is_rejected() {
        let blender = SeamBlender::new(8, 1e-4);
        let mut a = flat(TileCoord::new(0, 0), 64.0, 4, 10.0);
        let mut b = flat(TileCoord::new(1, 0), 64.0, 4, 20.0);

        match blender.blend_in_place(&mut a, &mut b, Edge::East) {
            Err(TerrainError::InvalidConfig(message)) => {
                assert!(message.contains("between 1 and 2"), "{message}");
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }
}
