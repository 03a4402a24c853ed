//! Region generation: a square spiral out from the origin that generates
//! each missing tile and blends it into whatever already surrounds it.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    blend::SeamBlender,
    config::TerrainConfig,
    coord::{LatticePoint, TileCoord},
    edges::Edge,
    elevation::ElevationSource,
    errors::TerrainError,
    mesh::{TileGenerator, TileMesh},
    store::TileStore,
};

/// Order in which a new tile is blended against its existing neighbors.
const BLEND_ORDER: [Edge; 4] = [Edge::West, Edge::North, Edge::East, Edge::South];

/// The first `radius²` cells of a square spiral around the origin.
#[derive(Debug, Clone)]
pub struct Spiral {
    remaining: u64,
    x: i32,
    z: i32,
    dx: i32,
    dz: i32,
}

impl Spiral {
    pub fn new(radius: u32) -> Self {
        Self {
            remaining: u64::from(radius) * u64::from(radius),
            x: 0,
            z: 0,
            dx: 0,
            dz: -1,
        }
    }
}

impl Iterator for Spiral {
    type Item = TileCoord;

    fn next(&mut self) -> Option<TileCoord> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = TileCoord::new(self.x, self.z);
        let (x, z) = (self.x, self.z);
        if x == z || (x < 0 && x == -z) || (x > 0 && x == 1 - z) {
            (self.dx, self.dz) = (-self.dz, self.dx);
        }
        self.x += self.dx;
        self.z += self.dz;

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// True when `coord` lies in the `radius × radius` block a walk covers.
pub fn region_contains(radius: u32, coord: TileCoord) -> bool {
    let radius = i64::from(radius);
    let inside = |c: i32| {
        let doubled = 2 * i64::from(c);
        doubled > -radius && doubled <= radius
    };
    inside(coord.x) && inside(coord.z)
}

/// Counters reported by [`GridWalker::walk`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalkSummary {
    /// Cells inside the region the walk reached.
    pub visited: usize,
    pub generated: usize,
    /// Cells that already had a stored tile.
    pub skipped: usize,
    pub seams_blended: usize,
    pub corners_reconciled: usize,
    /// Store writes, neighbors included.
    pub tiles_written: usize,
}

/// Generates and blends regions of tiles into a [`TileStore`].
///
/// Per-tile locks live in the [`TileStore`], so any number of walkers over
/// clones of one store can walk overlapping regions at once.
#[derive(Clone)]
pub struct GridWalker {
    store: TileStore,
    generator: TileGenerator,
    blender: SeamBlender,
    source: Arc<dyn ElevationSource>,
    max_radius: u32,
}

impl GridWalker {
    pub fn new(
        config: &TerrainConfig,
        store: TileStore,
        source: Arc<dyn ElevationSource>,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        Ok(Self {
            store,
            generator: TileGenerator::from_config(config),
            blender: SeamBlender::from_config(config),
            source,
            max_radius: config.max_region_radius,
        })
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn max_radius(&self) -> u32 {
        self.max_radius
    }

    /// Generates every missing tile of the `radius × radius` block around
    /// the origin, in spiral order.
    ///
    /// Tiles already in the store are left alone, so running the same walk
    /// again after a failure picks up where it stopped.
    pub async fn walk(&self, radius: u32) -> Result<WalkSummary, TerrainError> {
        if radius == 0 || radius > self.max_radius {
            return Err(TerrainError::InvalidRegion {
                radius,
                max: self.max_radius,
            });
        }

        tracing::info!(radius, "Walking region");

        let mut summary = WalkSummary::default();
        for coord in Spiral::new(radius).filter(|c| region_contains(radius, *c)) {
            summary.visited += 1;
            if let Err(e) = self.visit(coord, &mut summary).await {
                tracing::error!(tile = %coord, error = %e, "Region walk aborted");
                return Err(e);
            }
        }

        tracing::info!(
            radius,
            generated = summary.generated,
            skipped = summary.skipped,
            seams = summary.seams_blended,
            written = summary.tiles_written,
            "Region walk finished"
        );
        Ok(summary)
    }

    async fn visit(&self, coord: TileCoord, summary: &mut WalkSummary) -> Result<(), TerrainError> {
        let _guards = self.store.locks().lock_many(coord.neighborhood()).await;

        if self.store.exists(coord).await? {
            tracing::debug!(tile = %coord, "Tile already stored");
            summary.skipped += 1;
            return Ok(());
        }

        let mut tile = self.generate(coord).await?;

        let mut neighbors = HashMap::new();
        for neighbor in coord.neighborhood().filter(|n| *n != coord) {
            if let Some(stored) = self.store.try_load(neighbor).await? {
                neighbors.insert(neighbor, stored);
            }
        }

        let mut dirty = BTreeSet::new();
        for edge in BLEND_ORDER {
            let Some(neighbor) = neighbors.get_mut(&coord.neighbor(edge)) else {
                continue;
            };
            if self.blender.blend_in_place(&mut tile, neighbor, edge)? {
                summary.seams_blended += 1;
                dirty.insert(neighbor.coord());
            }
        }

        for point in coord.corner_points() {
            if self.reconcile(point, &mut tile, &mut neighbors, &mut dirty) {
                summary.corners_reconciled += 1;
            }
        }

        // The new tile goes last: its presence marks the cell as done.
        for neighbor in &dirty {
            self.store.save(&neighbors[neighbor]).await?;
            summary.tiles_written += 1;
        }
        self.store.save(&tile).await?;
        summary.tiles_written += 1;
        summary.generated += 1;

        tracing::debug!(
            tile = %coord,
            neighbors = neighbors.len(),
            updated = dirty.len(),
            "Tile generated"
        );
        Ok(())
    }

    async fn generate(&self, coord: TileCoord) -> Result<TileMesh, TerrainError> {
        let generator = self.generator;
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || generator.generate(coord, source.as_ref())).await?
    }

    /// Averages every stored copy of `point` together with the new tile's.
    fn reconcile(
        &self,
        point: LatticePoint,
        tile: &mut TileMesh,
        neighbors: &mut HashMap<TileCoord, TileMesh>,
        dirty: &mut BTreeSet<TileCoord>,
    ) -> bool {
        let Some(own_corner) = point.corner_of(tile.coord()) else {
            return false;
        };

        let sharing: Vec<TileCoord> = neighbors
            .keys()
            .copied()
            .filter(|c| point.corner_of(*c).is_some())
            .collect();
        if sharing.is_empty() {
            return false;
        }

        let mut corners = vec![(own_corner, tile)];
        corners.extend(
            neighbors
                .iter_mut()
                .filter_map(|(c, t)| point.corner_of(*c).map(|corner| (corner, t))),
        );

        if !self.blender.reconcile_corner(&mut corners) {
            return false;
        }
        dirty.extend(sharing);
        true
    }
}

impl std::fmt::Debug for GridWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridWalker")
            .field("store", &self.store)
            .field("generator", &self.generator)
            .field("blender", &self.blender)
            .field("max_radius", &self.max_radius)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::seam_disagreement;

    /// Every tile flat at its own height, so every seam starts as a step.
    struct Plateaus;

    impl ElevationSource for Plateaus {
        fn elevation(&self, _x: f64, _z: f64) -> f64 {
            0.0
        }

        fn tile_elevation(&self, tile: TileCoord, _x: f64, _z: f64) -> f64 {
            f64::from(10 * tile.x + 3 * tile.z)
        }
    }

    struct BrokenAt(TileCoord);

    impl ElevationSource for BrokenAt {
        fn elevation(&self, _x: f64, _z: f64) -> f64 {
            1.0
        }

        fn tile_elevation(&self, tile: TileCoord, _x: f64, _z: f64) -> f64 {
            if tile == self.0 { f64::NAN } else { 1.0 }
        }
    }

    fn config() -> TerrainConfig {
        TerrainConfig {
            tile_size: 64.0,
            segments: 4,
            falloff_depth: 2,
            max_region_radius: 8,
            ..Default::default()
        }
    }

    fn walker(source: impl ElevationSource + 'static) -> GridWalker {
        GridWalker::new(&config(), TileStore::new_in_memory(), Arc::new(source)).unwrap()
    }

    async fn assert_converged(store: &TileStore, radius: u32) {
        let coords: Vec<TileCoord> = Spiral::new(radius).collect();
        for coord in &coords {
            let tile = store.load(*coord).await.unwrap();
            for edge in [Edge::East, Edge::South] {
                let other = coord.neighbor(edge);
                if !region_contains(radius, other) {
                    continue;
                }
                let neighbor = store.load(other).await.unwrap();
                let gap = seam_disagreement(&tile, &neighbor, edge).unwrap();
                assert!(gap < 1e-4, "{coord} {edge} seam is off by {gap}");
            }
        }
    }

    #[test]
    fn test_spiral_order() {
        let cells: Vec<(i32, i32)> = Spiral::new(3).map(|c| (c.x, c.z)).collect();
        assert_eq!(
            cells,
            vec![
                (0, 0),
                (1, 0),
                (1, 1),
                (0, 1),
                (-1, 1),
                (-1, 0),
                (-1, -1),
                (0, -1),
                (1, -1),
            ]
        );
    }

    #[test]
    fn test_spiral_covers_its_region_once() {
        for radius in 1..=6 {
            let cells: Vec<TileCoord> = Spiral::new(radius).collect();
            let unique: BTreeSet<TileCoord> = cells.iter().copied().collect();

            assert_eq!(cells.len(), (radius * radius) as usize);
            assert_eq!(unique.len(), cells.len());
            assert!(cells.iter().all(|c| region_contains(radius, *c)));
        }
    }

    #[test]
    fn test_region_bounds() {
        assert!(region_contains(1, TileCoord::ORIGIN));
        assert!(!region_contains(1, TileCoord::new(1, 0)));
        assert!(region_contains(4, TileCoord::new(2, -1)));
        assert!(!region_contains(4, TileCoord::new(-2, 0)));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_radius() {
        let walker = walker(Plateaus);
        assert!(matches!(
            walker.walk(0).await,
            Err(TerrainError::InvalidRegion { radius: 0, max: 8 })
        ));
        assert!(walker.walk(9).await.is_err());
        assert!(walker.store().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_walk_converges_every_seam() {
        let walker = walker(Plateaus);
        let summary = walker.walk(3).await.unwrap();

        assert_eq!(summary.visited, 9);
        assert_eq!(summary.generated, 9);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.seams_blended, 12);
        assert!(summary.tiles_written >= 9);
        assert_eq!(walker.store().list().await.unwrap().len(), 9);

        assert_converged(walker.store(), 3).await;
    }

    #[tokio::test]
    async fn test_rerun_changes_nothing() {
        let walker = walker(Plateaus);
        walker.walk(3).await.unwrap();
        let before = walker.store().load(TileCoord::ORIGIN).await.unwrap();

        let summary = walker.walk(3).await.unwrap();
        assert_eq!(summary.skipped, 9);
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.tiles_written, 0);

        let after = walker.store().load(TileCoord::ORIGIN).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_growing_region_keeps_seams_converged() {
        let walker = walker(Plateaus);
        walker.walk(2).await.unwrap();
        let summary = walker.walk(4).await.unwrap();

        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.generated, 12);
        assert_converged(walker.store(), 4).await;
    }

    #[tokio::test]
    async fn test_bad_sample_stops_walk() {
        let walker = walker(BrokenAt(TileCoord::new(1, 1)));
        let result = walker.walk(3).await;

        assert!(matches!(
            result,
            Err(TerrainError::InvalidElevation { tile, .. }) if tile == TileCoord::new(1, 1)
        ));
        // (0,0) and (1,0) come before (1,1) in spiral order.
        assert_eq!(
            walker.store().list().await.unwrap(),
            vec![TileCoord::new(0, 0), TileCoord::new(1, 0)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_walks_share_the_work() {
        let walker = walker(Plateaus);
        let other = walker.clone();

        let (first, second) = tokio::join!(walker.walk(3), other.walk(3));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.generated + second.generated, 9);
        assert_eq!(first.skipped + second.skipped, 9);
        assert_converged(walker.store(), 3).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_separate_walkers_on_one_store_share_locks() {
        let store = TileStore::new_in_memory();
        let first = GridWalker::new(&config(), store.clone(), Arc::new(Plateaus)).unwrap();
        let second = GridWalker::new(&config(), store.clone(), Arc::new(Plateaus)).unwrap();

        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.walk(5).await }),
            tokio::spawn(async move { second.walk(5).await }),
        );
        let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());

        assert_eq!(a.generated + b.generated, 25);
        assert_eq!(a.skipped + b.skipped, 25);
        assert_eq!(store.list().await.unwrap().len(), 25);
        assert_converged(&store, 5).await;
    }
}
