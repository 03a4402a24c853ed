//! End-to-end region generation: walk a region, then audit every seam.
//!
//! Run with: `cargo nextest run -p worldgen region`

use std::sync::Arc;

use terrain::{
    blend::SeamBlender,
    config::TerrainConfig,
    coord::TileCoord,
    edges::Edge,
    elevation::{ElevationSource, NoiseElevation},
    mesh::TileGenerator,
    models::TilePayload,
    numeric::falloff_weight,
    store::TileStore,
    walker::GridWalker,
};
use worldgen::{
    audit::audit_region,
    fixtures::{DetachedNoise, PlateauElevation},
};

const TOLERANCE: f64 = 1e-4;

fn config(segments: u32, falloff_depth: u32) -> TerrainConfig {
    TerrainConfig {
        tile_size: 64.0,
        segments,
        falloff_depth,
        merge_tolerance: TOLERANCE,
        max_region_radius: 8,
    }
}

fn walker(config: &TerrainConfig, store: TileStore, source: impl ElevationSource + 'static) -> GridWalker {
    GridWalker::new(config, store, Arc::new(source)).expect("valid config")
}

/// Two plateaus at 10 and 20 meet at 15, and the step fades out over the
/// falloff depth on both sides.
fn check_plateau_pair(segments: u32, depth: u32) {
    let plateaus = PlateauElevation::new(0.0)
        .with_tile(TileCoord::new(0, 0), 10.0)
        .with_tile(TileCoord::new(1, 0), 20.0);
    let generator = TileGenerator::new(64.0, segments);
    let mut west = generator.generate(TileCoord::new(0, 0), &plateaus).unwrap();
    let mut east = generator.generate(TileCoord::new(1, 0), &plateaus).unwrap();

    let blender = SeamBlender::new(depth, TOLERANCE);
    assert!(blender.blend_in_place(&mut west, &mut east, Edge::East).unwrap());

    let last = segments as usize;
    for row in 0..=last {
        assert!((west.elevation(west.index_of(last, row)) - 15.0).abs() < 1e-9);
        assert!((east.elevation(east.index_of(0, row)) - 15.0).abs() < 1e-9);
    }

    let middle = last / 2;
    for j in 0..=segments / 2 {
        let weight = falloff_weight(j, depth);
        let column = j as usize;
        let west_height = west.elevation(west.index_of(last - column, middle));
        let east_height = east.elevation(east.index_of(column, middle));

        assert!(
            (west_height - (10.0 + 5.0 * weight)).abs() < 1e-9,
            "west {j} steps in: {west_height}"
        );
        assert!(
            (east_height - (20.0 - 5.0 * weight)).abs() < 1e-9,
            "east {j} steps in: {east_height}"
        );
    }

    // Already merged: a second pass changes nothing.
    let before = (west.clone(), east.clone());
    assert!(!blender.blend_in_place(&mut west, &mut east, Edge::East).unwrap());
    assert_eq!((west, east), before);
}

#[test]
fn test_plateau_pair_four_segments() {
    check_plateau_pair(4, 2);
}

#[test]
fn test_plateau_pair_sixteen_segments() {
    check_plateau_pair(16, 4);
}

#[tokio::test]
async fn test_detached_tiles_have_seams_until_walked() {
    let config = config(8, 2);
    let source = DetachedNoise::new(21).with_max_offset(8.0);

    let unblended = TileStore::new_in_memory();
    let generator = TileGenerator::from_config(&config);
    for x in -1..=1 {
        for z in -1..=1 {
            let tile = generator.generate(TileCoord::new(x, z), &source).unwrap();
            unblended.save(&tile).await.unwrap();
        }
    }
    let before = audit_region(&unblended, 3).await.unwrap();
    assert!(before.missing.is_empty());
    assert_eq!(before.seams.len(), 12);
    assert!(before.max_disagreement() > TOLERANCE);

    let walker = walker(&config, TileStore::new_in_memory(), source);
    let summary = walker.walk(3).await.unwrap();
    assert_eq!(summary.generated, 9);
    assert_eq!(summary.seams_blended, 12);

    let after = audit_region(walker.store(), 3).await.unwrap();
    assert!(
        after.is_converged(TOLERANCE),
        "worst seam: {:?}",
        after.worst()
    );
}

#[tokio::test]
async fn test_sloped_plateaus_converge_over_a_wide_region() {
    let config = config(16, 4);
    let walker = walker(
        &config,
        TileStore::new_in_memory(),
        PlateauElevation::sloped(10.0, 3.0, 4),
    );

    walker.walk(5).await.unwrap();

    let report = audit_region(walker.store(), 5).await.unwrap();
    assert_eq!(report.seams.len(), 40);
    assert!(report.is_converged(TOLERANCE), "worst seam: {:?}", report.worst());
}

#[tokio::test]
async fn test_continuous_field_needs_no_blending() {
    let config = config(8, 2);
    let walker = walker(&config, TileStore::new_in_memory(), NoiseElevation::new(5));

    let summary = walker.walk(3).await.unwrap();
    assert_eq!(summary.generated, 9);
    assert_eq!(summary.seams_blended, 0);
    assert_eq!(summary.corners_reconciled, 0);
    assert_eq!(summary.tiles_written, 9);

    let report = audit_region(walker.store(), 3).await.unwrap();
    assert_eq!(report.max_disagreement(), 0.0);
}

#[tokio::test]
async fn test_rerun_leaves_tiles_untouched() {
    let config = config(8, 2);
    let walker = walker(&config, TileStore::new_in_memory(), DetachedNoise::new(9));
    walker.walk(3).await.unwrap();

    let store = walker.store();
    let mut before = Vec::new();
    for coord in store.list().await.unwrap() {
        before.push(store.load(coord).await.unwrap());
    }

    let summary = walker.walk(3).await.unwrap();
    assert_eq!(summary.skipped, 9);
    assert_eq!(summary.tiles_written, 0);

    for tile in before {
        assert_eq!(store.load(tile.coord()).await.unwrap(), tile);
    }
}

#[tokio::test]
async fn test_local_store_resumes_across_walkers() {
    let dir = std::env::temp_dir().join(format!("worldgen-region-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let config = config(8, 2);

    let first = walker(&config, TileStore::new_local(&dir).unwrap(), DetachedNoise::new(4));
    first.walk(2).await.unwrap();

    let origin = dir.join("tiles").join("50000000-50000000.json");
    let payload: TilePayload =
        serde_json::from_slice(&std::fs::read(&origin).unwrap()).unwrap();
    assert_eq!(payload.width_segments, 8);
    assert_eq!(payload.position.len(), 3 * 81);

    let second = walker(&config, TileStore::new_local(&dir).unwrap(), DetachedNoise::new(4));
    let summary = second.walk(3).await.unwrap();
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.generated, 5);

    let report = audit_region(second.store(), 3).await.unwrap();
    assert!(report.is_converged(TOLERANCE), "worst seam: {:?}", report.worst());

    let _ = std::fs::remove_dir_all(&dir);
}
