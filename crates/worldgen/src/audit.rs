//! Seam audit: how far apart stored neighbors are along each shared edge.

use std::collections::BTreeMap;

use serde::Serialize;
use terrain::{
    blend::seam_disagreement,
    coord::TileCoord,
    edges::Edge,
    errors::TerrainError,
    mesh::TileMesh,
    store::TileStore,
    walker::{Spiral, region_contains},
};

/// One shared edge, reported from the western or northern tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeamReport {
    pub tile: TileCoord,
    pub edge: Edge,
    /// Largest height difference between paired boundary vertices.
    pub disagreement: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    pub seams: Vec<SeamReport>,
    /// Cells of the region with no stored tile.
    pub missing: Vec<TileCoord>,
}

impl AuditReport {
    pub fn max_disagreement(&self) -> f64 {
        self.seams
            .iter()
            .map(|s| s.disagreement)
            .fold(0.0, f64::max)
    }

    pub fn worst(&self) -> Option<&SeamReport> {
        self.seams
            .iter()
            .max_by(|a, b| a.disagreement.total_cmp(&b.disagreement))
    }

    /// True when every cell is stored and every seam agrees within `tolerance`.
    pub fn is_converged(&self, tolerance: f64) -> bool {
        self.missing.is_empty() && self.max_disagreement() <= tolerance
    }
}

/// Measures every seam between stored tiles of the `radius × radius` region.
pub async fn audit_region(store: &TileStore, radius: u32) -> Result<AuditReport, TerrainError> {
    let mut tiles: BTreeMap<TileCoord, TileMesh> = BTreeMap::new();
    let mut report = AuditReport::default();

    for coord in Spiral::new(radius).filter(|c| region_contains(radius, *c)) {
        match store.try_load(coord).await? {
            Some(tile) => {
                tiles.insert(coord, tile);
            }
            None => report.missing.push(coord),
        }
    }
    report.missing.sort();

    for (coord, tile) in &tiles {
        for edge in [Edge::East, Edge::South] {
            let Some(neighbor) = tiles.get(&coord.neighbor(edge)) else {
                continue;
            };
            report.seams.push(SeamReport {
                tile: *coord,
                edge,
                disagreement: seam_disagreement(tile, neighbor, edge)?,
            });
        }
    }

    tracing::debug!(
        radius,
        seams = report.seams.len(),
        missing = report.missing.len(),
        max = report.max_disagreement(),
        "Audited region"
    );
    Ok(report)
}
