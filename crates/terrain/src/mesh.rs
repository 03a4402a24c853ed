//! In-memory terrain tiles and their generation from an elevation source.

use rayon::prelude::*;

use crate::{
    config::TerrainConfig,
    coord::{Corner, TileCoord},
    elevation::ElevationSource,
    errors::TerrainError,
    models::TilePayload,
    numeric::{canonical_cmp, grid_coordinate},
};

/// Interior grid lines may drift this far (as a fraction of a step) in stored payloads.
const LAYOUT_TOLERANCE: f64 = 1e-6;

/// One square terrain patch: a regular vertex grid with elevation in the third channel.
///
/// Positions are always kept in canonical column-major order: columns by
/// ascending local `x`, and within a column by descending local `y`, so the
/// vertex at column `i`, row `r` lives at index `i * (segments + 1) + r`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMesh {
    coord: TileCoord,
    width: f64,
    height: f64,
    segments: u32,
    positions: Vec<f64>,
}

impl TileMesh {
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Physical side length.
    pub fn size(&self) -> f64 {
        self.width
    }

    pub fn half_extent(&self) -> f64 {
        self.width / 2.0
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Distance between neighboring grid lines.
    pub fn step(&self) -> f64 {
        self.width / f64::from(self.segments)
    }

    /// Vertices per side.
    pub fn side(&self) -> usize {
        self.segments as usize + 1
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Flat `x, y, elevation` triples in canonical order.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn vertex(&self, index: usize) -> [f64; 3] {
        let i = index * 3;
        [
            self.positions[i],
            self.positions[i + 1],
            self.positions[i + 2],
        ]
    }

    pub fn elevation(&self, index: usize) -> f64 {
        self.positions[index * 3 + 2]
    }

    pub(crate) fn set_elevation(&mut self, index: usize, value: f64) {
        self.positions[index * 3 + 2] = value;
    }

    pub fn index_of(&self, column: usize, row: usize) -> usize {
        column * self.side() + row
    }

    pub fn corner_index(&self, corner: Corner) -> usize {
        let last = self.side() - 1;
        match corner {
            Corner::NorthWest => self.index_of(0, 0),
            Corner::NorthEast => self.index_of(last, 0),
            Corner::SouthEast => self.index_of(last, last),
            Corner::SouthWest => self.index_of(0, last),
        }
    }

    /// Elevations only, one per vertex, in canonical order.
    ///
    /// This is the layout a collision heightfield consumes; the first value
    /// belongs to the north-west corner.
    pub fn heightfield(&self) -> Vec<f64> {
        self.positions.iter().skip(2).step_by(3).copied().collect()
    }

    /// True when both tiles describe the same patch within `tolerance`.
    pub fn approx_eq(&self, other: &TileMesh, tolerance: f64) -> bool {
        self.coord == other.coord
            && self.segments == other.segments
            && self.width == other.width
            && self.height == other.height
            && self.positions.len() == other.positions.len()
            && self
                .positions
                .iter()
                .zip(&other.positions)
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    /// Serializable form, with normals and uvs derived from the current elevations.
    pub fn to_payload(&self) -> TilePayload {
        TilePayload {
            width: self.width,
            height: self.height,
            width_segments: self.segments,
            height_segments: self.segments,
            position: self.positions.clone(),
            normal: Some(self.normals()),
            uv: Some(self.uvs()),
        }
    }

    /// Rebuilds a tile from a stored payload, re-sorting vertices into canonical order.
    pub fn from_payload(coord: TileCoord, payload: TilePayload) -> Result<Self, TerrainError> {
        let corrupt = |reason: String| TerrainError::CorruptTile {
            tile: coord,
            reason,
        };

        if payload.width_segments != payload.height_segments {
            return Err(corrupt(format!(
                "non-square grid {}x{}",
                payload.width_segments, payload.height_segments
            )));
        }
        if payload.width != payload.height {
            return Err(corrupt(format!(
                "non-square extent {}x{}",
                payload.width, payload.height
            )));
        }
        if !(payload.width.is_finite() && payload.width > 0.0) {
            return Err(corrupt(format!("invalid width {}", payload.width)));
        }
        let segments = payload.width_segments;
        if segments == 0 {
            return Err(corrupt("zero segments".to_string()));
        }

        let vertex_values = usize::try_from(segments)
            .ok()
            .and_then(|s| s.checked_add(1))
            .and_then(|side| Some((side, side.checked_mul(side)?.checked_mul(3)?)));
        let Some((side, expected)) = vertex_values else {
            return Err(corrupt(format!("{segments} segments is too many vertices")));
        };
        if payload.position.len() != expected {
            return Err(corrupt(format!(
                "expected {expected} position values, found {}",
                payload.position.len()
            )));
        }
        if let Some(bad) = payload.position.iter().find(|v| !v.is_finite()) {
            return Err(corrupt(format!("non-finite position value {bad}")));
        }

        let mut vertices: Vec<[f64; 3]> = payload
            .position
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        vertices.sort_by(|a, b| canonical_cmp(*a, *b));

        let size = payload.width;
        let step = size / f64::from(segments);
        for (index, vertex) in vertices.iter().enumerate() {
            let column = (index / side) as u32;
            let row = (index % side) as u32;
            let expected_x = grid_coordinate(column, segments, size);
            let expected_y = grid_coordinate(segments - row, segments, size);
            if !on_grid_line(vertex[0], expected_x, column, segments, step)
                || !on_grid_line(vertex[1], expected_y, row, segments, step)
            {
                return Err(corrupt(format!(
                    "vertex ({}, {}) is off the {segments}-segment grid",
                    vertex[0], vertex[1]
                )));
            }
        }

        Ok(Self {
            coord,
            width: payload.width,
            height: payload.height,
            segments,
            positions: vertices.into_iter().flatten().collect(),
        })
    }

    fn normals(&self) -> Vec<f64> {
        let side = self.side();
        let last = side - 1;
        let mut normals = Vec::with_capacity(self.positions.len());

        for column in 0..side {
            for row in 0..side {
                let west = self.vertex(self.index_of(column.saturating_sub(1), row));
                let east = self.vertex(self.index_of((column + 1).min(last), row));
                let north = self.vertex(self.index_of(column, row.saturating_sub(1)));
                let south = self.vertex(self.index_of(column, (row + 1).min(last)));

                let dzdx = (east[2] - west[2]) / (east[0] - west[0]);
                let dzdy = (north[2] - south[2]) / (north[1] - south[1]);
                let length = (dzdx * dzdx + dzdy * dzdy + 1.0).sqrt();

                normals.extend_from_slice(&[-dzdx / length, -dzdy / length, 1.0 / length]);
            }
        }

        normals
    }

    fn uvs(&self) -> Vec<f64> {
        let half = self.half_extent();
        self.positions
            .chunks_exact(3)
            .flat_map(|v| [(v[0] + half) / self.width, (v[1] + half) / self.height])
            .collect()
    }
}

fn on_grid_line(value: f64, expected: f64, line: u32, segments: u32, step: f64) -> bool {
    if line == 0 || line == segments {
        value == expected
    } else {
        (value - expected).abs() <= step * LAYOUT_TOLERANCE
    }
}

/// Builds tiles by sampling an [`ElevationSource`] at every vertex.
#[derive(Debug, Clone, Copy)]
pub struct TileGenerator {
    size: f64,
    segments: u32,
}

impl TileGenerator {
    pub fn new(size: f64, segments: u32) -> Self {
        Self { size, segments }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.tile_size, config.segments)
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Generates the tile at `coord`.
    ///
    /// Columns are sampled in parallel but assembled in canonical order, so
    /// the same source always yields bit-identical positions. The first
    /// non-finite sample in canonical order fails the whole tile.
    pub fn generate(
        &self,
        coord: TileCoord,
        source: &dyn ElevationSource,
    ) -> Result<TileMesh, TerrainError> {
        let segments = self.segments;
        let size = self.size;
        let origin_x = f64::from(coord.x) * size;
        let origin_z = f64::from(coord.z) * size;

        let columns: Vec<Result<Vec<f64>, TerrainError>> = (0..=segments)
            .into_par_iter()
            .map(|column| {
                let x = grid_coordinate(column, segments, size);
                let mut values = Vec::with_capacity(3 * (segments as usize + 1));
                for row in 0..=segments {
                    let y = grid_coordinate(segments - row, segments, size);
                    let world_x = origin_x + x;
                    let world_z = origin_z - y;
                    let elevation = source.tile_elevation(coord, world_x, world_z);
                    if !elevation.is_finite() {
                        return Err(TerrainError::InvalidElevation {
                            tile: coord,
                            x: world_x,
                            z: world_z,
                            value: elevation,
                        });
                    }
                    values.extend_from_slice(&[x, y, elevation]);
                }
                Ok(values)
            })
            .collect();

        let side = segments as usize + 1;
        let mut positions = Vec::with_capacity(3 * side * side);
        for column in columns {
            positions.extend(column?);
        }

        tracing::debug!(tile = %coord, segments, size, "Generated tile");

        Ok(TileMesh {
            coord,
            width: size,
            height: size,
            segments,
            positions,
        })
    }
}
