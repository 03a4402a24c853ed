//! Tile lattice coordinates and the neighbor/corner relations between tiles.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::edges::Edge;

/// Position of a tile in the infinite tile lattice.
///
/// North is toward decreasing `z`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    pub const ORIGIN: TileCoord = TileCoord { x: 0, z: 0 };

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The tile on the other side of `edge`.
    pub fn neighbor(self, edge: Edge) -> Self {
        let (dx, dz) = edge.lattice_offset();
        Self::new(self.x + dx, self.z + dz)
    }

    /// This tile and the eight tiles around it.
    pub fn neighborhood(self) -> impl Iterator<Item = TileCoord> {
        (-1..=1).flat_map(move |dz| (-1..=1).map(move |dx| Self::new(self.x + dx, self.z + dz)))
    }

    /// The lattice points at this tile's four corners.
    pub fn corner_points(self) -> [LatticePoint; 4] {
        [
            LatticePoint::new(self.x, self.z),
            LatticePoint::new(self.x + 1, self.z),
            LatticePoint::new(self.x + 1, self.z + 1),
            LatticePoint::new(self.x, self.z + 1),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A point where up to four tile corners meet.
///
/// Lattice point `(x, z)` is the north-west corner of tile `(x, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatticePoint {
    pub x: i32,
    pub z: i32,
}

impl LatticePoint {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Which corner of `tile` sits on this point, if any.
    pub fn corner_of(self, tile: TileCoord) -> Option<Corner> {
        match (self.x - tile.x, self.z - tile.z) {
            (0, 0) => Some(Corner::NorthWest),
            (1, 0) => Some(Corner::NorthEast),
            (1, 1) => Some(Corner::SouthEast),
            (0, 1) => Some(Corner::SouthWest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthEast,
    SouthWest,
}
