//! Boundary extraction: the four vertex rows of a tile keyed by quantized position.

use std::{collections::BTreeMap, fmt};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};

use crate::{
    mesh::TileMesh,
    numeric::{canonical_cmp, quantize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    North,
    East,
    South,
    West,
}

/// Which in-plane axis runs perpendicular to an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::North, Edge::East, Edge::South, Edge::West];

    pub fn opposite(self) -> Edge {
        match self {
            Edge::North => Edge::South,
            Edge::East => Edge::West,
            Edge::South => Edge::North,
            Edge::West => Edge::East,
        }
    }

    pub fn perpendicular_axis(self) -> Axis {
        match self {
            Edge::East | Edge::West => Axis::X,
            Edge::North | Edge::South => Axis::Y,
        }
    }

    /// +1 for the edge at the positive half-extent, -1 otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Edge::North | Edge::East => 1.0,
            Edge::South | Edge::West => -1.0,
        }
    }

    /// Step to the neighbor across this edge, in lattice coordinates.
    pub fn lattice_offset(self) -> (i32, i32) {
        match self {
            Edge::North => (0, -1),
            Edge::East => (1, 0),
            Edge::South => (0, 1),
            Edge::West => (-1, 0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Edge::North => "north",
            Edge::East => "east",
            Edge::South => "south",
            Edge::West => "west",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Truncated in-plane coordinates of a boundary vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub ix: i64,
    pub iy: i64,
}

impl EdgeKey {
    pub fn from_point(x: f64, y: f64) -> Self {
        Self {
            ix: quantize(x),
            iy: quantize(y),
        }
    }

    /// The key of the same physical point in the frame of the neighbor
    /// across `edge`.
    pub fn counterpart(self, edge: Edge) -> Self {
        match edge.perpendicular_axis() {
            Axis::X => Self {
                ix: -self.ix,
                iy: self.iy,
            },
            Axis::Y => Self {
                ix: self.ix,
                iy: -self.iy,
            },
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ix, self.iy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeVertex {
    /// Index of the vertex in its tile.
    pub index: usize,
    pub position: [f64; 3],
}

impl EdgeVertex {
    pub fn elevation(&self) -> f64 {
        self.position[2]
    }
}

pub type EdgeMap = BTreeMap<EdgeKey, EdgeVertex>;

/// The four boundary rows of one tile.
#[derive(Debug, Clone, Default)]
pub struct EdgeIndex {
    edges: EnumMap<Edge, EdgeMap>,
    collisions: usize,
}

impl EdgeIndex {
    /// Classifies every vertex lying exactly on `±half_extent`.
    ///
    /// Vertices are visited in canonical order; when two distinct vertices
    /// on the same edge truncate to the same key, the first one wins.
    pub fn build(tile: &TileMesh) -> Self {
        let half = tile.half_extent();
        let mut order: Vec<usize> = (0..tile.vertex_count()).collect();
        order.sort_by(|a, b| canonical_cmp(tile.vertex(*a), tile.vertex(*b)));

        let mut index = EdgeIndex::default();
        for vertex_index in order {
            let position = tile.vertex(vertex_index);
            let [x, y, _] = position;
            let vertex = EdgeVertex {
                index: vertex_index,
                position,
            };

            if y == half {
                index.insert(Edge::North, vertex);
            }
            if x == half {
                index.insert(Edge::East, vertex);
            }
            if y == -half {
                index.insert(Edge::South, vertex);
            }
            if x == -half {
                index.insert(Edge::West, vertex);
            }
        }

        if index.collisions > 0 {
            tracing::warn!(
                tile = %tile.coord(),
                collisions = index.collisions,
                "Edge keys collided; keeping the first vertex of each"
            );
        }

        index
    }

    fn insert(&mut self, edge: Edge, vertex: EdgeVertex) {
        let key = EdgeKey::from_point(vertex.position[0], vertex.position[1]);
        match self.edges[edge].entry(key) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(vertex);
            }
            std::collections::btree_map::Entry::Occupied(_) => {
                self.collisions += 1;
            }
        }
    }

    pub fn edge(&self, edge: Edge) -> &EdgeMap {
        &self.edges[edge]
    }

    pub fn into_edge(self, edge: Edge) -> EdgeMap {
        let mut edges = self.edges;
        std::mem::take(&mut edges[edge])
    }

    /// Number of boundary vertices dropped because their key was taken.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}
