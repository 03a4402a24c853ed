use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::coord::TileCoord;

/// Serialized tile, as stored and as served by `GET /tiles/{x}/{z}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TilePayload {
    pub width: f64,
    pub height: f64,
    pub width_segments: u32,
    pub height_segments: u32,
    /// `x, y, elevation` per vertex in canonical column-major order.
    pub position: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<Vec<f64>>,
}

/// Elevation-only export for a collision heightfield.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeightfieldResponse {
    pub tile: TileCoord,
    pub rows: u32,
    pub cols: u32,
    /// Physical side length the heights span.
    pub size: f64,
    /// One height per vertex, column-major, north-west corner first.
    pub heights: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TileListResponse {
    pub tiles: Vec<TileCoord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegionRequest {
    /// Side length, in tiles, of the square region around the origin.
    pub radius: u32,
}
