use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{coord::TileCoord, edges::Edge};

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("Non-finite elevation {value} sampled for tile {tile} at ({x}, {z})")]
    InvalidElevation {
        tile: TileCoord,
        x: f64,
        z: f64,
        value: f64,
    },

    #[error("Tile {0} not found")]
    TileNotFound(TileCoord),

    #[error("Tile {tile} is corrupt: {reason}")]
    CorruptTile { tile: TileCoord, reason: String },

    #[error("Edge mismatch between {tile} and its {edge} neighbor: {reason}")]
    EdgeMismatch {
        tile: TileCoord,
        edge: Edge,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tile coordinate {0} is outside the storable range")]
    InvalidCoordinate(TileCoord),

    #[error("Region radius {radius} must be between 1 and {max}")]
    InvalidRegion { radius: u32, max: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for TerrainError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TerrainError::TileNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            TerrainError::InvalidCoordinate(_) | TerrainError::InvalidRegion { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            TerrainError::InvalidElevation { .. }
            | TerrainError::CorruptTile { .. }
            | TerrainError::EdgeMismatch { .. }
            | TerrainError::InvalidConfig(_) => {
                error!("Terrain error: {self}");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            TerrainError::Storage(e) => {
                error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            TerrainError::Io(e) => {
                error!("IO error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            TerrainError::Task(e) => {
                error!("Background task failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
