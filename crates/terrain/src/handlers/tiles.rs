//! Tile query handlers.

use axum::{Extension, extract::Path, response::Json};

use crate::{
    coord::TileCoord,
    errors::TerrainError,
    models::{HeightfieldResponse, TileListResponse, TilePayload},
    store::TileStore,
};

#[utoipa::path(
    get,
    path = "/tiles",
    tag = "tiles",
    responses(
        (status = 200, description = "Coordinates of every stored tile, sorted", body = TileListResponse)
    )
)]
pub async fn list_tiles(
    Extension(store): Extension<TileStore>,
) -> Result<Json<TileListResponse>, TerrainError> {
    let tiles = store.list().await?;
    Ok(Json(TileListResponse { tiles }))
}

#[utoipa::path(
    get,
    path = "/tiles/{x}/{z}",
    tag = "tiles",
    params(
        ("x" = i32, Path, description = "Tile column, increasing eastward"),
        ("z" = i32, Path, description = "Tile row, increasing southward")
    ),
    responses(
        (status = 200, description = "Tile mesh", body = TilePayload),
        (status = 400, description = "Coordinate outside the storable range"),
        (status = 404, description = "Tile not generated")
    )
)]
pub async fn get_tile(
    Extension(store): Extension<TileStore>,
    Path((x, z)): Path<(i32, i32)>,
) -> Result<Json<TilePayload>, TerrainError> {
    let tile = store.load(TileCoord::new(x, z)).await?;
    Ok(Json(tile.to_payload()))
}

/// Elevations of a stored tile, for building a collision heightfield.
#[utoipa::path(
    get,
    path = "/tiles/{x}/{z}/heightfield",
    tag = "tiles",
    params(
        ("x" = i32, Path, description = "Tile column, increasing eastward"),
        ("z" = i32, Path, description = "Tile row, increasing southward")
    ),
    responses(
        (status = 200, description = "Tile heights", body = HeightfieldResponse),
        (status = 400, description = "Coordinate outside the storable range"),
        (status = 404, description = "Tile not generated")
    )
)]
pub async fn get_heightfield(
    Extension(store): Extension<TileStore>,
    Path((x, z)): Path<(i32, i32)>,
) -> Result<Json<HeightfieldResponse>, TerrainError> {
    let coord = TileCoord::new(x, z);
    let tile = store.load(coord).await?;
    let side = tile.segments() + 1;

    Ok(Json(HeightfieldResponse {
        tile: coord,
        rows: side,
        cols: side,
        size: tile.size(),
        heights: tile.heightfield(),
    }))
}
