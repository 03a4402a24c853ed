//! Region generation handler.

use axum::{Extension, response::Json};

use crate::{
    errors::TerrainError,
    models::RegionRequest,
    walker::{GridWalker, WalkSummary},
};

/// Generate and blend every missing tile in the square region around the origin.
///
/// Runs to completion before responding. Tiles that already exist are left
/// untouched, so repeating a failed request resumes it.
#[utoipa::path(
    post,
    path = "/regions",
    tag = "regions",
    request_body = RegionRequest,
    responses(
        (status = 200, description = "Region walk finished", body = WalkSummary),
        (status = 400, description = "Radius outside the allowed range"),
        (status = 500, description = "Generation or storage failure")
    )
)]
pub async fn generate_region(
    Extension(walker): Extension<GridWalker>,
    Json(req): Json<RegionRequest>,
) -> Result<Json<WalkSummary>, TerrainError> {
    let summary = walker.walk(req.radius).await?;
    Ok(Json(summary))
}
