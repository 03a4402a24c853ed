pub mod blend;
pub mod config;
pub mod coord;
pub mod edges;
pub mod elevation;
pub mod errors;
pub mod handlers;
pub mod locks;
pub mod mesh;
pub mod models;
pub mod numeric;
pub mod store;
pub mod walker;

use axum::{
    Extension, Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    coord::TileCoord,
    handlers::{generate_region, get_heightfield, get_tile, health_check, list_tiles},
    models::{HeightfieldResponse, RegionRequest, TileListResponse, TilePayload},
    walker::{GridWalker, WalkSummary},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Terrain tiles API"),
    paths(
        handlers::health_check,
        handlers::list_tiles,
        handlers::get_tile,
        handlers::get_heightfield,
        handlers::generate_region,
    ),
    components(schemas(
        TileCoord,
        TilePayload,
        HeightfieldResponse,
        TileListResponse,
        RegionRequest,
        WalkSummary,
    )),
    tags(
        (name = "tiles", description = "Stored terrain tiles"),
        (name = "regions", description = "Region generation"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn create_router(walker: GridWalker) -> Router {
    let store = walker.store().clone();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health_check))
        // Tile routes
        .route("/tiles", get(list_tiles))
        .route("/tiles/{x}/{z}", get(get_tile))
        .route("/tiles/{x}/{z}/heightfield", get(get_heightfield))
        // Generation
        .route("/regions", post(generate_region))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(Extension(store))
        .layer(Extension(walker))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(walker: GridWalker, port: u16) -> anyhow::Result<()> {
    let app = create_router(walker);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    tracing::info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
