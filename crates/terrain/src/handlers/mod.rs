//! HTTP request handlers for the terrain API.

pub mod health;
pub mod regions;
pub mod tiles;

// Re-export handlers (including utoipa __path types for OpenAPI)
pub use health::{__path_health_check, health_check};
pub use regions::{__path_generate_region, generate_region};
pub use tiles::{
    __path_get_heightfield, __path_get_tile, __path_list_tiles, get_heightfield, get_tile,
    list_tiles,
};
