//! Terrain engine configuration.

use std::{env, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::TerrainError;

/// Tile geometry and blending parameters shared by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Physical side length of a tile.
    pub tile_size: f64,

    /// Quads per tile side.
    pub segments: u32,

    /// Grid steps over which a seam correction fades out.
    pub falloff_depth: u32,

    /// Absolute tolerance below which two edge heights count as merged.
    pub merge_tolerance: f64,

    /// Largest radius a single region walk may cover.
    pub max_region_radius: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tile_size: 1024.0,
            segments: 63,
            falloff_depth: 8,
            merge_tolerance: 1e-4,
            max_region_radius: 32,
        }
    }
}

impl TerrainConfig {
    /// Defaults overridden by `TILE_SIZE`, `TILE_SEGMENTS`, `FALLOFF_DEPTH`,
    /// `MERGE_TOLERANCE` and `MAX_REGION_RADIUS` when set.
    pub fn from_env() -> Result<Self, TerrainError> {
        let defaults = Self::default();
        let config = Self {
            tile_size: env_or("TILE_SIZE", defaults.tile_size)?,
            segments: env_or("TILE_SEGMENTS", defaults.segments)?,
            falloff_depth: env_or("FALLOFF_DEPTH", defaults.falloff_depth)?,
            merge_tolerance: env_or("MERGE_TOLERANCE", defaults.merge_tolerance)?,
            max_region_radius: env_or("MAX_REGION_RADIUS", defaults.max_region_radius)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(invalid(format!("tile_size must be positive, got {}", self.tile_size)));
        }
        if self.segments == 0 {
            return Err(invalid("segments must be at least 1".to_string()));
        }
        // Keys truncate toward zero, so grid lines closer than 2 units can share a key.
        let step = self.tile_size / f64::from(self.segments);
        if step < 2.0 {
            return Err(invalid(format!(
                "grid step {step} is below 2 units; edge keys would collide"
            )));
        }
        if self.falloff_depth == 0 || self.falloff_depth > self.segments / 2 {
            return Err(invalid(format!(
                "falloff_depth {} must be between 1 and {} (half of {} segments)",
                self.falloff_depth,
                self.segments / 2,
                self.segments
            )));
        }
        if !(self.merge_tolerance.is_finite() && self.merge_tolerance > 0.0) {
            return Err(invalid(format!(
                "merge_tolerance must be positive, got {}",
                self.merge_tolerance
            )));
        }
        if self.max_region_radius == 0 {
            return Err(invalid("max_region_radius must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> TerrainError {
    TerrainError::InvalidConfig(message)
}

/// Reads and parses `key`, falling back to `default` when it is unset.
pub fn env_or<T>(key: &str, default: T) -> Result<T, TerrainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| invalid(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}
