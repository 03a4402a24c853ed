//! Configuration for the `generate` binary.

use std::{env, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use terrain::{
    config::{TerrainConfig, env_or},
    elevation::{ElevationSource, NoiseElevation, NoisePreset},
    errors::TerrainError,
};

use crate::fixtures::DetachedNoise;

/// Which elevation source a generation run samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// One continuous noise field.
    #[default]
    Noise,
    /// Noise with a random offset per tile, so every seam needs blending.
    Detached,
}

impl FromStr for SourceMode {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "noise" => Ok(SourceMode::Noise),
            "detached" => Ok(SourceMode::Detached),
            other => Err(TerrainError::InvalidConfig(format!(
                "unknown source mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub terrain: TerrainConfig,

    /// Directory the tile store lives in.
    pub store_path: String,

    /// Side length, in tiles, of the region to generate.
    pub radius: u32,

    pub source: SourceMode,
    pub preset: NoisePreset,
    pub seed: u32,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            store_path: "./tiles".to_string(),
            radius: 5,
            source: SourceMode::default(),
            preset: NoisePreset::default(),
            seed: 12345,
        }
    }
}

impl GenerateConfig {
    /// The terrain settings from [`TerrainConfig::from_env`] plus
    /// `TILE_STORE_PATH`, `REGION_RADIUS`, `SOURCE_MODE`, `NOISE_PRESET`
    /// and `NOISE_SEED`.
    pub fn from_env() -> Result<Self, TerrainError> {
        let defaults = Self::default();
        let config = Self {
            terrain: TerrainConfig::from_env()?,
            store_path: env::var("TILE_STORE_PATH").unwrap_or(defaults.store_path),
            radius: env_or("REGION_RADIUS", defaults.radius)?,
            source: env_or("SOURCE_MODE", defaults.source)?,
            preset: env_or("NOISE_PRESET", defaults.preset)?,
            seed: env_or("NOISE_SEED", defaults.seed)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TerrainError> {
        self.terrain.validate()?;
        if self.radius == 0 || self.radius > self.terrain.max_region_radius {
            return Err(TerrainError::InvalidRegion {
                radius: self.radius,
                max: self.terrain.max_region_radius,
            });
        }
        Ok(())
    }

    pub fn elevation_source(&self) -> Arc<dyn ElevationSource> {
        match self.source {
            SourceMode::Noise => Arc::new(NoiseElevation::from_preset(self.preset, self.seed)),
            SourceMode::Detached => Arc::new(DetachedNoise::from_preset(self.preset, self.seed)),
        }
    }
}
