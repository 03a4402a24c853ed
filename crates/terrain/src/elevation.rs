//! Elevation sources: the height function tiles are sampled from.

use std::str::FromStr;

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::{coord::TileCoord, errors::TerrainError};

/// A pure height function over world-space `(x, z)`.
pub trait ElevationSource: Send + Sync {
    fn elevation(&self, x: f64, z: f64) -> f64;

    /// Height sampled for a vertex of `tile`.
    ///
    /// Defaults to the world-space field. Sources that generate every tile
    /// independently override this, which is what produces seams.
    fn tile_elevation(&self, tile: TileCoord, x: f64, z: f64) -> f64 {
        let _ = tile;
        self.elevation(x, z)
    }
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn elevation(&self, x: f64, z: f64) -> f64 {
        self(x, z)
    }
}

/// Named parameter sets for [`NoiseElevation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoisePreset {
    /// Rolling hills, ±100 around sea level.
    #[default]
    Hills,
    /// Tall ridges with more octaves of detail.
    Highlands,
    /// Barely undulating plains.
    Flat,
}

impl FromStr for NoisePreset {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hills" => Ok(NoisePreset::Hills),
            "highlands" => Ok(NoisePreset::Highlands),
            "flat" => Ok(NoisePreset::Flat),
            other => Err(TerrainError::InvalidConfig(format!(
                "unknown noise preset: {other}"
            ))),
        }
    }
}

/// Perlin fractal Brownian motion over world coordinates.
///
/// Continuous across tile boundaries, so tiles sampled from it only
/// disagree at shared edges by floating-point noise.
#[derive(Debug, Clone)]
pub struct NoiseElevation {
    perlin: Perlin,
    /// Elevation the field oscillates around.
    base_elevation: f64,
    /// Amplitude of the variation.
    height_scale: f64,
    /// Spatial frequency in cycles per world unit.
    frequency: f64,
    octaves: u32,
}

impl NoiseElevation {
    /// Creates a source with the default (hills) parameters.
    pub fn new(seed: u32) -> Self {
        Self::from_preset(NoisePreset::Hills, seed)
    }

    pub fn from_preset(preset: NoisePreset, seed: u32) -> Self {
        let perlin = Perlin::new(seed);
        match preset {
            // 2.5 cycles across a 1024-unit tile
            NoisePreset::Hills => Self {
                perlin,
                base_elevation: 0.0,
                height_scale: 100.0,
                frequency: 2.5 / 1024.0,
                octaves: 4,
            },
            NoisePreset::Highlands => Self {
                perlin,
                base_elevation: 150.0,
                height_scale: 400.0,
                frequency: 1.5 / 1024.0,
                octaves: 6,
            },
            NoisePreset::Flat => Self {
                perlin,
                base_elevation: 0.0,
                height_scale: 10.0,
                frequency: 0.5 / 1024.0,
                octaves: 2,
            },
        }
    }

    pub fn with_base_elevation(mut self, elevation: f64) -> Self {
        self.base_elevation = elevation;
        self
    }

    pub fn with_height_scale(mut self, scale: f64) -> Self {
        self.height_scale = scale;
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves.max(1);
        self
    }

    pub fn base_elevation(&self) -> f64 {
        self.base_elevation
    }

    pub fn height_scale(&self) -> f64 {
        self.height_scale
    }
}

impl ElevationSource for NoiseElevation {
    fn elevation(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_amplitude = 0.0;

        for _ in 0..self.octaves {
            total += self.perlin.get([x * frequency, z * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        // normalized to [-1, 1]
        let normalized = total / max_amplitude;
        self.base_elevation + normalized * self.height_scale
    }
}
