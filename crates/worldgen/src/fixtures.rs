//! Elevation sources that produce seams on purpose.

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng};
use terrain::{
    coord::TileCoord,
    elevation::{ElevationSource, NoiseElevation, NoisePreset},
};

/// Every tile flat at its own height.
///
/// Adjacent plateaus meet as a step, which makes blend results easy to
/// predict by hand.
#[derive(Debug, Clone, Default)]
pub struct PlateauElevation {
    default_height: f64,
    heights: HashMap<TileCoord, f64>,
}

impl PlateauElevation {
    pub fn new(default_height: f64) -> Self {
        Self {
            default_height,
            heights: HashMap::new(),
        }
    }

    pub fn with_tile(mut self, coord: TileCoord, height: f64) -> Self {
        self.heights.insert(coord, height);
        self
    }

    /// Height of every tile on the lattice: `x * dx + z * dz`.
    pub fn sloped(dx: f64, dz: f64, radius: u32) -> Self {
        let reach = i32::try_from(radius).unwrap_or(i32::MAX);
        let mut plateaus = Self::new(0.0);
        for z in -reach..=reach {
            for x in -reach..=reach {
                let height = f64::from(x) * dx + f64::from(z) * dz;
                plateaus.heights.insert(TileCoord::new(x, z), height);
            }
        }
        plateaus
    }

    pub fn height_of(&self, coord: TileCoord) -> f64 {
        self.heights
            .get(&coord)
            .copied()
            .unwrap_or(self.default_height)
    }
}

impl ElevationSource for PlateauElevation {
    /// Without a tile there is no plateau to pick; the default applies.
    fn elevation(&self, _x: f64, _z: f64) -> f64 {
        self.default_height
    }

    fn tile_elevation(&self, tile: TileCoord, _x: f64, _z: f64) -> f64 {
        self.height_of(tile)
    }
}

/// Noise sampled as if every tile were generated on its own: the shared
/// field is shifted by a random per-tile offset, so neighbors disagree
/// along every edge.
#[derive(Debug, Clone)]
pub struct DetachedNoise {
    noise: NoiseElevation,
    seed: u64,
    max_offset: f64,
}

impl DetachedNoise {
    pub fn new(seed: u32) -> Self {
        Self::from_preset(NoisePreset::default(), seed)
    }

    pub fn from_preset(preset: NoisePreset, seed: u32) -> Self {
        let noise = NoiseElevation::from_preset(preset, seed);
        let max_offset = noise.height_scale() * 0.1;
        Self {
            noise,
            seed: u64::from(seed),
            max_offset,
        }
    }

    pub fn with_max_offset(mut self, max_offset: f64) -> Self {
        self.max_offset = max_offset.abs();
        self
    }

    /// The shift applied to every sample of `tile`; stable for a given seed.
    pub fn offset(&self, tile: TileCoord) -> f64 {
        if self.max_offset == 0.0 {
            return 0.0;
        }
        let lattice = (u64::from(tile.x as u32) << 32) | u64::from(tile.z as u32);
        let mut rng = StdRng::seed_from_u64(self.seed ^ lattice.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        rng.gen_range(-self.max_offset..=self.max_offset)
    }
}

impl ElevationSource for DetachedNoise {
    fn elevation(&self, x: f64, z: f64) -> f64 {
        self.noise.elevation(x, z)
    }

    fn tile_elevation(&self, tile: TileCoord, x: f64, z: f64) -> f64 {
        self.noise.elevation(x, z) + self.offset(tile)
    }
}
