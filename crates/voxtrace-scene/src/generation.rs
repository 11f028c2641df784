//! Procedural terrain generation.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;
use voxtrace_voxel::palette::index;

use crate::grid::VoxelGrid;

/// Seed for procedural generation.
pub type SceneSeed = u64;

/// Terrain generator configuration. Heights are in voxels.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Seed for noise generation.
    pub seed: SceneSeed,
    /// Water fills empty voxels up to this height.
    pub sea_level: i32,
    /// Lowest possible surface height.
    pub base_height: i32,
    /// Horizontal scale of terrain features.
    pub terrain_scale: f64,
    /// Maximum terrain height variation.
    pub terrain_height: f64,
    /// Number of noise octaves for detail.
    pub octaves: usize,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Depth of dirt layer below surface.
    pub dirt_depth: u32,
    /// Surfaces above this height are snow.
    pub snow_line: i32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            sea_level: 12,
            base_height: 4,
            terrain_scale: 40.0,
            terrain_height: 40.0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            dirt_depth: 3,
            snow_line: 36,
        }
    }
}

/// Procedural terrain generator using fractal noise.
pub struct TerrainGenerator {
    config: TerrainConfig,
    height_noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given configuration.
    pub fn new(config: TerrainConfig) -> Self {
        let height_noise = Fbm::<Perlin>::new(config.seed as u32)
            .set_octaves(config.octaves)
            .set_lacunarity(config.lacunarity)
            .set_persistence(config.persistence);

        Self {
            config,
            height_noise,
        }
    }

    /// Create a terrain generator with default configuration.
    pub fn with_seed(seed: SceneSeed) -> Self {
        Self::new(TerrainConfig {
            seed,
            ..Default::default()
        })
    }

    /// Get the terrain configuration.
    pub const fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Surface height at a column.
    pub fn height_at(&self, x: i64, z: i64) -> i32 {
        let nx = x as f64 / self.config.terrain_scale;
        let nz = z as f64 / self.config.terrain_scale;

        // Noise returns [-1, 1], map to [0, terrain_height] above the base
        let noise_value = self.height_noise.get([nx, nz]).clamp(-1.0, 1.0);
        ((noise_value + 1.0) * 0.5 * self.config.terrain_height) as i32 + self.config.base_height
    }

    /// Material at height `y` of a column whose surface is at `surface_height`.
    fn material_at(&self, y: i32, surface_height: i32) -> u8 {
        if y > surface_height {
            if y <= self.config.sea_level {
                index::WATER
            } else {
                index::AIR
            }
        } else if y == surface_height {
            if surface_height > self.config.snow_line {
                index::SNOW
            } else if surface_height <= self.config.sea_level + 1 {
                index::SAND
            } else {
                index::GRASS
            }
        } else if y > surface_height - self.config.dirt_depth as i32 {
            index::DIRT
        } else {
            index::STONE
        }
    }

    /// Generate a grid of `edge^3` voxels. Columns are sampled in parallel.
    pub fn generate(&self, edge: u32) -> VoxelGrid {
        let heights: Vec<i32> = (0..edge * edge)
            .into_par_iter()
            .map(|i| self.height_at(i64::from(i % edge), i64::from(i / edge)))
            .collect();

        let mut grid = VoxelGrid::new(edge);
        for z in 0..edge {
            for x in 0..edge {
                let surface_height = heights[(z * edge + x) as usize];
                for y in 0..edge {
                    let material = self.material_at(y as i32, surface_height);
                    if material != index::AIR {
                        grid.set(x, y, z, material);
                    }
                }
            }
        }
        grid
    }
}
