//! Named demo scenes used by the CLI, benches and tests.

use glam::{UVec3, Vec3};
use voxtrace_voxel::palette::index;

use crate::generation::{SceneSeed, TerrainConfig, TerrainGenerator};
use crate::grid::VoxelGrid;

/// First palette entry of the hue ramp after the material colors.
const RAMP_START: u8 = index::LEAVES + 1;

/// A built-in scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemoScene {
    /// One large sphere resting on a floor.
    #[default]
    Sphere,
    /// Noise heightmap terrain with water.
    Terrain,
    /// A lattice of colored cubes.
    Cubes,
}

impl DemoScene {
    /// All demos.
    pub const ALL: [Self; 3] = [Self::Sphere, Self::Terrain, Self::Cubes];

    /// CLI name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Terrain => "terrain",
            Self::Cubes => "cubes",
        }
    }

    /// Parse a CLI name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|demo| demo.name() == name)
    }

    /// Voxelize the scene into a grid of `edge^3` voxels.
    pub fn generate(self, edge: u32, seed: SceneSeed) -> VoxelGrid {
        match self {
            Self::Sphere => sphere(edge),
            Self::Terrain => terrain(edge, seed),
            Self::Cubes => cubes(edge),
        }
    }
}

fn sphere(edge: u32) -> VoxelGrid {
    let mut grid = VoxelGrid::new(edge);
    let floor = (edge / 8).max(1);
    grid.fill(UVec3::ZERO, UVec3::new(edge, floor, edge), index::STONE);
    let radius = edge as f32 * 0.35;
    let center = Vec3::new(edge as f32 * 0.5, floor as f32 + radius, edge as f32 * 0.5);
    grid.fill_sphere(center, radius, index::GRASS);
    grid
}

fn terrain(edge: u32, seed: SceneSeed) -> VoxelGrid {
    let scale = f64::from(edge) / 64.0;
    let defaults = TerrainConfig::default();
    let config = TerrainConfig {
        seed,
        sea_level: (f64::from(defaults.sea_level) * scale) as i32,
        base_height: (f64::from(defaults.base_height) * scale) as i32,
        terrain_scale: defaults.terrain_scale * scale,
        terrain_height: defaults.terrain_height * scale,
        snow_line: (f64::from(defaults.snow_line) * scale) as i32,
        ..defaults
    };
    TerrainGenerator::new(config).generate(edge)
}

fn cubes(edge: u32) -> VoxelGrid {
    let mut grid = VoxelGrid::new(edge);
    let cell = (edge / 4).max(2);
    let cube = (cell / 2).max(1);
    let margin = (cell - cube) / 2;
    let mut color = 0u32;
    for y in (0..edge).step_by(cell as usize) {
        for z in (0..edge).step_by(cell as usize) {
            for x in (0..edge).step_by(cell as usize) {
                let min = UVec3::new(x, y, z) + UVec3::splat(margin);
                let material = RAMP_START + (color * 37 % 200) as u8;
                grid.fill(min, min + UVec3::splat(cube), material);
                color += 1;
            }
        }
    }
    grid
}
