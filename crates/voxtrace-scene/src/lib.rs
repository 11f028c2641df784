//! Scenes for voxtrace.
//!
//! Dense voxel grids filled with shapes, noise terrain or MagicaVoxel
//! imports, and the reference builders that turn a grid into either octree
//! layout.

pub mod build;
pub mod demo;
pub mod generation;
pub mod grid;
pub mod vox;

pub use build::{build_aabb_octree, build_tree64};
pub use demo::DemoScene;
pub use generation::{SceneSeed, TerrainConfig, TerrainGenerator};
pub use grid::VoxelGrid;
pub use vox::{load_vox, parse_vox, EdgeRounding, VoxScene};
