//! Ray/octree intersection and CPU rendering for voxtrace.
//!
//! This crate provides:
//! - Mask-descent traversal of a [`Tree64`](voxtrace_voxel::Tree64)
//! - Stack-based AABB traversal of an [`AabbOctree`](voxtrace_voxel::AabbOctree)
//! - Camera and per-pixel ray generation
//! - Shading and debug visualization modes
//! - A parallel CPU renderer and screenshot saving

pub mod camera;
pub mod cast_stack;
pub mod debug;
pub mod intersector;
pub mod mask_descent;
pub mod renderer;
pub mod screenshot;
pub mod shading;
pub mod stack_aabb;

pub use camera::{ray_from_inverse_view_projection, Camera};
pub use cast_stack::{CastStack, StackOverflow};
pub use debug::DebugMode;
pub use intersector::{RayCastResult, VoxelHit, VoxelRayIntersector};
pub use mask_descent::{MaskDescentConfig, MaskDescentTraversal};
pub use renderer::{CpuRenderer, RenderConfig, RenderOutput, RenderStats};
pub use screenshot::{save_screenshot, ScreenshotError};
pub use stack_aabb::{ChildOrder, StackAabbConfig, StackAabbTraversal};
pub use voxtrace_voxel::{unpack_rgb565, Palette};
