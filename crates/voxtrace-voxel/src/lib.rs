//! Octree storage for voxtrace.
//!
//! Two read-only layouts of the same scene:
//! - [`Tree64`]: 64-ary nodes with bit-packed occupancy and compacted children,
//!   walked by mask descent
//! - [`AabbOctree`]: explicit 8-ary nodes with bounding boxes, walked with a
//!   bounded stack
//!
//! Both can be stored in a [`SceneFile`]. Voxel colors come from a shared
//! [`Palette`].

pub mod aabb_tree;
pub mod palette;
pub mod scene_file;
pub mod tree64;

pub use aabb_tree::{AabbNode, AabbOctree, AABB_CHILDREN};
pub use palette::{unpack_rgb565, Palette, PALETTE_SIZE};
pub use scene_file::{SceneFile, SCENE_FORMAT_VERSION, SCENE_MAGIC};
pub use tree64::{Tree64, Tree64Node};
