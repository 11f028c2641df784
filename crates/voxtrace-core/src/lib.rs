//! Core types, math, and bit utilities for voxtrace.
//!
//! This crate provides the primitives shared by both octree layouts and both
//! traversal strategies:
//! - Rays with a precomputed reciprocal direction
//! - Axis-aligned bounding boxes and the slab intersection test
//! - Cell indexing, scale flooring and population counts for 64-ary nodes
//! - Packed voxel colors and the common error type

pub mod bits;
pub mod error;
pub mod math;
pub mod types;

pub use bits::{
    cell_size, compacted_child_index, exp2_bits, floor_scale, floor_scale_f32,
    get_node_cell_index, get_node_cell_index_f32, popcount64, popcount_var64,
};
pub use error::{Error, Result};
pub use math::{Aabb, Ray, NO_HIT};
pub use types::Rgb565;

/// Traversal-wide constants
pub mod constants {
    /// Child cells per axis in a 64-ary node (4x4x4).
    pub const CELLS_PER_AXIS: u32 = 4;
    /// Child cells per 64-ary node.
    pub const CELLS_PER_NODE: u32 = CELLS_PER_AXIS * CELLS_PER_AXIS * CELLS_PER_AXIS;
    /// Bits consumed per 64-ary level (log2 of `CELLS_PER_AXIS`).
    pub const LEVEL_BITS: u32 = 2;
    /// Scale exponent of the root's children. The root spans the 23 mantissa
    /// bits of an `f32` in `[1, 2)`, so its cells are selected by bits 21..23.
    pub const ROOT_SCALE_EXP: u32 = 21;
    /// Number of explicit mantissa bits in an `f32`.
    pub const MANTISSA_BITS: u32 = 23;
    /// Deepest 64-ary level representable in the normalised space.
    pub const MAX_TREE64_DEPTH: u32 = ROOT_SCALE_EXP / LEVEL_BITS + 1;
    /// Node capacity of a 64-ary tree (fixed-size upload buffer).
    pub const TREE64_NODE_CAPACITY: usize = 32 * 32 * 32;
    /// Default outer iteration cap of mask-descent traversal.
    pub const MASK_DESCENT_MAX_STEPS: u32 = 64;
    /// Default ray offset applied past each crossed cell face (world units).
    pub const RAY_EPSILON: f32 = 1.0e-4;
    /// Maximum depth of the explicit AABB octree.
    pub const AABB_MAX_DEPTH: u32 = 8;
    /// Capacity of the fixed work stack used by AABB traversal.
    pub const CAST_STACK_CAPACITY: usize = 128;
    /// Default iteration cap of AABB traversal.
    pub const STACK_AABB_MAX_ITERATIONS: u32 = 100;
    /// Default entry distance below which a popped node counts as occluded.
    pub const OCCLUSION_EPSILON: f32 = 1.0e-4;
}
