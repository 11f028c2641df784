//! Bit-level helpers for addressing 64-ary (4x4x4) octree nodes.
//!
//! Positions are integer coordinates; for traversal they are the IEEE-754 bit
//! patterns of `f32` coordinates in `[1, 2)`, whose mantissa bits form a
//! 23-bit integer grid. Every helper here is pure and branch-light.

use glam::{UVec3, Vec3};

use crate::constants::MANTISSA_BITS;

/// Flat child slot of `pos` inside the cell addressed at `scale_exp`.
///
/// Each axis contributes the 2-bit (quaternary) digit at bit `scale_exp`.
/// Digits are laid out x fastest, then z, then y: `x + z*4 + y*16`.
/// Tree builders must use the same convention.
#[inline]
pub fn get_node_cell_index(pos: UVec3, scale_exp: u32) -> u32 {
    let x = (pos.x >> scale_exp) & 3;
    let y = (pos.y >> scale_exp) & 3;
    let z = (pos.z >> scale_exp) & 3;
    x + z * 4 + y * 16
}

/// [`get_node_cell_index`] on the bit pattern of a normalised position.
#[inline]
pub fn get_node_cell_index_f32(pos: Vec3, scale_exp: u32) -> u32 {
    get_node_cell_index(to_bits(pos), scale_exp)
}

/// Clear every bit below `scale_exp`, yielding the minimum corner of the
/// containing cell of edge `2^scale_exp`.
#[inline]
pub fn floor_scale(pos: UVec3, scale_exp: u32) -> UVec3 {
    let mask = u32::MAX.checked_shl(scale_exp).unwrap_or(0);
    UVec3::new(pos.x & mask, pos.y & mask, pos.z & mask)
}

/// [`floor_scale`] on the bit pattern of a normalised position.
#[inline]
pub fn floor_scale_f32(pos: Vec3, scale_exp: u32) -> Vec3 {
    from_bits(floor_scale(to_bits(pos), scale_exp))
}

/// Number of set bits in `mask`.
#[inline]
pub const fn popcount64(mask: u64) -> u32 {
    mask.count_ones()
}

/// Number of set bits among the low `width` bits of `mask`.
///
/// `width == 0` counts nothing, `width >= 64` counts the whole mask.
#[inline]
pub const fn popcount_var64(mask: u64, width: u32) -> u32 {
    let width = if width > 64 { 64 } else { width };
    let low = match u64::MAX.checked_shr(64 - width) {
        Some(low) => low,
        None => 0,
    };
    (mask & low).count_ones()
}

/// Array index of the child stored for `slot` under compacted storage.
#[inline]
pub const fn compacted_child_index(child_ptr: u32, mask: u64, slot: u32) -> u32 {
    child_ptr + popcount_var64(mask, slot)
}

/// `2^exp` built directly in the exponent field of an `f32`.
///
/// Only normal results are representable, so `exp` must lie in `-126..=127`.
#[inline]
pub fn exp2_bits(exp: i32) -> f32 {
    debug_assert!((-126..=127).contains(&exp));
    f32::from_bits(((exp + 127) as u32) << MANTISSA_BITS)
}

/// Edge length, in the normalised space, of a cell addressed at `scale_exp`.
#[inline]
pub fn cell_size(scale_exp: u32) -> f32 {
    exp2_bits(scale_exp as i32 - MANTISSA_BITS as i32)
}

#[inline]
fn to_bits(v: Vec3) -> UVec3 {
    UVec3::new(v.x.to_bits(), v.y.to_bits(), v.z.to_bits())
}

#[inline]
fn from_bits(v: UVec3) -> Vec3 {
    Vec3::new(f32::from_bits(v.x), f32::from_bits(v.y), f32::from_bits(v.z))
}
