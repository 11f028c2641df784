//! Core voxel types.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Packed 16-bit voxel color: 5 bits red, 6 bits green, 5 bits blue.
///
/// This is the per-voxel payload stored beside 64-ary leaves.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct Rgb565(pub u16);

impl Rgb565 {
    /// Black
    pub const BLACK: Self = Self(0);
    /// White
    pub const WHITE: Self = Self(0xFFFF);
    /// Light grey used when a tree carries no payload
    pub const DEFAULT: Self = Self::from_rgb8([200, 200, 200]);

    /// Quantize an 8-bit RGB triple.
    #[inline]
    pub const fn from_rgb8(rgb: [u8; 3]) -> Self {
        let r = (rgb[0] as u16 >> 3) << 11;
        let g = (rgb[1] as u16 >> 2) << 5;
        let b = rgb[2] as u16 >> 3;
        Self(r | g | b)
    }

    /// Expand back to 8-bit RGB, replicating high bits into the low ones.
    #[inline]
    pub const fn to_rgb8(self) -> [u8; 3] {
        let r = ((self.0 >> 11) & 0x1F) as u8;
        let g = ((self.0 >> 5) & 0x3F) as u8;
        let b = (self.0 & 0x1F) as u8;
        [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
    }

    /// Unpack to linear `[0, 1]` channels.
    #[inline]
    pub fn to_linear(self) -> Vec3 {
        let r = f32::from((self.0 >> 11) & 0x1F) / 31.0;
        let g = f32::from((self.0 >> 5) & 0x3F) / 63.0;
        let b = f32::from(self.0 & 0x1F) / 31.0;
        Vec3::new(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extremes_unpack_exactly() {
        assert_eq!(Rgb565::BLACK.to_linear(), Vec3::ZERO);
        assert_eq!(Rgb565::WHITE.to_linear(), Vec3::ONE);
        assert_eq!(Rgb565::from_rgb8([255, 255, 255]), Rgb565::WHITE);
    }

    #[test]
    fn channel_layout() {
        assert_eq!(Rgb565::from_rgb8([255, 0, 0]).0, 0xF800);
        assert_eq!(Rgb565::from_rgb8([0, 255, 0]).0, 0x07E0);
        assert_eq!(Rgb565::from_rgb8([0, 0, 255]).0, 0x001F);
    }

    #[test]
    fn rgb8_survives_within_quantization() {
        let rgb = [200, 100, 37];
        let back = Rgb565::from_rgb8(rgb).to_rgb8();
        for (a, b) in rgb.iter().zip(back) {
            assert!(a.abs_diff(b) <= 8, "{rgb:?} came back as {back:?}");
        }
    }

    #[test]
    fn rgb565_is_two_bytes() {
        assert_eq!(std::mem::size_of::<Rgb565>(), 2);
        let words = [Rgb565(0x1234)];
        assert_eq!(bytemuck::cast_slice::<_, u8>(&words), &0x1234u16.to_ne_bytes());
    }
}
