//! 256-entry color table.
//!
//! Index 0 is air and stays fully transparent; the AABB layout uses alpha 0 to
//! mark an empty leaf.

use glam::{Vec3, Vec4};
use voxtrace_core::Rgb565;

/// Number of palette entries.
pub const PALETTE_SIZE: usize = 256;

/// Well-known palette indices used by the synthetic scenes.
pub mod index {
    /// Empty space
    pub const AIR: u8 = 0;
    /// Stone
    pub const STONE: u8 = 1;
    /// Dirt
    pub const DIRT: u8 = 2;
    /// Grass
    pub const GRASS: u8 = 3;
    /// Snow
    pub const SNOW: u8 = 4;
    /// Sand
    pub const SAND: u8 = 5;
    /// Water (opaque)
    pub const WATER: u8 = 6;
    /// Tree log
    pub const LOG: u8 = 7;
    /// Tree leaves
    pub const LEAVES: u8 = 8;
}

const MATERIAL_COLORS: [[u8; 3]; 8] = [
    [128, 128, 128],
    [139, 90, 43],
    [86, 125, 70],
    [236, 238, 245],
    [215, 199, 133],
    [58, 103, 178],
    [94, 68, 42],
    [60, 140, 50],
];

/// Linear RGBA colors addressed by an 8-bit index.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colors: Box<[Vec4; PALETTE_SIZE]>,
}

impl Default for Palette {
    /// Material colors at the [`index`] slots, then a hue ramp.
    fn default() -> Self {
        let mut colors = [[0u8; 4]; PALETTE_SIZE];
        for (slot, rgb) in colors[1..].iter_mut().zip(MATERIAL_COLORS) {
            *slot = [rgb[0], rgb[1], rgb[2], 255];
        }
        let ramp_start = MATERIAL_COLORS.len() + 1;
        for (i, slot) in colors[ramp_start..].iter_mut().enumerate() {
            let hue = i as f32 / (PALETTE_SIZE - ramp_start) as f32;
            let rgb = hue_to_rgb(hue);
            *slot = [
                (rgb.x * 255.0) as u8,
                (rgb.y * 255.0) as u8,
                (rgb.z * 255.0) as u8,
                255,
            ];
        }
        Self::from_rgba8(&colors)
    }
}

impl Palette {
    /// Build from 8-bit RGBA entries. Missing entries are transparent black;
    /// entries past 256 are ignored.
    pub fn from_rgba8(entries: &[[u8; 4]]) -> Self {
        let mut colors = Box::new([Vec4::ZERO; PALETTE_SIZE]);
        for (slot, rgba) in colors.iter_mut().zip(entries) {
            *slot = Vec4::new(
                f32::from(rgba[0]) / 255.0,
                f32::from(rgba[1]) / 255.0,
                f32::from(rgba[2]) / 255.0,
                f32::from(rgba[3]) / 255.0,
            );
        }
        Self { colors }
    }

    /// Linear RGBA color of an entry.
    #[inline]
    pub fn get(&self, index: u8) -> Vec4 {
        self.colors[index as usize]
    }

    /// Entry quantized to the 16-bit payload format.
    pub fn rgb565(&self, index: u8) -> Rgb565 {
        let c = self.get(index);
        Rgb565::from_rgb8([
            (c.x * 255.0).round() as u8,
            (c.y * 255.0).round() as u8,
            (c.z * 255.0).round() as u8,
        ])
    }

    /// All entries.
    pub fn colors(&self) -> &[Vec4; PALETTE_SIZE] {
        &self.colors
    }
}

/// Unpack a 16-bit payload to linear RGB.
#[inline]
pub fn unpack_rgb565(color: Rgb565) -> Vec3 {
    color.to_linear()
}

fn hue_to_rgb(hue: f32) -> Vec3 {
    let h = hue.fract() * 6.0;
    let r = (h - 3.0).abs() - 1.0;
    let g = 2.0 - (h - 2.0).abs();
    let b = 2.0 - (h - 4.0).abs();
    Vec3::new(r, g, b).clamp(Vec3::ZERO, Vec3::ONE)
}
