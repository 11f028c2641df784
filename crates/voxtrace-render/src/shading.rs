//! Per-pixel coloring of traversal results.
//!
//! Shaded mode is albedo under a constant ambient term plus one Lambertian
//! sun; there are no shadows. Misses get a vertical sky gradient.

use glam::Vec3;

use crate::debug::DebugMode;
use crate::intersector::RayCastResult;
use crate::renderer::RenderConfig;

/// Light reaching surfaces that face away from the sun.
pub const AMBIENT: f32 = 0.25;

const ZENITH: Vec3 = Vec3::new(0.22, 0.42, 0.85);

/// Linear color of one pixel. `v` is the vertical image coordinate, 0 at the top.
pub fn shade(result: &RayCastResult, v: f32, config: &RenderConfig) -> Vec3 {
    match config.debug_mode {
        DebugMode::None => match result.hit {
            Some(hit) => {
                let albedo = hit.color.truncate();
                let sun = config.sun_direction.normalize_or_zero();
                let diffuse = hit.normal.dot(sun).max(0.0);
                albedo * (AMBIENT + (1.0 - AMBIENT) * diffuse)
            }
            None => sky(v, config.background),
        },
        DebugMode::TraversalSteps => {
            heatmap(result.iterations as f32 / config.heatmap_iterations.max(1) as f32)
        }
        DebugMode::NodeDepth => result.hit.map_or(Vec3::ZERO, |hit| {
            heatmap(hit.depth as f32 / config.heatmap_depth.max(1) as f32)
        }),
        DebugMode::Distance => result.hit.map_or(Vec3::ZERO, |hit| {
            Vec3::splat(1.0 - (hit.t / config.max_distance).clamp(0.0, 1.0))
        }),
        DebugMode::Normals => result
            .hit
            .map_or(Vec3::ZERO, |hit| hit.normal * 0.5 + Vec3::splat(0.5)),
    }
}

/// Gradient from `horizon` at the bottom of the image to a zenith blue at the top.
pub fn sky(v: f32, horizon: Vec3) -> Vec3 {
    ZENITH.lerp(horizon, v.clamp(0.0, 1.0))
}

/// Blue at 0, green at 0.5, red at 1.
pub fn heatmap(t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        Vec3::Z.lerp(Vec3::Y, t * 2.0)
    } else {
        Vec3::Y.lerp(Vec3::X, (t - 0.5) * 2.0)
    }
}

/// Gamma-encode a linear color to 8-bit RGBA.
pub fn to_rgba8(color: Vec3) -> [u8; 4] {
    let encoded = color.clamp(Vec3::ZERO, Vec3::ONE).powf(1.0 / 2.2) * 255.0;
    [
        encoded.x.round() as u8,
        encoded.y.round() as u8,
        encoded.z.round() as u8,
        255,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersector::VoxelHit;
    use approx::assert_relative_eq;
    use glam::Vec4;

    fn hit_result(normal: Vec3) -> RayCastResult {
        RayCastResult::hit(
            VoxelHit {
                t: 10.0,
                position: Vec3::ZERO,
                normal,
                node: 3,
                depth: 5,
                color: Vec4::new(1.0, 0.5, 0.0, 1.0),
            },
            12,
        )
    }

    #[test]
    fn lit_face_is_brighter_than_shadowed() {
        let config = RenderConfig::default();
        let facing = shade(&hit_result(config.sun_direction.normalize()), 0.5, &config);
        let away = shade(&hit_result(-config.sun_direction.normalize()), 0.5, &config);
        assert_relative_eq!(facing.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(away.x, AMBIENT);
        assert!(facing.y > away.y);
    }

    #[test]
    fn miss_shows_sky() {
        let config = RenderConfig::default();
        let top = shade(&RayCastResult::miss(3), 0.0, &config);
        let bottom = shade(&RayCastResult::miss(3), 1.0, &config);
        assert_eq!(top, ZENITH);
        assert!(bottom.abs_diff_eq(config.background, 1e-6));
    }

    #[test]
    fn debug_modes() {
        let mut config = RenderConfig::default().with_debug_mode(DebugMode::Normals);
        assert_eq!(shade(&hit_result(Vec3::Y), 0.0, &config), Vec3::new(0.5, 1.0, 0.5));

        config.debug_mode = DebugMode::TraversalSteps;
        config.heatmap_iterations = 12;
        assert_eq!(shade(&hit_result(Vec3::Y), 0.0, &config), Vec3::X);

        config.debug_mode = DebugMode::NodeDepth;
        assert_eq!(shade(&RayCastResult::miss(1), 0.0, &config), Vec3::ZERO);
    }

    #[test]
    fn heatmap_endpoints() {
        assert_eq!(heatmap(0.0), Vec3::Z);
        assert_eq!(heatmap(0.5), Vec3::Y);
        assert_eq!(heatmap(1.0), Vec3::X);
        assert_eq!(heatmap(7.0), Vec3::X);
    }

    #[test]
    fn rgba8_encoding() {
        assert_eq!(to_rgba8(Vec3::ZERO), [0, 0, 0, 255]);
        assert_eq!(to_rgba8(Vec3::ONE), [255, 255, 255, 255]);
        assert_eq!(to_rgba8(Vec3::splat(2.0)), [255, 255, 255, 255]);
    }
}
