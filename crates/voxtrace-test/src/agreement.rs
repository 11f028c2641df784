//! Cross-checks between intersectors over the same scene.

use glam::Vec3;
use voxtrace_core::Ray;
use voxtrace_render::{Camera, VoxelRayIntersector};

/// How often two intersectors agreed over a batch of rays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgreementReport {
    /// Rays cast.
    pub rays: usize,
    /// Rays both intersectors hit.
    pub both_hit: usize,
    /// Rays both intersectors missed.
    pub both_miss: usize,
    /// Rays where exactly one intersector hit.
    pub mismatched: Vec<Ray>,
    /// Largest distance gap among rays both hit.
    pub max_distance_error: f32,
}

impl AgreementReport {
    /// Fraction of rays with differing hit/miss outcomes.
    pub fn mismatch_ratio(&self) -> f64 {
        if self.rays == 0 {
            0.0
        } else {
            self.mismatched.len() as f64 / self.rays as f64
        }
    }
}

/// Cast every ray through both intersectors and tally the differences.
pub fn compare_intersectors(
    a: &dyn VoxelRayIntersector,
    b: &dyn VoxelRayIntersector,
    rays: impl IntoIterator<Item = Ray>,
) -> AgreementReport {
    let mut report = AgreementReport::default();
    for ray in rays {
        report.rays += 1;
        match (a.cast(&ray).hit, b.cast(&ray).hit) {
            (Some(ha), Some(hb)) => {
                report.both_hit += 1;
                report.max_distance_error = report.max_distance_error.max((ha.t - hb.t).abs());
            }
            (None, None) => report.both_miss += 1,
            _ => report.mismatched.push(ray),
        }
    }
    report
}

/// Rays through every voxel center row of an `edge^3` grid, along all six
/// axis directions, starting `edge / 4` outside the grid.
pub fn axis_aligned_rays(edge: u32) -> Vec<Ray> {
    let size = edge as f32;
    let margin = size * 0.25;
    let mut rays = Vec::with_capacity((edge * edge * 6) as usize);
    for axis in 0..3 {
        for i in 0..edge {
            for j in 0..edge {
                let a = i as f32 + 0.5;
                let b = j as f32 + 0.5;
                for (start, direction) in [(-margin, 1.0), (size + margin, -1.0)] {
                    let mut origin = Vec3::ZERO;
                    let mut dir = Vec3::ZERO;
                    origin[axis] = start;
                    origin[(axis + 1) % 3] = a;
                    origin[(axis + 2) % 3] = b;
                    dir[axis] = direction;
                    rays.push(Ray::new(origin, dir));
                }
            }
        }
    }
    rays
}

/// One ray per pixel center of a `width` x `height` image.
pub fn camera_rays(camera: &Camera, width: u32, height: u32) -> Vec<Ray> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| camera.ray_for_pixel(x, y, width, height)))
        .collect()
}
