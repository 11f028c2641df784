//! CPU rendering: one ray per pixel, traced in parallel.
//!
//! Every traversal result is collected before any pixel is written, so the
//! output image is only touched after all reads of the octree have finished.

use std::time::{Duration, Instant};

use glam::Vec3;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::debug;

use crate::camera::Camera;
use crate::debug::DebugMode;
use crate::intersector::{RayCastResult, VoxelRayIntersector};
use crate::shading::{shade, to_rgba8};

/// Configuration for a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Visualization mode.
    pub debug_mode: DebugMode,
    /// Sky color at the horizon.
    pub background: Vec3,
    /// Direction towards the sun.
    pub sun_direction: Vec3,
    /// Iteration count shown as full red in the steps heatmap.
    pub heatmap_iterations: u32,
    /// Depth shown as full red in the depth heatmap.
    pub heatmap_depth: u32,
    /// Distance mapped to black in the distance view.
    pub max_distance: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            debug_mode: DebugMode::None,
            background: Vec3::new(0.75, 0.85, 0.95),
            sun_direction: Vec3::new(0.4, 1.0, 0.3),
            heatmap_iterations: 64,
            heatmap_depth: 10,
            max_distance: 512.0,
        }
    }
}

impl RenderConfig {
    /// Create a new configuration with the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Set the image size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the visualization mode.
    #[must_use]
    pub const fn with_debug_mode(mut self, debug_mode: DebugMode) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    /// Set the horizon color.
    #[must_use]
    pub const fn with_background(mut self, background: Vec3) -> Self {
        self.background = background;
        self
    }

    /// Set the sun direction.
    #[must_use]
    pub const fn with_sun_direction(mut self, sun_direction: Vec3) -> Self {
        self.sun_direction = sun_direction;
        self
    }

    /// Pixels in one image, computed without `u32` overflow.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Width over height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Counters gathered over one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Rays traced.
    pub rays: u64,
    /// Rays that hit a voxel.
    pub hits: u64,
    /// Rays stopped by stack overflow.
    pub aborted: u64,
    /// Sum of traversal iterations.
    pub total_iterations: u64,
    /// Largest iteration count of a single ray.
    pub max_iterations: u32,
}

impl RenderStats {
    /// Tally a set of results.
    pub fn from_results(results: &[RayCastResult]) -> Self {
        results.iter().fold(Self::default(), |mut stats, result| {
            stats.rays += 1;
            stats.hits += u64::from(result.is_hit());
            stats.aborted += u64::from(result.aborted);
            stats.total_iterations += u64::from(result.iterations);
            stats.max_iterations = stats.max_iterations.max(result.iterations);
            stats
        })
    }

    /// Mean iterations per ray.
    pub fn mean_iterations(&self) -> f64 {
        if self.rays == 0 {
            0.0
        } else {
            self.total_iterations as f64 / self.rays as f64
        }
    }

    /// Fraction of rays that hit.
    pub fn hit_ratio(&self) -> f64 {
        if self.rays == 0 {
            0.0
        } else {
            self.hits as f64 / self.rays as f64
        }
    }
}

/// Result of a render pass.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Rendered image.
    pub image: RgbaImage,
    /// Per-pass counters.
    pub stats: RenderStats,
    /// Wall time spent tracing rays.
    pub trace_time: Duration,
}

/// Renders any [`VoxelRayIntersector`] on the CPU.
#[derive(Debug, Clone, Default)]
pub struct CpuRenderer {
    config: RenderConfig,
}

impl CpuRenderer {
    /// Create a renderer.
    pub const fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Trace one ray per pixel without shading.
    pub fn trace<I>(&self, intersector: &I, camera: &Camera) -> Vec<RayCastResult>
    where
        I: VoxelRayIntersector + ?Sized,
    {
        let width = self.config.width;
        let height = self.config.height;
        let row = width as usize;
        (0..self.config.pixel_count())
            .into_par_iter()
            .map(|i| {
                let ray = camera.ray_for_pixel((i % row) as u32, (i / row) as u32, width, height);
                intersector.cast(&ray)
            })
            .collect()
    }

    /// Render a full image.
    pub fn render<I>(&self, intersector: &I, camera: &Camera) -> RenderOutput
    where
        I: VoxelRayIntersector + ?Sized,
    {
        let width = self.config.width;
        let height = self.config.height;
        let _span = tracing::info_span!(
            "render",
            intersector = intersector.name(),
            width,
            height
        )
        .entered();

        let start = Instant::now();
        let results = {
            let _span = tracing::trace_span!("render.trace").entered();
            self.trace(intersector, camera)
        };
        let trace_time = start.elapsed();

        let row = width as usize;
        let colors: Vec<[u8; 4]> = {
            let _span = tracing::trace_span!("render.shade").entered();
            results
                .par_iter()
                .enumerate()
                .map(|(i, result)| {
                    let v = ((i / row) as f32 + 0.5) / height as f32;
                    to_rgba8(shade(result, v, &self.config))
                })
                .collect()
        };

        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba(colors[y as usize * row + x as usize])
        });

        let stats = RenderStats::from_results(&results);
        debug!(
            intersector = intersector.name(),
            rays = stats.rays,
            hits = stats.hits,
            aborted = stats.aborted,
            mean_iterations = stats.mean_iterations(),
            max_iterations = stats.max_iterations,
            trace_ms = trace_time.as_secs_f64() * 1000.0,
            "Render complete"
        );

        RenderOutput {
            image,
            stats,
            trace_time,
        }
    }
}
