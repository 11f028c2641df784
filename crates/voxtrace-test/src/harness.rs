//! Headless rendering and visual regression testing.
//!
//! Scenes are rendered on the CPU into images that are compared against
//! stored baselines.

use glam::Vec3;
use image::{Rgba, RgbaImage};

use voxtrace_render::{
    Camera, CpuRenderer, MaskDescentTraversal, RenderConfig, StackAabbConfig, StackAabbTraversal,
    VoxelRayIntersector,
};
use voxtrace_voxel::{AabbOctree, Tree64};

use crate::{Result, TestError, VisualTestConfig};

/// Renderer for tests that need no display.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    renderer: CpuRenderer,
}

impl HeadlessRenderer {
    /// Create a headless renderer with the default shading settings.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::with_config(RenderConfig::new(width, height))
    }

    /// Create a headless renderer from a full render configuration.
    pub fn with_config(config: RenderConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(TestError::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }
        Ok(Self {
            renderer: CpuRenderer::new(config),
        })
    }

    /// Render with any intersector.
    pub fn render(&self, intersector: &dyn VoxelRayIntersector, camera: &Camera) -> RgbaImage {
        self.renderer.render(intersector, camera).image
    }

    /// Render a [`Tree64`] with mask descent.
    pub fn render_tree64(&self, tree: &Tree64, camera: &Camera) -> RgbaImage {
        self.render(&MaskDescentTraversal::new(tree), camera)
    }

    /// Render an [`AabbOctree`] with stack traversal.
    pub fn render_aabb(
        &self,
        tree: &AabbOctree,
        config: StackAabbConfig,
        camera: &Camera,
    ) -> RgbaImage {
        self.render(&StackAabbTraversal::with_config(tree, config), camera)
    }

    /// Get the output dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        let config = self.renderer.config();
        (config.width, config.height)
    }
}

/// Visual regression test runner.
///
/// Compares rendered images against baseline images and reports differences.
#[derive(Debug, Clone)]
pub struct VisualRegressionTest {
    config: VisualTestConfig,
    renderer: HeadlessRenderer,
}

impl VisualRegressionTest {
    /// Create a new visual regression test runner rendering 256x256 images.
    pub fn new(config: VisualTestConfig) -> Result<Self> {
        Self::with_dimensions(config, 256, 256)
    }

    /// Create with custom dimensions.
    pub fn with_dimensions(config: VisualTestConfig, width: u32, height: u32) -> Result<Self> {
        let renderer = HeadlessRenderer::new(width, height)?;
        Ok(Self { config, renderer })
    }

    /// The renderer used for test cases.
    pub const fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    /// Run a test case.
    ///
    /// `name` selects the baseline file. A missing baseline is created from
    /// this render.
    pub fn run_test(
        &self,
        name: &str,
        intersector: &dyn VoxelRayIntersector,
        camera: &Camera,
    ) -> Result<()> {
        let image = self.renderer.render(intersector, camera);
        self.compare_and_save(name, &image)
    }

    /// Run a test case against a [`Tree64`].
    pub fn run_test_tree64(&self, name: &str, tree: &Tree64, camera: &Camera) -> Result<()> {
        self.run_test(name, &MaskDescentTraversal::new(tree), camera)
    }

    /// Run a test case against an [`AabbOctree`].
    pub fn run_test_aabb(&self, name: &str, tree: &AabbOctree, camera: &Camera) -> Result<()> {
        self.run_test(name, &StackAabbTraversal::new(tree), camera)
    }

    fn compare_and_save(&self, name: &str, image: &RgbaImage) -> Result<()> {
        // Ensure directories exist
        std::fs::create_dir_all(&self.config.baseline_dir)?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let baseline_path = self.config.baseline_dir.join(format!("{name}.png"));
        let output_path = self.config.output_dir.join(format!("{name}.png"));

        // Save current output
        image.save(&output_path)?;

        if !baseline_path.exists() {
            image.save(&baseline_path)?;
            tracing::info!("Created new baseline: {}", baseline_path.display());
            return Ok(());
        }

        let baseline = image::open(&baseline_path)?.to_rgba8();
        let diff = compare_images(&baseline, image)?;
        if diff > self.config.threshold {
            let diff_path = self.config.output_dir.join(format!("{name}_diff.png"));
            create_diff_image(&baseline, image).save(&diff_path)?;

            return Err(TestError::ImageComparison(format!(
                "Image difference {:.4} exceeds threshold {:.4} (see {})",
                diff,
                self.config.threshold,
                diff_path.display()
            )));
        }

        Ok(())
    }
}

/// Normalized RGB difference of two images, 0.0 for identical images.
pub fn compare_images(a: &RgbaImage, b: &RgbaImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(TestError::ImageComparison(format!(
            "Image dimensions don't match: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }

    let total_diff: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            (0..3)
                .map(|c| u64::from(pa[c].abs_diff(pb[c])))
                .sum::<u64>()
        })
        .sum();

    let max_diff = (u64::from(a.width()) * u64::from(a.height()) * 3 * 255) as f64;
    if max_diff == 0.0 {
        return Ok(0.0);
    }
    Ok(total_diff as f64 / max_diff)
}

/// Red where the images differ noticeably, the dimmed first image elsewhere.
pub fn create_diff_image(a: &RgbaImage, b: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(a.width(), a.height(), |x, y| {
        let pa = a.get_pixel(x, y);
        let Some(pb) = b.get_pixel_checked(x, y) else {
            return Rgba([255, 0, 0, 255]);
        };
        let max_diff = (0..3).map(|c| pa[c].abs_diff(pb[c])).max().unwrap_or(0);
        if max_diff > 10 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([pa[0] / 2, pa[1] / 2, pa[2] / 2, 255])
        }
    })
}

/// Create a test camera looking down -Z at the center of an octree.
pub fn create_test_camera(octree_size: u32, distance_factor: f32) -> Camera {
    let center = octree_size as f32 / 2.0;
    let distance = octree_size as f32 * distance_factor;

    Camera {
        position: Vec3::new(center, center, center + distance),
        direction: Vec3::NEG_Z,
        up: Vec3::Y,
        fov: std::f32::consts::FRAC_PI_4,
        aspect: 1.0, // Square for testing
        near: 0.1,
        far: 1000.0,
    }
}
