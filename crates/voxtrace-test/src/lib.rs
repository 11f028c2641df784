//! Test harness for voxtrace.
//!
//! Provides headless rendering, visual regression testing, and agreement
//! checks between the two traversal strategies.

pub mod agreement;
pub mod harness;

pub use agreement::{axis_aligned_rays, camera_rays, compare_intersectors, AgreementReport};
pub use harness::{
    compare_images, create_diff_image, create_test_camera, HeadlessRenderer, VisualRegressionTest,
};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Invalid render size {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Image comparison failed: {0}")]
    ImageComparison(String),
    #[error("Scene error: {0}")]
    Scene(#[from] voxtrace_core::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Visual regression test configuration.
#[derive(Debug, Clone)]
pub struct VisualTestConfig {
    /// Maximum allowed pixel difference (0.0-1.0).
    pub threshold: f64,
    /// Directory for baseline images.
    pub baseline_dir: PathBuf,
    /// Directory for test output images.
    pub output_dir: PathBuf,
}

impl Default for VisualTestConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            baseline_dir: PathBuf::from("assets/test_data/baselines"),
            output_dir: PathBuf::from("target/test_output"),
        }
    }
}

impl VisualTestConfig {
    /// Keep baselines and outputs under one directory.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            baseline_dir: root.join("baselines"),
            output_dir: root.join("output"),
            ..Self::default()
        }
    }

    /// Set the difference threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}
