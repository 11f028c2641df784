//! Saving rendered images to disk.

use std::path::Path;

use image::RgbaImage;
use tracing::info;

/// Save a rendered image. The format follows the file extension.
pub fn save_screenshot(image: &RgbaImage, path: impl AsRef<Path>) -> Result<(), ScreenshotError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ScreenshotError::SaveFailed(e.to_string()))?;
    }

    image
        .save(path)
        .map_err(|e| ScreenshotError::SaveFailed(e.to_string()))?;

    info!(
        width = image.width(),
        height = image.height(),
        "Screenshot saved: {}",
        path.display()
    );
    Ok(())
}

/// Errors that can occur while saving an image.
#[derive(Debug)]
pub enum ScreenshotError {
    /// Failed to write the image file.
    SaveFailed(String),
}

impl std::fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SaveFailed(e) => write!(f, "Failed to save screenshot: {e}"),
        }
    }
}

impl std::error::Error for ScreenshotError {}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("voxtrace-screenshot-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn png_round_trip() {
        let path = temp_path("round_trip.png");
        let image = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 255]));
        save_screenshot(&image, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_extension_fails() {
        let image = RgbaImage::new(1, 1);
        let result = save_screenshot(&image, temp_path("frame.unknownformat"));
        assert!(matches!(result, Err(ScreenshotError::SaveFailed(_))));
    }
}
