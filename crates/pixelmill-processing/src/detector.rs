//! Pluggable detection capabilities.
//!
//! Face detection and background segmentation are external algorithms; the
//! transforms only own the region-apply-effect step. Production deployments
//! inject a real backend, tests inject the fixed-output implementations
//! below, and an unconfigured deployment reports the backend as unavailable
//! rather than guessing.

use image::{DynamicImage, GrayImage};

/// An axis-aligned rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("no {0} backend configured")]
    Unavailable(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Capability: given a raster, return zero or more face rectangles.
/// Zero detections is a valid outcome, not an error.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, img: &DynamicImage) -> Result<Vec<Region>, DetectError>;
}

/// Capability: given a raster, return a per-pixel foreground mask
/// (0 = background, 255 = foreground) with the same dimensions as the input.
pub trait BackgroundSegmenter: Send + Sync {
    fn segment(&self, img: &DynamicImage) -> Result<GrayImage, DetectError>;
}

/// Default backend for deployments with no detection model wired in.
pub struct UnavailableBackend;

impl FaceDetector for UnavailableBackend {
    fn detect_faces(&self, _img: &DynamicImage) -> Result<Vec<Region>, DetectError> {
        Err(DetectError::Unavailable("face detection"))
    }
}

impl BackgroundSegmenter for UnavailableBackend {
    fn segment(&self, _img: &DynamicImage) -> Result<GrayImage, DetectError> {
        Err(DetectError::Unavailable("background segmentation"))
    }
}

/// Test backend returning a fixed set of regions.
pub struct FixedRegionDetector {
    pub regions: Vec<Region>,
}

impl FaceDetector for FixedRegionDetector {
    fn detect_faces(&self, _img: &DynamicImage) -> Result<Vec<Region>, DetectError> {
        Ok(self.regions.clone())
    }
}

/// Test backend marking one rectangle as foreground and the rest background.
pub struct FixedMaskSegmenter {
    pub foreground: Region,
}

impl BackgroundSegmenter for FixedMaskSegmenter {
    fn segment(&self, img: &DynamicImage) -> Result<GrayImage, DetectError> {
        let (w, h) = (img.width(), img.height());
        let fg = self.foreground;
        Ok(GrayImage::from_fn(w, h, |x, y| {
            let inside = x >= fg.x && x < fg.x + fg.width && y >= fg.y && y < fg.y + fg.height;
            image::Luma([if inside { 255 } else { 0 }])
        }))
    }
}
