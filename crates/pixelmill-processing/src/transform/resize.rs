//! Resize and upscale.

use image::imageops::FilterType;
use image::DynamicImage;

use crate::codec::{self, TransformError};
use crate::options::{ResizeMode, ResizeOptions, UpscaleOptions};
use crate::validator::ImageKind;

/// How many downscale rounds the byte-budget mode will attempt before
/// settling for the smallest result so far.
const MAX_FIT_ITERATIONS: u32 = 8;

pub fn apply(
    img: DynamicImage,
    opts: &ResizeOptions,
    kind: ImageKind,
) -> Result<DynamicImage, TransformError> {
    let (orig_w, orig_h) = (img.width(), img.height());

    match opts.mode {
        ResizeMode::Dimensions { width, height } => {
            let (new_w, new_h) = dimensions_for(orig_w, orig_h, width, height);
            Ok(img.resize_exact(new_w, new_h, FilterType::Lanczos3))
        }
        ResizeMode::Percentage(pct) => {
            let new_w = ((orig_w as f32 * pct / 100.0) as u32).max(1);
            let new_h = ((orig_h as f32 * pct / 100.0) as u32).max(1);
            Ok(img.resize_exact(new_w, new_h, FilterType::Lanczos3))
        }
        ResizeMode::MaxSizeKb(max_kb) => fit_to_byte_budget(img, kind, max_kb),
    }
}

/// Resolve target dimensions; a missing axis scales proportionally.
fn dimensions_for(
    orig_w: u32,
    orig_h: u32,
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            let ratio = orig_h as f32 / orig_w as f32;
            (w, ((w as f32 * ratio) as u32).max(1))
        }
        (None, Some(h)) => {
            let ratio = orig_w as f32 / orig_h as f32;
            (((h as f32 * ratio) as u32).max(1), h)
        }
        // The option resolver guarantees at least one axis.
        (None, None) => (orig_w, orig_h),
    }
}

/// Repeatedly downscale until the encoded output fits the byte budget.
///
/// Each round scales both axes by the square root of the size ratio, which
/// roughly halves the overshoot per iteration. An image that already fits is
/// returned untouched.
fn fit_to_byte_budget(
    img: DynamicImage,
    kind: ImageKind,
    max_kb: u32,
) -> Result<DynamicImage, TransformError> {
    let budget = max_kb as usize * 1024;
    let mut current = img;

    for iteration in 0..MAX_FIT_ITERATIONS {
        let encoded = codec::encode(&current, kind, None)?;
        if encoded.len() <= budget {
            tracing::debug!(
                iteration = iteration,
                bytes = encoded.len(),
                budget = budget,
                "Resize fits byte budget"
            );
            return Ok(current);
        }
        if current.width() <= 1 && current.height() <= 1 {
            break;
        }

        let ratio = (budget as f32 / encoded.len() as f32).sqrt().min(0.95);
        let new_w = ((current.width() as f32 * ratio) as u32).max(1);
        let new_h = ((current.height() as f32 * ratio) as u32).max(1);
        current = current.resize_exact(new_w, new_h, FilterType::Lanczos3);
    }

    Ok(current)
}

pub fn upscale(img: DynamicImage, opts: &UpscaleOptions) -> DynamicImage {
    let new_w = img.width() * opts.scale;
    let new_h = img.height() * opts.scale;
    let upscaled = img.resize_exact(new_w, new_h, FilterType::Lanczos3);

    if opts.sharpen {
        upscaled.unsharpen(1.5, 3)
    } else {
        upscaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn test_dimensions_for_proportional_height() {
        assert_eq!(dimensions_for(1000, 500, Some(500), None), (500, 250));
        assert_eq!(dimensions_for(500, 1000, None, Some(500)), (250, 500));
        assert_eq!(dimensions_for(100, 100, Some(20), Some(40)), (20, 40));
    }

    #[test]
    fn test_resize_percentage() {
        let img = test_image(200, 100);
        let opts = ResizeOptions {
            mode: ResizeMode::Percentage(50.0),
        };
        let out = apply(img, &opts, ImageKind::Png).unwrap();
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_resize_percentage_100_identity() {
        let img = test_image(123, 77);
        let opts = ResizeOptions {
            mode: ResizeMode::Percentage(100.0),
        };
        let out = apply(img, &opts, ImageKind::Png).unwrap();
        assert_eq!((out.width(), out.height()), (123, 77));
    }

    /// Deterministic noise so the PNG encoder cannot compress it away.
    fn noise_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            let seed = x
                .wrapping_mul(2654435761)
                .wrapping_add(y.wrapping_mul(2246822519))
                .wrapping_mul(3266489917);
            Rgba([
                (seed >> 8) as u8,
                (seed >> 16) as u8,
                (seed >> 24) as u8,
                255,
            ])
        }))
    }

    #[test]
    fn test_fit_to_byte_budget_shrinks_until_it_fits() {
        let img = noise_image(400, 400);
        let opts = ResizeOptions {
            mode: ResizeMode::MaxSizeKb(20),
        };
        let out = apply(img, &opts, ImageKind::Png).unwrap();
        let encoded = codec::encode(&out, ImageKind::Png, None).unwrap();
        assert!(encoded.len() <= 20 * 1024);
        assert!(out.width() < 400);
    }

    #[test]
    fn test_fit_to_byte_budget_leaves_small_images_alone() {
        let img = test_image(10, 10);
        let opts = ResizeOptions {
            mode: ResizeMode::MaxSizeKb(500),
        };
        let out = apply(img, &opts, ImageKind::Png).unwrap();
        assert_eq!((out.width(), out.height()), (10, 10));
    }

    #[test]
    fn test_upscale_scales_both_axes() {
        let img = test_image(30, 20);
        let out = upscale(
            img,
            &UpscaleOptions {
                scale: 4,
                sharpen: false,
            },
        );
        assert_eq!((out.width(), out.height()), (120, 80));
    }

    #[test]
    fn test_upscale_with_sharpen_keeps_dimensions() {
        let img = test_image(16, 16);
        let out = upscale(
            img,
            &UpscaleOptions {
                scale: 2,
                sharpen: true,
            },
        );
        assert_eq!((out.width(), out.height()), (32, 32));
    }
}
