//! Region blurring (face anonymization) and background removal.
//!
//! Both tools only own the apply-effect step; where the regions or the mask
//! come from is the injected backend's business.

use image::{imageops, DynamicImage, RgbaImage};

use crate::codec::TransformError;
use crate::detector::{BackgroundSegmenter, FaceDetector, Region};
use crate::options::BlurFaceOptions;

/// Blur every detected (or manually supplied) region independently.
///
/// Zero regions is a successful no-op: the input is returned unmodified.
pub fn blur_faces(
    img: DynamicImage,
    opts: &BlurFaceOptions,
    detector: &dyn FaceDetector,
) -> Result<DynamicImage, TransformError> {
    let regions = match opts.region {
        Some(region) => vec![region],
        None => detector.detect_faces(&img)?,
    };

    if regions.is_empty() {
        tracing::debug!("No faces detected, returning image unchanged");
        return Ok(img);
    }

    let sigma = blur_sigma(opts.strength);
    let mut canvas = img.to_rgba8();
    for region in &regions {
        blur_region(&mut canvas, *region, sigma);
    }

    tracing::debug!(
        regions = regions.len(),
        strength = opts.strength,
        "Blurred face regions"
    );
    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Gaussian sigma for an odd blur kernel of the given strength, using the
/// conventional sigma = 0.3 * ((ksize - 1) * 0.5 - 1) + 0.8 relation.
fn blur_sigma(strength: u32) -> f32 {
    let ksize = ensure_odd(strength.max(3));
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn ensure_odd(n: u32) -> u32 {
    if n % 2 == 1 {
        n
    } else {
        n + 1
    }
}

fn blur_region(canvas: &mut RgbaImage, region: Region, sigma: f32) {
    let (img_w, img_h) = canvas.dimensions();
    // Regions from a detector may brush the edge; intersect with the image.
    let x = region.x.min(img_w);
    let y = region.y.min(img_h);
    let w = region.width.min(img_w - x);
    let h = region.height.min(img_h - y);
    if w == 0 || h == 0 {
        return;
    }

    let roi = imageops::crop_imm(canvas, x, y, w, h).to_image();
    let blurred = imageops::blur(&roi, sigma);
    imageops::replace(canvas, &blurred, x as i64, y as i64);
}

/// Multiply the segmenter's foreground mask into the alpha channel.
pub fn remove_background(
    img: DynamicImage,
    segmenter: &dyn BackgroundSegmenter,
) -> Result<DynamicImage, TransformError> {
    let mask = segmenter.segment(&img)?;
    if mask.dimensions() != (img.width(), img.height()) {
        return Err(TransformError::DetectorUnavailable(format!(
            "segmenter returned a {}x{} mask for a {}x{} image",
            mask.width(),
            mask.height(),
            img.width(),
            img.height()
        )));
    }

    let mut rgba = img.to_rgba8();
    for (pixel, mask_pixel) in rgba.pixels_mut().zip(mask.pixels()) {
        let weight = mask_pixel.0[0] as u16;
        pixel[3] = ((pixel[3] as u16 * weight) / 255) as u8;
    }
    Ok(DynamicImage::ImageRgba8(rgba))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{FixedMaskSegmenter, FixedRegionDetector};
    use image::{Rgba, RgbaImage};

    fn checkerboard(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        }))
    }

    fn default_opts() -> BlurFaceOptions {
        BlurFaceOptions {
            strength: 25,
            region: None,
        }
    }

    #[test]
    fn test_zero_detections_returns_input_unchanged() {
        let img = checkerboard(20, 20);
        let detector = FixedRegionDetector { regions: vec![] };
        let out = blur_faces(img.clone(), &default_opts(), &detector).unwrap();
        assert_eq!(out.to_rgba8().as_raw(), img.to_rgba8().as_raw());
    }

    #[test]
    fn test_detected_region_is_blurred_rest_untouched() {
        let img = checkerboard(40, 40);
        let detector = FixedRegionDetector {
            regions: vec![Region {
                x: 0,
                y: 0,
                width: 20,
                height: 20,
            }],
        };
        let out = blur_faces(img.clone(), &default_opts(), &detector)
            .unwrap()
            .to_rgba8();
        let original = img.to_rgba8();

        // Inside the region the checkerboard is smoothed away from 0/255.
        let inside = out.get_pixel(10, 10);
        assert!(inside[0] > 10 && inside[0] < 245);

        // Far outside the region the pixels are untouched.
        assert_eq!(out.get_pixel(35, 35), original.get_pixel(35, 35));
    }

    #[test]
    fn test_region_partially_outside_bounds_is_clamped() {
        let img = checkerboard(20, 20);
        let detector = FixedRegionDetector {
            regions: vec![Region {
                x: 15,
                y: 15,
                width: 50,
                height: 50,
            }],
        };
        let out = blur_faces(img, &default_opts(), &detector).unwrap();
        assert_eq!((out.width(), out.height()), (20, 20));
    }

    #[test]
    fn test_multiple_regions_blurred_independently() {
        let img = checkerboard(60, 20);
        let detector = FixedRegionDetector {
            regions: vec![
                Region {
                    x: 0,
                    y: 0,
                    width: 10,
                    height: 10,
                },
                Region {
                    x: 40,
                    y: 0,
                    width: 10,
                    height: 10,
                },
            ],
        };
        let out = blur_faces(img, &default_opts(), &detector).unwrap().to_rgba8();
        let left = out.get_pixel(5, 5);
        let right = out.get_pixel(45, 5);
        assert!(left[0] > 10 && left[0] < 245);
        assert!(right[0] > 10 && right[0] < 245);
        // Midpoint between the two regions stays crisp.
        let mid = out.get_pixel(25, 5);
        assert!(mid[0] == 0 || mid[0] == 255);
    }

    #[test]
    fn test_remove_background_zeroes_alpha_outside_mask() {
        let img = checkerboard(10, 10);
        let segmenter = FixedMaskSegmenter {
            foreground: Region {
                x: 2,
                y: 2,
                width: 6,
                height: 6,
            },
        };
        let out = remove_background(img, &segmenter).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(5, 5)[3], 255);
    }
}
