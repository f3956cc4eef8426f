//! Crop by explicit rectangle or derived aspect ratio.

use image::DynamicImage;

use crate::codec::TransformError;
use crate::options::{CropOptions, CropSpec};

pub fn apply(img: DynamicImage, opts: &CropOptions) -> Result<DynamicImage, TransformError> {
    let (img_w, img_h) = (img.width(), img.height());

    match opts.spec {
        CropSpec::Free {
            x,
            y,
            width,
            height,
        } => {
            // The rectangle must lie fully within the source; out of
            // bounds is an error, never a silent clamp.
            let exceeds_w = x.checked_add(width).map(|r| r > img_w).unwrap_or(true);
            let exceeds_h = y.checked_add(height).map(|b| b > img_h).unwrap_or(true);
            if exceeds_w || exceeds_h {
                return Err(TransformError::InvalidOption {
                    field: "crop".to_string(),
                    reason: format!(
                        "rectangle {}x{}+{}+{} exceeds image bounds {}x{}",
                        width, height, x, y, img_w, img_h
                    ),
                });
            }
            Ok(img.crop_imm(x, y, width, height))
        }
        CropSpec::Ratio { num, den } => {
            let target_ratio = num as f32 / den as f32;
            let img_ratio = img_w as f32 / img_h as f32;

            let (crop_w, crop_h) = if img_ratio > target_ratio {
                // Image is wider than the target ratio
                (((img_h as f32 * target_ratio) as u32).max(1), img_h)
            } else {
                (img_w, ((img_w as f32 / target_ratio) as u32).max(1))
            };

            let crop_x = (img_w - crop_w) / 2;
            let crop_y = (img_h - crop_h) / 2;
            Ok(img.crop_imm(crop_x, crop_y, crop_w, crop_h))
        }
    }
}
