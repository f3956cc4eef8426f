//! Rotation and EXIF auto-orientation.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use crate::metadata;

/// Apply EXIF orientation correction to an image.
///
/// The orientation tag is read from the original container bytes; re-encoding
/// the result drops the tag, so pixels and metadata stay consistent.
pub fn auto_orient(mut img: DynamicImage, source: &[u8]) -> DynamicImage {
    let orientation = metadata::exif_orientation(source);
    let (rotate, flip_h, flip_v) = orientation_transforms(orientation);

    tracing::debug!(
        orientation = orientation,
        rotate = ?rotate,
        flip_horizontal = flip_h,
        flip_vertical = flip_v,
        "Applying EXIF orientation"
    );

    // Apply rotation first
    if let Some(angle) = rotate {
        img = rotate_quarter(img, angle);
    }

    // Then apply flips
    if flip_h {
        img = DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()));
    }
    if flip_v {
        img = DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()));
    }

    img
}

/// Get rotation and flip operations needed for a given EXIF orientation.
/// Returns (rotate_angle, flip_horizontal, flip_vertical).
pub fn orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
    match orientation {
        1 => (None, false, false),      // Normal
        2 => (None, true, false),       // Mirror horizontal
        3 => (Some(180), false, false), // Rotate 180
        4 => (None, false, true),       // Mirror vertical
        5 => (Some(270), true, false),  // Mirror horizontal + Rotate 270 CW
        6 => (Some(90), false, false),  // Rotate 90 CW
        7 => (Some(90), true, false),   // Mirror horizontal + Rotate 90 CW
        8 => (Some(270), false, false), // Rotate 270 CW
        _ => (None, false, false),      // Invalid, treat as normal
    }
}

/// Rotate by a caller-supplied angle, degrees clockwise in [-360, 360].
///
/// Quarter turns are lossless; other angles rotate about the center onto an
/// expanded canvas with a transparent background.
pub fn rotate_degrees(img: DynamicImage, degrees: i32) -> DynamicImage {
    let normalized = degrees.rem_euclid(360);
    match normalized {
        0 => img,
        90 => rotate_quarter(img, 90),
        180 => rotate_quarter(img, 180),
        270 => rotate_quarter(img, 270),
        _ => DynamicImage::ImageRgba8(rotate_expand(&img.to_rgba8(), normalized as f32)),
    }
}

fn rotate_quarter(img: DynamicImage, angle: u16) -> DynamicImage {
    match angle {
        90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
        180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
        270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
        _ => img,
    }
}

/// Rotate clockwise by an arbitrary angle onto a canvas large enough to hold
/// the whole rotated image.
pub fn rotate_expand(img: &RgbaImage, degrees: f32) -> RgbaImage {
    let theta = degrees.to_radians();
    let (w, h) = (img.width() as f32, img.height() as f32);
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let new_w = (w * cos + h * sin).ceil() as u32;
    let new_h = (w * sin + h * cos).ceil() as u32;

    let mut canvas = RgbaImage::from_pixel(new_w.max(1), new_h.max(1), Rgba([0, 0, 0, 0]));
    let dx = ((new_w - img.width()) / 2) as i64;
    let dy = ((new_h - img.height()) / 2) as i64;
    imageops::overlay(&mut canvas, img, dx, dy);

    rotate_about_center(&canvas, theta, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
}
