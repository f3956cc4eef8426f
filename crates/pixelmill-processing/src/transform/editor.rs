//! The combinable photo editor: adjustments, filter presets, borders,
//! frames, flips and thumbnailing.
//!
//! Application order is fixed: auto-enhance → brightness → contrast →
//! saturation → sharpness → filter → border → frame → flip → thumbnail.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::codec::TransformError;
use crate::options::{EditFilter, EditFrame, EditOptions, FlipDirection, Rgb};

pub fn apply(img: DynamicImage, opts: &EditOptions) -> Result<DynamicImage, TransformError> {
    let mut canvas = img.to_rgba8();

    if opts.auto_enhance {
        canvas = auto_contrast(&canvas, 0.01);
    }
    if opts.brightness != 1.0 {
        canvas = brightness(&canvas, opts.brightness);
    }
    if opts.contrast != 1.0 {
        canvas = contrast(&canvas, opts.contrast);
    }
    if opts.saturation != 1.0 {
        canvas = saturation(&canvas, opts.saturation);
    }
    if opts.sharpness != 1.0 {
        canvas = sharpness(&canvas, opts.sharpness);
    }

    canvas = match opts.filter {
        EditFilter::None => canvas,
        EditFilter::Grayscale => grayscale(&canvas),
        EditFilter::Sepia => sepia(&canvas),
        EditFilter::Blur => imageops::blur(&canvas, 3.0),
        EditFilter::Sharpen => convolve3x3(
            &canvas,
            [-2.0, -2.0, -2.0, -2.0, 32.0, -2.0, -2.0, -2.0, -2.0],
            16.0,
            0.0,
        ),
        EditFilter::Edge => convolve3x3(
            &canvas,
            [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0],
            1.0,
            255.0,
        ),
        EditFilter::Emboss => convolve3x3(
            &canvas,
            [-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            1.0,
            128.0,
        ),
        EditFilter::Invert => invert(&canvas),
    };

    if opts.border_width > 0 {
        canvas = border(&canvas, opts.border_width, opts.border_color);
    }

    canvas = match opts.frame {
        EditFrame::None => canvas,
        EditFrame::Polaroid => frame_polaroid(&canvas),
        EditFrame::Rounded => frame_rounded(&canvas),
        EditFrame::Shadow => frame_shadow(&canvas),
    };

    canvas = match opts.flip {
        FlipDirection::None => canvas,
        FlipDirection::Horizontal => imageops::flip_horizontal(&canvas),
        FlipDirection::Vertical => imageops::flip_vertical(&canvas),
        FlipDirection::Both => imageops::flip_vertical(&imageops::flip_horizontal(&canvas)),
    };

    if let Some(size) = opts.thumbnail {
        canvas = thumbnail(&canvas, size);
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn luminance(p: &Rgba<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

/// Per-channel histogram stretch ignoring `cutoff` of the extremes.
fn auto_contrast(img: &RgbaImage, cutoff: f32) -> RgbaImage {
    let total = (img.width() * img.height()) as u64;
    if total == 0 {
        return img.clone();
    }
    let threshold = (total as f32 * cutoff) as u64;

    let mut bounds = [(0u8, 255u8); 3];
    for (channel, bound) in bounds.iter_mut().enumerate() {
        let mut histogram = [0u64; 256];
        for p in img.pixels() {
            histogram[p[channel] as usize] += 1;
        }

        let mut lo = 0usize;
        let mut seen = 0u64;
        for (value, count) in histogram.iter().enumerate() {
            seen += count;
            if seen > threshold {
                lo = value;
                break;
            }
        }

        let mut hi = 255usize;
        let mut seen = 0u64;
        for (value, count) in histogram.iter().enumerate().rev() {
            seen += count;
            if seen > threshold {
                hi = value;
                break;
            }
        }

        *bound = (lo as u8, hi as u8);
    }

    map_rgb(img, |channel, value| {
        let (lo, hi) = bounds[channel];
        if hi <= lo {
            value
        } else {
            clamp_u8((value as f32 - lo as f32) * 255.0 / (hi as f32 - lo as f32))
        }
    })
}

fn brightness(img: &RgbaImage, factor: f32) -> RgbaImage {
    map_rgb(img, |_, value| clamp_u8(value as f32 * factor))
}

/// Interpolate between mean-luminance gray and the image.
fn contrast(img: &RgbaImage, factor: f32) -> RgbaImage {
    let total = (img.width() * img.height()) as f32;
    if total == 0.0 {
        return img.clone();
    }
    let mean: f32 = img.pixels().map(luminance).sum::<f32>() / total;

    map_rgb(img, |_, value| {
        clamp_u8(mean + factor * (value as f32 - mean))
    })
}

/// Interpolate between the per-pixel gray and the image.
fn saturation(img: &RgbaImage, factor: f32) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let gray = luminance(p);
        for c in 0..3 {
            p[c] = clamp_u8(gray + factor * (p[c] as f32 - gray));
        }
    }
    out
}

/// Interpolate between a smoothed copy and the image.
fn sharpness(img: &RgbaImage, factor: f32) -> RgbaImage {
    let blurred = imageops::blur(img, 1.0);
    let mut out = img.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        let soft = blurred.get_pixel(x, y);
        for c in 0..3 {
            p[c] = clamp_u8(soft[c] as f32 + factor * (p[c] as f32 - soft[c] as f32));
        }
    }
    out
}

fn grayscale(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let gray = clamp_u8(luminance(p));
        p[0] = gray;
        p[1] = gray;
        p[2] = gray;
    }
    out
}

fn sepia(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        let gray = luminance(p);
        p[0] = clamp_u8(gray * 1.2);
        p[1] = clamp_u8(gray);
        p[2] = clamp_u8(gray * 0.8);
    }
    out
}

fn invert(img: &RgbaImage) -> RgbaImage {
    map_rgb(img, |_, value| 255 - value)
}

fn map_rgb(img: &RgbaImage, f: impl Fn(usize, u8) -> u8) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        for c in 0..3 {
            p[c] = f(c, p[c]);
        }
    }
    out
}

/// 3x3 convolution over the color channels with replicated borders; alpha is
/// carried through untouched.
fn convolve3x3(img: &RgbaImage, kernel: [f32; 9], scale: f32, offset: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        let mut sums = [0.0f32; 3];
        for ky in 0..3i64 {
            for kx in 0..3i64 {
                let sx = (x as i64 + kx - 1).clamp(0, w as i64 - 1) as u32;
                let sy = (y as i64 + ky - 1).clamp(0, h as i64 - 1) as u32;
                let p = img.get_pixel(sx, sy);
                let k = kernel[(ky * 3 + kx) as usize];
                for c in 0..3 {
                    sums[c] += p[c] as f32 * k;
                }
            }
        }
        let alpha = img.get_pixel(x, y)[3];
        Rgba([
            clamp_u8(sums[0] / scale + offset),
            clamp_u8(sums[1] / scale + offset),
            clamp_u8(sums[2] / scale + offset),
            alpha,
        ])
    })
}

fn border(img: &RgbaImage, width: u32, color: Rgb) -> RgbaImage {
    let (w, h) = img.dimensions();
    let mut canvas = RgbaImage::from_pixel(
        w + width * 2,
        h + width * 2,
        Rgba([color.0, color.1, color.2, 255]),
    );
    imageops::overlay(&mut canvas, img, width as i64, width as i64);
    canvas
}

/// White frame with a thicker bottom strip over a light backdrop.
fn frame_polaroid(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let side = (w.min(h) * 4 / 100).max(10);
    let bottom = side * 3;

    let frame_w = w + side * 2;
    let frame_h = h + side + bottom;
    let mut canvas = RgbaImage::from_pixel(frame_w + 6, frame_h + 6, Rgba([240, 240, 240, 255]));

    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(6, 6).of_size(frame_w, frame_h),
        Rgba([204, 204, 204, 255]),
    );
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(0, 0).of_size(frame_w, frame_h),
        Rgba([250, 250, 250, 255]),
    );
    imageops::overlay(&mut canvas, img, side as i64, side as i64);
    canvas
}

/// Rounded corners composited onto a white background.
fn frame_rounded(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let radius = (w.min(h) * 5 / 100).max(8) as f32;

    RgbaImage::from_fn(w, h, |x, y| {
        let p = *img.get_pixel(x, y);
        if corner_distance(x as f32, y as f32, w as f32, h as f32, radius) {
            // Outside the rounded rectangle: white
            Rgba([255, 255, 255, 255])
        } else {
            let mut p = p;
            p[3] = 255;
            p
        }
    })
}

/// True when (x, y) falls outside the rounded-rect corner arc.
fn corner_distance(x: f32, y: f32, w: f32, h: f32, radius: f32) -> bool {
    let cx = if x < radius {
        radius
    } else if x > w - radius {
        w - radius
    } else {
        return false;
    };
    let cy = if y < radius {
        radius
    } else if y > h - radius {
        h - radius
    } else {
        return false;
    };
    let dx = x + 0.5 - cx;
    let dy = y + 0.5 - cy;
    dx * dx + dy * dy > radius * radius
}

/// Soft drop shadow under the image on a light backdrop.
fn frame_shadow(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let offset = (w.min(h) * 2 / 100).max(5);
    let padding = offset * 3;

    let mut canvas = RgbaImage::from_pixel(
        w + padding * 2,
        h + padding * 2,
        Rgba([245, 245, 245, 255]),
    );
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at((padding + offset) as i32, (padding + offset) as i32).of_size(w, h),
        Rgba([136, 136, 136, 255]),
    );
    let mut canvas = imageops::blur(&canvas, offset as f32);
    imageops::overlay(&mut canvas, img, padding as i64, padding as i64);
    canvas
}

/// Square center-crop, then resize to `size` x `size`.
fn thumbnail(img: &RgbaImage, size: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let short = w.min(h);
    let left = (w - short) / 2;
    let top = (h - short) / 2;
    let square = imageops::crop_imm(img, left, top, short, short).to_image();
    imageops::resize(&square, size, size, FilterType::Lanczos3)
}
