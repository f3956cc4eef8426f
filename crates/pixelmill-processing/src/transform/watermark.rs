//! Text watermarking.

use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::codec::TransformError;
use crate::options::{WatermarkOptions, WatermarkPosition};
use crate::transform::orientation;

const MARGIN: i64 = 10;
const TILE_PADDING: u32 = 20;
const TILE_SPACING: u32 = 40;

pub fn apply(
    img: DynamicImage,
    opts: &WatermarkOptions,
    font: &FontVec,
) -> Result<DynamicImage, TransformError> {
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();

    let scale = PxScale::from(opts.font_size as f32);
    let (text_w, text_h) = text_size(scale, font, &opts.text);
    let alpha = (opts.opacity * 255.0).round() as u8;
    let color = Rgba([opts.color.0, opts.color.1, opts.color.2, alpha]);

    // Text is drawn onto its own transparent layer and alpha-composited so
    // the opacity applies to the text, not the underlying pixels.
    let mut stamp = RgbaImage::new(text_w + TILE_PADDING, text_h + TILE_PADDING);
    draw_text_mut(
        &mut stamp,
        color,
        (TILE_PADDING / 2) as i32,
        (TILE_PADDING / 2) as i32,
        scale,
        font,
        &opts.text,
    );

    if opts.tile {
        let stamp = if opts.angle != 0.0 {
            orientation::rotate_expand(&stamp, opts.angle)
        } else {
            stamp
        };
        let (stamp_w, stamp_h) = stamp.dimensions();
        let step_x = (stamp_w + TILE_SPACING) as i64;
        let step_y = (stamp_h + TILE_SPACING) as i64;

        let mut y = -(stamp_h as i64);
        while y < h as i64 + stamp_h as i64 {
            let mut x = -(stamp_w as i64);
            while x < w as i64 + stamp_w as i64 {
                imageops::overlay(&mut canvas, &stamp, x, y);
                x += step_x;
            }
            y += step_y;
        }
    } else {
        let (x, y) = position_for(
            opts.position,
            w as i64,
            h as i64,
            text_w as i64,
            text_h as i64,
        );
        // The stamp carries its own padding; compensate so the text lands at
        // the computed position.
        let pad = (TILE_PADDING / 2) as i64;
        imageops::overlay(&mut canvas, &stamp, x - pad, y - pad);
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}

fn position_for(position: WatermarkPosition, w: i64, h: i64, tw: i64, th: i64) -> (i64, i64) {
    let (x, y) = match position {
        WatermarkPosition::Center => ((w - tw) / 2, (h - th) / 2),
        WatermarkPosition::TopLeft => (MARGIN, MARGIN),
        WatermarkPosition::TopRight => (w - tw - MARGIN, MARGIN),
        WatermarkPosition::BottomLeft => (MARGIN, h - th - MARGIN),
        WatermarkPosition::BottomRight => (w - tw - MARGIN, h - th - MARGIN),
        WatermarkPosition::Top => ((w - tw) / 2, MARGIN),
        WatermarkPosition::Bottom => ((w - tw) / 2, h - th - MARGIN),
    };
    (x.max(0), y.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts;
    use crate::options::Rgb;

    fn white_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
    }

    fn opts(text: &str) -> WatermarkOptions {
        WatermarkOptions {
            text: text.to_string(),
            position: WatermarkPosition::Center,
            opacity: 1.0,
            font_size: 24,
            color: Rgb::BLACK,
            tile: false,
            angle: 0.0,
        }
    }

    #[test]
    fn test_position_for_corners() {
        assert_eq!(
            position_for(WatermarkPosition::TopLeft, 200, 100, 50, 20),
            (10, 10)
        );
        assert_eq!(
            position_for(WatermarkPosition::BottomRight, 200, 100, 50, 20),
            (140, 70)
        );
        assert_eq!(
            position_for(WatermarkPosition::Center, 200, 100, 50, 20),
            (75, 40)
        );
        assert_eq!(
            position_for(WatermarkPosition::Top, 200, 100, 50, 20),
            (75, 10)
        );
        assert_eq!(
            position_for(WatermarkPosition::Bottom, 200, 100, 50, 20),
            (75, 70)
        );
    }

    #[test]
    fn test_position_never_negative_for_oversized_text() {
        assert_eq!(
            position_for(WatermarkPosition::BottomRight, 40, 20, 100, 50),
            (0, 0)
        );
    }

    #[test]
    fn test_watermark_darkens_some_pixels() {
        let Ok(font) = fonts::shared_font(None) else {
            return; // no usable font on this machine
        };
        let out = apply(white_image(200, 100), &opts("WM"), font)
            .unwrap()
            .to_rgba8();
        let touched = out.pixels().filter(|p| p[0] < 250).count();
        assert!(touched > 0, "expected the watermark to touch pixels");
    }

    #[test]
    fn test_watermark_keeps_dimensions() {
        let Ok(font) = fonts::shared_font(None) else {
            return;
        };
        let out = apply(white_image(120, 80), &opts("hello"), font).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
    }

    #[test]
    fn test_tiled_watermark_touches_all_quadrants() {
        let Ok(font) = fonts::shared_font(None) else {
            return;
        };
        let mut o = opts("x");
        o.tile = true;
        let out = apply(white_image(400, 400), &o, font).unwrap().to_rgba8();

        let quadrant_touched = |x0: u32, y0: u32| {
            (y0..y0 + 200)
                .any(|y| (x0..x0 + 200).any(|x| out.get_pixel(x, y)[0] < 250))
        };
        assert!(quadrant_touched(0, 0));
        assert!(quadrant_touched(200, 0));
        assert!(quadrant_touched(0, 200));
        assert!(quadrant_touched(200, 200));
    }
}
