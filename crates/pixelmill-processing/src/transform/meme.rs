//! Classic meme captions: uppercase text with a dark outline, wrapped and
//! centered near the top and bottom edges.

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};

use crate::codec::TransformError;
use crate::options::MemeOptions;

const FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub fn apply(
    img: DynamicImage,
    opts: &MemeOptions,
    font: &FontVec,
) -> Result<DynamicImage, TransformError> {
    let mut canvas = img.to_rgba8();
    let (w, h) = canvas.dimensions();

    let font_size = opts.font_size.unwrap_or_else(|| (w / 12).max(20));
    let scale = PxScale::from(font_size as f32);
    let outline_w = (font_size / 15).max(1) as i32;
    let margin = (w / 30) as i32;

    let line_height = text_size(scale, font, "Ay").1 as i32 + 4;

    for (text, is_top) in [(&opts.top_text, true), (&opts.bottom_text, false)] {
        let Some(text) = text else { continue };
        let text = text.to_uppercase();

        let max_width = (w as i32 - margin * 2).max(1) as u32;
        let lines = wrap_text(&text, font, scale, max_width);
        let block_h = line_height * lines.len() as i32;

        let y_start = if is_top {
            margin
        } else {
            h as i32 - block_h - margin
        };

        for (i, line) in lines.iter().enumerate() {
            let line_w = text_size(scale, font, line).0 as i32;
            let x = (w as i32 - line_w) / 2;
            let y = y_start + i as i32 * line_height;
            draw_outlined_text(&mut canvas, x, y, line, font, scale, outline_w);
        }
    }

    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Greedy word wrap against the rendered width.
fn wrap_text(text: &str, font: &FontVec, scale: PxScale, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_size(scale, font, &candidate).0 <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(current);
            }
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(text.to_string());
    }
    lines
}

/// Outline via offset passes, then the fill on top.
fn draw_outlined_text(
    canvas: &mut RgbaImage,
    x: i32,
    y: i32,
    text: &str,
    font: &FontVec,
    scale: PxScale,
    outline_w: i32,
) {
    for dx in -outline_w..=outline_w {
        for dy in -outline_w..=outline_w {
            if dx != 0 || dy != 0 {
                draw_text_mut(canvas, OUTLINE, x + dx, y + dy, scale, font, text);
            }
        }
    }
    draw_text_mut(canvas, FILL, x, y, scale, font, text);
}
