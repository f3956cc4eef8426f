//! Per-tool option resolution.
//!
//! Raw multipart form fields arrive as a flat string map. This module turns
//! that map into one typed, defaulted, validated `ToolOptions` variant per
//! tool and never lets the raw map escape past this boundary.
//!
//! Parsing policy: numeric fields fall back to their documented default when
//! absent or unparsable; values that parse but violate a documented range
//! fail with `OptionError::Invalid`. Enum-valued fields default when absent
//! and fail on unknown values. Unknown keys are ignored.

use std::collections::BTreeMap;

use crate::detector::Region;
use crate::validator::ImageKind;
use pixelmill_core::ToolId;

/// Raw string-keyed option fields from the multipart form.
pub type RawOptions = BTreeMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum OptionError {
    #[error("Invalid option '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl OptionError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        OptionError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// An RGB color parsed from a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    /// Parse `#rgb` / `#rrggbb` hex or one of the basic CSS color names.
    pub fn parse(s: &str) -> Option<Rgb> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "white" => return Some(Rgb::WHITE),
            "black" => return Some(Rgb::BLACK),
            "red" => return Some(Rgb(255, 0, 0)),
            "green" => return Some(Rgb(0, 128, 0)),
            "blue" => return Some(Rgb(0, 0, 255)),
            "yellow" => return Some(Rgb(255, 255, 0)),
            "gray" | "grey" => return Some(Rgb(128, 128, 128)),
            _ => {}
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return None;
        }
        match hex.len() {
            3 => {
                let mut c = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let v = ch.to_digit(16)? as u8;
                    c[i] = v * 16 + v;
                }
                Some(Rgb(c[0], c[1], c[2]))
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Rgb(r, g, b))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    Dimensions {
        width: Option<u32>,
        height: Option<u32>,
    },
    Percentage(f32),
    /// Target encoded output size in kilobytes.
    MaxSizeKb(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOptions {
    pub mode: ResizeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropSpec {
    /// Caller-supplied rectangle; must lie within the source bounds.
    Free {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    /// Center-anchored rectangle of the given ratio, derived from the source.
    Ratio { num: u32, den: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropOptions {
    pub spec: CropSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateOptions {
    /// Degrees clockwise, in [-360, 360]. Applied after auto-orientation.
    pub degrees: i32,
    pub auto_orient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub target: ImageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataAction {
    View,
    Strip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataOptions {
    pub action: MetadataAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkPosition {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    pub position: WatermarkPosition,
    pub opacity: f32,
    pub font_size: u32,
    pub color: Rgb,
    /// Repeat the text across the whole canvas; position is ignored.
    pub tile: bool,
    /// Rotation of the tiled text block, degrees.
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurFaceOptions {
    pub strength: u32,
    /// Manual region bypassing detection.
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleOptions {
    pub scale: u32,
    pub sharpen: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemeOptions {
    pub top_text: Option<String>,
    pub bottom_text: Option<String>,
    /// Explicit font size; auto-sized from the image width when unset.
    pub font_size: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFilter {
    None,
    Grayscale,
    Sepia,
    Blur,
    Sharpen,
    Edge,
    Emboss,
    Invert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditFrame {
    None,
    Polaroid,
    Rounded,
    Shadow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    None,
    Horizontal,
    Vertical,
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditOptions {
    pub auto_enhance: bool,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub sharpness: f32,
    pub filter: EditFilter,
    pub frame: EditFrame,
    pub border_width: u32,
    pub border_color: Rgb,
    pub flip: FlipDirection,
    pub thumbnail: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressOptions {
    pub quality: u8,
}

/// Typed, validated options for one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOptions {
    Compress(CompressOptions),
    Resize(ResizeOptions),
    Crop(CropOptions),
    Rotate(RotateOptions),
    Convert(ConvertOptions),
    Info,
    Metadata(MetadataOptions),
    Watermark(WatermarkOptions),
    BlurFace(BlurFaceOptions),
    RemoveBg,
    Upscale(UpscaleOptions),
    Meme(MemeOptions),
    Edit(EditOptions),
}

impl ToolOptions {
    pub fn resolve(tool: ToolId, raw: &RawOptions) -> Result<ToolOptions, OptionError> {
        match tool {
            ToolId::Compress => resolve_compress(raw),
            ToolId::Resize => resolve_resize(raw),
            ToolId::Crop => resolve_crop(raw),
            ToolId::Rotate => resolve_rotate(raw),
            ToolId::Convert => resolve_convert(raw),
            ToolId::Info => Ok(ToolOptions::Info),
            ToolId::Metadata => resolve_metadata(raw),
            ToolId::Watermark => resolve_watermark(raw),
            ToolId::BlurFace => resolve_blur_face(raw),
            ToolId::RemoveBg => Ok(ToolOptions::RemoveBg),
            ToolId::Upscale => resolve_upscale(raw),
            ToolId::Meme => resolve_meme(raw),
            ToolId::Edit => resolve_edit(raw),
        }
    }
}

// Field accessors. A missing key and an unparsable value behave the same:
// the caller's documented default applies. Keys are canonically snake_case;
// the kebab-case spelling is accepted as an alias.

fn opt_str<'a>(raw: &'a RawOptions, key: &str) -> Option<&'a str> {
    raw.get(key)
        .or_else(|| {
            if key.contains('_') {
                raw.get(&key.replace('_', "-"))
            } else {
                None
            }
        })
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn opt_u32(raw: &RawOptions, key: &str) -> Option<u32> {
    opt_str(raw, key).and_then(|s| s.parse().ok())
}

fn opt_i32(raw: &RawOptions, key: &str) -> Option<i32> {
    opt_str(raw, key).and_then(|s| s.parse().ok())
}

fn opt_f32(raw: &RawOptions, key: &str) -> Option<f32> {
    opt_str(raw, key)
        .and_then(|s| s.parse::<f32>().ok())
        .filter(|f| f.is_finite())
}

fn opt_bool(raw: &RawOptions, key: &str) -> bool {
    opt_str(raw, key)
        .map(|s| {
            matches!(
                s.to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

fn opt_color(raw: &RawOptions, key: &str, default: Rgb) -> Result<Rgb, OptionError> {
    match opt_str(raw, key) {
        None => Ok(default),
        Some(s) => Rgb::parse(s)
            .ok_or_else(|| OptionError::new(key, format!("unknown color '{}'", s))),
    }
}

fn resolve_compress(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let quality = opt_u32(raw, "quality").unwrap_or(80);
    if !(1..=100).contains(&quality) {
        return Err(OptionError::new(
            "quality",
            format!("must be between 1 and 100, got {}", quality),
        ));
    }
    Ok(ToolOptions::Compress(CompressOptions {
        quality: quality as u8,
    }))
}

const MAX_RESIZE_PERCENTAGE: f32 = 1000.0;

fn resolve_resize(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    // Mode precedence when several mode fields are present:
    // percentage, then max_kb, then dimensions.
    let mode = if let Some(pct) = opt_f32(raw, "percentage") {
        if pct <= 0.0 || pct > MAX_RESIZE_PERCENTAGE {
            return Err(OptionError::new(
                "percentage",
                format!("must be > 0 and <= {}, got {}", MAX_RESIZE_PERCENTAGE, pct),
            ));
        }
        ResizeMode::Percentage(pct)
    } else if let Some(max_kb) = opt_u32(raw, "max_kb") {
        if max_kb == 0 {
            return Err(OptionError::new("max_kb", "must be a positive integer"));
        }
        ResizeMode::MaxSizeKb(max_kb)
    } else {
        let width = opt_u32(raw, "width");
        let height = opt_u32(raw, "height");
        if width.is_none() && height.is_none() {
            return Err(OptionError::new(
                "width",
                "specify width/height, percentage, or max_kb",
            ));
        }
        if width == Some(0) {
            return Err(OptionError::new("width", "must be a positive integer"));
        }
        if height == Some(0) {
            return Err(OptionError::new("height", "must be a positive integer"));
        }
        ResizeMode::Dimensions { width, height }
    };
    Ok(ToolOptions::Resize(ResizeOptions { mode }))
}

fn resolve_crop(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let spec = match opt_str(raw, "aspect") {
        None | Some("free") => {
            let x = require_u32(raw, "x")?;
            let y = require_u32(raw, "y")?;
            let width = require_u32(raw, "width")?;
            let height = require_u32(raw, "height")?;
            if width == 0 || height == 0 {
                return Err(OptionError::new(
                    "width",
                    "crop rectangle must have positive width and height",
                ));
            }
            CropSpec::Free {
                x,
                y,
                width,
                height,
            }
        }
        Some("1:1") => CropSpec::Ratio { num: 1, den: 1 },
        Some("16:9") => CropSpec::Ratio { num: 16, den: 9 },
        Some("4:3") => CropSpec::Ratio { num: 4, den: 3 },
        Some("3:2") => CropSpec::Ratio { num: 3, den: 2 },
        Some(other) => {
            return Err(OptionError::new(
                "aspect",
                format!("must be one of free, 1:1, 16:9, 4:3, 3:2; got '{}'", other),
            ))
        }
    };
    Ok(ToolOptions::Crop(CropOptions { spec }))
}

fn require_u32(raw: &RawOptions, key: &str) -> Result<u32, OptionError> {
    match opt_str(raw, key) {
        None => Err(OptionError::new(
            key,
            "required for a free crop (non-negative integer)",
        )),
        Some(s) => s
            .parse()
            .map_err(|_| OptionError::new(key, format!("not a non-negative integer: '{}'", s))),
    }
}

fn resolve_rotate(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let degrees = opt_i32(raw, "degrees").unwrap_or(0);
    if !(-360..=360).contains(&degrees) {
        return Err(OptionError::new(
            "degrees",
            format!("must be between -360 and 360, got {}", degrees),
        ));
    }
    let auto_orient = opt_bool(raw, "auto");
    Ok(ToolOptions::Rotate(RotateOptions {
        degrees,
        auto_orient,
    }))
}

fn resolve_convert(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let target = match opt_str(raw, "format") {
        None => ImageKind::Png,
        Some(s) => ImageKind::from_name(s).ok_or_else(|| {
            OptionError::new(
                "format",
                format!("must be one of jpg, png, webp, gif, bmp, tiff; got '{}'", s),
            )
        })?,
    };
    Ok(ToolOptions::Convert(ConvertOptions { target }))
}

fn resolve_metadata(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let action = match opt_str(raw, "action") {
        None | Some("view") => MetadataAction::View,
        Some("strip") => MetadataAction::Strip,
        Some(other) => {
            return Err(OptionError::new(
                "action",
                format!("must be 'view' or 'strip', got '{}'", other),
            ))
        }
    };
    Ok(ToolOptions::Metadata(MetadataOptions { action }))
}

fn resolve_watermark(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let text = opt_str(raw, "text")
        .map(sanitize_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| OptionError::new("text", "required and must be non-empty"))?;

    let position = match opt_str(raw, "position") {
        None | Some("center") => WatermarkPosition::Center,
        Some("top-left") => WatermarkPosition::TopLeft,
        Some("top-right") => WatermarkPosition::TopRight,
        Some("bottom-left") => WatermarkPosition::BottomLeft,
        Some("bottom-right") => WatermarkPosition::BottomRight,
        Some("top") => WatermarkPosition::Top,
        Some("bottom") => WatermarkPosition::Bottom,
        Some(other) => {
            return Err(OptionError::new(
                "position",
                format!("unknown position '{}'", other),
            ))
        }
    };

    let opacity = opt_f32(raw, "opacity").unwrap_or(0.5);
    if !(0.0..=1.0).contains(&opacity) {
        return Err(OptionError::new(
            "opacity",
            format!("must be between 0 and 1, got {}", opacity),
        ));
    }

    let font_size = opt_u32(raw, "font_size").unwrap_or(24);
    if font_size == 0 {
        return Err(OptionError::new("font_size", "must be a positive integer"));
    }

    let color = opt_color(raw, "color", Rgb::WHITE)?;
    let tile = opt_bool(raw, "tile");
    let angle = opt_f32(raw, "angle").unwrap_or(0.0);

    Ok(ToolOptions::Watermark(WatermarkOptions {
        text,
        position,
        opacity,
        font_size,
        color,
        tile,
        angle,
    }))
}

fn resolve_blur_face(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let strength = opt_u32(raw, "strength").unwrap_or(25);
    if !(5..=99).contains(&strength) {
        return Err(OptionError::new(
            "strength",
            format!("must be between 5 and 99, got {}", strength),
        ));
    }

    let region = match opt_str(raw, "region") {
        None => None,
        Some(s) => {
            let parts: Vec<u32> = s
                .split(',')
                .map(|p| p.trim().parse())
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    OptionError::new("region", format!("must be x,y,w,h integers, got '{}'", s))
                })?;
            if parts.len() != 4 {
                return Err(OptionError::new(
                    "region",
                    "must be four comma-separated integers: x,y,w,h",
                ));
            }
            if parts[2] == 0 || parts[3] == 0 {
                return Err(OptionError::new(
                    "region",
                    "region width and height must be positive",
                ));
            }
            Some(Region {
                x: parts[0],
                y: parts[1],
                width: parts[2],
                height: parts[3],
            })
        }
    };

    Ok(ToolOptions::BlurFace(BlurFaceOptions { strength, region }))
}

fn resolve_upscale(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let scale = opt_u32(raw, "scale").unwrap_or(2);
    if scale != 2 && scale != 4 {
        return Err(OptionError::new(
            "scale",
            format!("must be 2 or 4, got {}", scale),
        ));
    }
    let sharpen = opt_bool(raw, "sharpen");
    Ok(ToolOptions::Upscale(UpscaleOptions { scale, sharpen }))
}

fn resolve_meme(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let top_text = opt_str(raw, "top_text")
        .map(sanitize_text)
        .filter(|t| !t.is_empty());
    let bottom_text = opt_str(raw, "bottom_text")
        .map(sanitize_text)
        .filter(|t| !t.is_empty());

    if top_text.is_none() && bottom_text.is_none() {
        return Err(OptionError::new(
            "top_text",
            "at least one of top_text and bottom_text must be non-empty",
        ));
    }

    let font_size = opt_u32(raw, "font_size");
    if font_size == Some(0) {
        return Err(OptionError::new("font_size", "must be a positive integer"));
    }

    Ok(ToolOptions::Meme(MemeOptions {
        top_text,
        bottom_text,
        font_size,
    }))
}

const MIN_THUMBNAIL: u32 = 16;
const MAX_THUMBNAIL: u32 = 4096;

fn resolve_edit(raw: &RawOptions) -> Result<ToolOptions, OptionError> {
    let brightness = edit_factor(raw, "brightness")?;
    let contrast = edit_factor(raw, "contrast")?;
    let saturation = edit_factor(raw, "saturation")?;
    let sharpness = edit_factor(raw, "sharpness")?;

    let filter = match opt_str(raw, "filter") {
        None | Some("none") => EditFilter::None,
        Some("grayscale") => EditFilter::Grayscale,
        Some("sepia") => EditFilter::Sepia,
        Some("blur") => EditFilter::Blur,
        Some("sharpen") => EditFilter::Sharpen,
        Some("edge") => EditFilter::Edge,
        Some("emboss") => EditFilter::Emboss,
        Some("invert") => EditFilter::Invert,
        Some(other) => {
            return Err(OptionError::new(
                "filter",
                format!("unknown filter '{}'", other),
            ))
        }
    };

    let frame = match opt_str(raw, "frame") {
        None | Some("none") => EditFrame::None,
        Some("polaroid") => EditFrame::Polaroid,
        Some("rounded") => EditFrame::Rounded,
        Some("shadow") => EditFrame::Shadow,
        Some(other) => {
            return Err(OptionError::new(
                "frame",
                format!("unknown frame '{}'", other),
            ))
        }
    };

    let border_width = opt_u32(raw, "border_width").unwrap_or(0);
    let border_color = opt_color(raw, "border_color", Rgb::BLACK)?;

    let flip = match opt_str(raw, "flip") {
        None | Some("none") => FlipDirection::None,
        Some("horizontal") => FlipDirection::Horizontal,
        Some("vertical") => FlipDirection::Vertical,
        Some("both") => FlipDirection::Both,
        Some(other) => {
            return Err(OptionError::new(
                "flip",
                format!("must be none, horizontal, vertical or both; got '{}'", other),
            ))
        }
    };

    let thumbnail = match opt_u32(raw, "thumbnail") {
        None => None,
        Some(size) if (MIN_THUMBNAIL..=MAX_THUMBNAIL).contains(&size) => Some(size),
        Some(size) => {
            return Err(OptionError::new(
                "thumbnail",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_THUMBNAIL, MAX_THUMBNAIL, size
                ),
            ))
        }
    };

    let auto_enhance = opt_bool(raw, "auto_enhance");

    Ok(ToolOptions::Edit(EditOptions {
        auto_enhance,
        brightness,
        contrast,
        saturation,
        sharpness,
        filter,
        frame,
        border_width,
        border_color,
        flip,
        thumbnail,
    }))
}

fn edit_factor(raw: &RawOptions, key: &str) -> Result<f32, OptionError> {
    let value = opt_f32(raw, key).unwrap_or(1.0);
    if !(0.0..=3.0).contains(&value) {
        return Err(OptionError::new(
            key,
            format!("must be between 0 and 3, got {}", value),
        ));
    }
    Ok(value)
}

const MAX_TEXT_LEN: usize = 500;

/// Strip control characters and cap the length of user-supplied text.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .take(MAX_TEXT_LEN)
        .collect()
}
