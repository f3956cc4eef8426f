//! EXIF/ICC metadata: extraction for `info`/`metadata view`, structural
//! removal for `metadata strip`, and the orientation tag for auto-orient.

use std::io::Cursor;

use exif::{In, Tag};
use img_parts::{jpeg::Jpeg, png::Png, ImageEXIF, ImageICC};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::validator::ImageKind;

/// Basic image facts returned by the `info` tool.
#[derive(Debug, Serialize)]
pub struct ImageInfo {
    pub file: String,
    pub format: String,
    pub dimensions: String,
    pub width: u32,
    pub height: u32,
    pub mode: String,
    pub file_size: u64,
    pub file_size_human: String,
}

impl ImageInfo {
    pub fn new(
        filename: &str,
        kind: ImageKind,
        img: &image::DynamicImage,
        file_size: u64,
    ) -> Self {
        let (width, height) = (img.width(), img.height());
        Self {
            file: filename.to_string(),
            format: kind.to_string(),
            dimensions: format!("{} x {}", width, height),
            width,
            height,
            mode: color_mode(img.color()),
            file_size,
            file_size_human: format_file_size(file_size),
        }
    }
}

fn color_mode(color: image::ColorType) -> String {
    match color {
        image::ColorType::L8 => "L".to_string(),
        image::ColorType::La8 => "LA".to_string(),
        image::ColorType::Rgb8 => "RGB".to_string(),
        image::ColorType::Rgba8 => "RGBA".to_string(),
        image::ColorType::L16 => "L;16".to_string(),
        image::ColorType::La16 => "LA;16".to_string(),
        image::ColorType::Rgb16 => "RGB;16".to_string(),
        image::ColorType::Rgba16 => "RGBA;16".to_string(),
        other => format!("{:?}", other),
    }
}

pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Extract primary-image EXIF fields as a tag-name → display-string map.
/// Returns an empty map when the image carries no EXIF.
pub fn exif_fields(data: &[u8]) -> Map<String, Value> {
    let mut result = Map::new();
    let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(_) => return result,
    };

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        let value = field.display_value().with_unit(&exif).to_string();
        result.insert(field.tag.to_string(), Value::String(value));
    }
    result
}

/// Read the EXIF orientation tag (1-8), defaulting to 1 (normal) when absent.
pub fn exif_orientation(data: &[u8]) -> u8 {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .filter(|v| (1..=8).contains(v))
        .map(|v| v as u8)
        .unwrap_or(1)
}

/// Structurally remove EXIF and ICC chunks without re-encoding pixels.
///
/// Supported for JPEG and PNG containers; other formats return `None` and
/// the caller strips by re-encoding the decoded raster instead.
pub fn strip_metadata(data: &[u8], kind: ImageKind) -> Option<Vec<u8>> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(data.to_vec().into()).ok()?;
            jpeg.set_exif(None);
            jpeg.set_icc_profile(None);
            Some(jpeg.encoder().bytes().to_vec())
        }
        ImageKind::Png => {
            let mut png = Png::from_bytes(data.to_vec().into()).ok()?;
            png.set_exif(None);
            png.set_icc_profile(None);
            Some(png.encoder().bytes().to_vec())
        }
        _ => None,
    }
}
