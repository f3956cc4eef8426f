//! Decode/encode adapter between validated byte buffers and in-memory
//! rasters.
//!
//! Decoding always uses the format detected from magic bytes, never a
//! guessed one: a magic-byte match is necessary but not sufficient, so
//! structurally corrupt data still fails here with a decode error.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{DynamicImage, ImageEncoder, ImageReader};

use crate::detector::DetectError;
use crate::validator::{ImageKind, UploadedAsset};

/// Quality used when a tool re-encodes without an explicit quality option.
const DEFAULT_ENCODE_QUALITY: u8 = 90;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("invalid option '{field}': {reason}")]
    InvalidOption { field: String, reason: String },

    #[error("no {0} backend configured")]
    DetectorUnavailable(String),

    #[error("no usable font found; set FONT_PATH to a TTF file")]
    FontUnavailable,
}

impl From<DetectError> for TransformError {
    fn from(err: DetectError) -> Self {
        match err {
            DetectError::Unavailable(what) => TransformError::DetectorUnavailable(what.to_string()),
            DetectError::Failed(msg) => TransformError::DetectorUnavailable(msg),
        }
    }
}

/// A decoded raster plus the context needed to re-encode it.
///
/// The original bytes are retained for metadata extraction (EXIF lives in the
/// container, not the pixels). Owned exclusively by one request.
pub struct Raster {
    pub image: DynamicImage,
    pub kind: ImageKind,
    pub source: Bytes,
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Decode a validated upload into a raster.
pub fn decode(asset: &UploadedAsset) -> Result<Raster, TransformError> {
    let mut reader = ImageReader::new(Cursor::new(asset.data.as_ref()));
    reader.set_format(asset.kind.to_image_format());
    let image = reader
        .decode()
        .map_err(|e| TransformError::Decode(e.to_string()))?;

    tracing::debug!(
        format = %asset.kind,
        width = image.width(),
        height = image.height(),
        "Decoded upload"
    );

    Ok(Raster {
        image,
        kind: asset.kind,
        source: asset.data.clone(),
    })
}

/// Encode a raster into the given format.
///
/// JPEG and WebP honour the quality hint; PNG maps a present hint to its
/// strongest compression level; GIF, BMP and TIFF ignore it.
pub fn encode(
    img: &DynamicImage,
    kind: ImageKind,
    quality: Option<u8>,
) -> Result<Vec<u8>, TransformError> {
    let mut buffer = Vec::new();
    match kind {
        ImageKind::Jpeg => {
            let rgb = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(
                &mut buffer,
                quality.unwrap_or(DEFAULT_ENCODE_QUALITY),
            );
            encoder
                .write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    image::ExtendedColorType::Rgb8,
                )
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageKind::Webp => {
            let rgba = img.to_rgba8();
            let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
            let encoded = encoder.encode(quality.unwrap_or(DEFAULT_ENCODE_QUALITY) as f32);
            buffer.extend_from_slice(&encoded);
        }
        ImageKind::Png => {
            let compression = if quality.is_some() {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder =
                PngEncoder::new_with_quality(&mut buffer, compression, PngFilterType::Adaptive);
            let rgba = img.to_rgba8();
            encoder
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    image::ExtendedColorType::Rgba8,
                )
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageKind::Gif => {
            img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Gif)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageKind::Bmp => {
            // BMP carries no alpha in our pipeline; flatten like JPEG.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            rgb.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Bmp)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageKind::Tiff => {
            img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Tiff)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
    }
    Ok(buffer)
}
