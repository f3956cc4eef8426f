//! Transform dispatch: maps one tool id plus resolved options and a decoded
//! raster to exactly one transformation.
//!
//! Each request moves linearly through validate → decode → transform →
//! encode; any failure short-circuits. `info` and `metadata view` produce a
//! JSON document instead of pixels and skip encoding entirely.

pub mod blur;
pub mod crop;
pub mod editor;
pub mod meme;
pub mod orientation;
pub mod resize;
pub mod watermark;

use std::sync::Arc;

use serde_json::Value;

use crate::codec::{self, TransformError};
use crate::detector::{BackgroundSegmenter, FaceDetector};
use crate::fonts;
use crate::metadata;
use crate::options::{MetadataAction, ToolOptions};
use crate::validator::{ImageKind, UploadedAsset};

/// Injected capabilities shared read-only by all jobs.
#[derive(Clone)]
pub struct Capabilities {
    pub detector: Arc<dyn FaceDetector>,
    pub segmenter: Arc<dyn BackgroundSegmenter>,
    pub font_path: Option<String>,
}

/// The outcome of one tool run: either encoded image bytes or a JSON body.
#[derive(Debug)]
pub enum ProcessingResult {
    Image { bytes: Vec<u8>, kind: ImageKind },
    Json(Value),
}

/// Execute one tool over a validated upload.
pub fn run(
    options: &ToolOptions,
    asset: &UploadedAsset,
    filename: &str,
    caps: &Capabilities,
) -> Result<ProcessingResult, TransformError> {
    let raster = codec::decode(asset)?;
    let source_kind = raster.kind;

    match options {
        ToolOptions::Info => {
            let info = metadata::ImageInfo::new(
                filename,
                source_kind,
                &raster.image,
                asset.size() as u64,
            );
            Ok(ProcessingResult::Json(serde_json::to_value(info).map_err(
                |e| TransformError::Encode(e.to_string()),
            )?))
        }

        ToolOptions::Metadata(opts) => match opts.action {
            // View only reports; the image is never mutated.
            MetadataAction::View => Ok(ProcessingResult::Json(Value::Object(
                metadata::exif_fields(&asset.data),
            ))),
            MetadataAction::Strip => {
                let bytes = match metadata::strip_metadata(&asset.data, source_kind) {
                    Some(stripped) => stripped,
                    // No structural support for this container: re-encoding
                    // the decoded pixels carries no metadata either.
                    None => codec::encode(&raster.image, source_kind, None)?,
                };
                Ok(ProcessingResult::Image {
                    bytes,
                    kind: source_kind,
                })
            }
        },

        ToolOptions::Compress(opts) => {
            let bytes = codec::encode(&raster.image, source_kind, Some(opts.quality))?;
            Ok(ProcessingResult::Image {
                bytes,
                kind: source_kind,
            })
        }

        ToolOptions::Convert(opts) => {
            let bytes = codec::encode(&raster.image, opts.target, None)?;
            Ok(ProcessingResult::Image {
                bytes,
                kind: opts.target,
            })
        }

        ToolOptions::Resize(opts) => {
            let resized = resize::apply(raster.image, opts, source_kind)?;
            encode_result(&resized, source_kind)
        }

        ToolOptions::Crop(opts) => {
            let cropped = crop::apply(raster.image, opts)?;
            encode_result(&cropped, source_kind)
        }

        ToolOptions::Rotate(opts) => {
            let mut img = raster.image;
            if opts.auto_orient {
                img = orientation::auto_orient(img, &asset.data);
            }
            // Degrees apply after auto-orientation.
            img = orientation::rotate_degrees(img, opts.degrees);
            encode_result(&img, source_kind)
        }

        ToolOptions::Watermark(opts) => {
            let font = fonts::shared_font(caps.font_path.as_deref())?;
            let marked = watermark::apply(raster.image, opts, font)?;
            encode_result(&marked, source_kind)
        }

        ToolOptions::Meme(opts) => {
            let font = fonts::shared_font(caps.font_path.as_deref())?;
            let captioned = meme::apply(raster.image, opts, font)?;
            encode_result(&captioned, source_kind)
        }

        ToolOptions::BlurFace(opts) => {
            let blurred = blur::blur_faces(raster.image, opts, caps.detector.as_ref())?;
            encode_result(&blurred, source_kind)
        }

        ToolOptions::RemoveBg => {
            let cut_out = blur::remove_background(raster.image, caps.segmenter.as_ref())?;
            // Always PNG so the carved-out alpha survives.
            encode_result(&cut_out, ImageKind::Png)
        }

        ToolOptions::Upscale(opts) => {
            let upscaled = resize::upscale(raster.image, opts);
            encode_result(&upscaled, source_kind)
        }

        ToolOptions::Edit(opts) => {
            let edited = editor::apply(raster.image, opts)?;
            encode_result(&edited, source_kind)
        }
    }
}

fn encode_result(
    img: &image::DynamicImage,
    kind: ImageKind,
) -> Result<ProcessingResult, TransformError> {
    let bytes = codec::encode(img, kind, None)?;
    Ok(ProcessingResult::Image { bytes, kind })
}
