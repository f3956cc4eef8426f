//! The tool catalog: the closed set of image operations the service exposes.

use serde::Serialize;

/// One of the 13 image tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    Compress,
    Resize,
    Crop,
    Rotate,
    Convert,
    Info,
    Metadata,
    Watermark,
    BlurFace,
    RemoveBg,
    Upscale,
    Meme,
    Edit,
}

/// Catalog entry returned by `GET /api/tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub id: &'static str,
    pub category: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl ToolId {
    /// All tools, in the order the catalog endpoint reports them.
    pub const ALL: [ToolId; 13] = [
        ToolId::Compress,
        ToolId::Resize,
        ToolId::Crop,
        ToolId::Rotate,
        ToolId::Convert,
        ToolId::Info,
        ToolId::Metadata,
        ToolId::Watermark,
        ToolId::BlurFace,
        ToolId::RemoveBg,
        ToolId::Upscale,
        ToolId::Meme,
        ToolId::Edit,
    ];

    /// URL slug, as used in `POST /api/{tool-id}`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::Compress => "compress",
            ToolId::Resize => "resize",
            ToolId::Crop => "crop",
            ToolId::Rotate => "rotate",
            ToolId::Convert => "convert",
            ToolId::Info => "info",
            ToolId::Metadata => "metadata",
            ToolId::Watermark => "watermark",
            ToolId::BlurFace => "blur-face",
            ToolId::RemoveBg => "remove-bg",
            ToolId::Upscale => "upscale",
            ToolId::Meme => "meme",
            ToolId::Edit => "edit",
        }
    }

    pub fn parse(s: &str) -> Option<ToolId> {
        ToolId::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        let (category, title, description) = match self {
            ToolId::Compress => (
                "optimize",
                "Compress",
                "Compress images by reducing quality",
            ),
            ToolId::Resize => (
                "transform",
                "Resize",
                "Resize images by dimensions, percentage or target file size",
            ),
            ToolId::Crop => (
                "transform",
                "Crop",
                "Crop images by coordinates or aspect ratio",
            ),
            ToolId::Rotate => (
                "transform",
                "Rotate",
                "Rotate images by degrees or auto-orient from EXIF",
            ),
            ToolId::Convert => ("convert", "Convert", "Convert images between formats"),
            ToolId::Info => (
                "inspect",
                "Info",
                "Get image info (dimensions, format, size, mode)",
            ),
            ToolId::Metadata => ("inspect", "Metadata", "View or strip EXIF metadata"),
            ToolId::Watermark => ("annotate", "Watermark", "Add text watermarks"),
            ToolId::BlurFace => ("effects", "Blur faces", "Detect and blur faces"),
            ToolId::RemoveBg => ("effects", "Remove background", "Remove image background"),
            ToolId::Upscale => (
                "transform",
                "Upscale",
                "Upscale images with Lanczos resampling",
            ),
            ToolId::Meme => ("annotate", "Meme", "Add meme text (top/bottom)"),
            ToolId::Edit => (
                "effects",
                "Edit",
                "Photo editor: brightness, contrast, filters, borders, frames",
            ),
        };
        ToolDescriptor {
            id: self.as_str(),
            category,
            title,
            description,
        }
    }

    /// The full ordered catalog.
    pub fn catalog() -> Vec<ToolDescriptor> {
        ToolId::ALL.iter().map(|t| t.descriptor()).collect()
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
