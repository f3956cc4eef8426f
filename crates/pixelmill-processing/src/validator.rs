use bytes::Bytes;

/// Common validation errors for uploaded images
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Unrecognized image data: no supported format signature")]
    UnsupportedFormat,

    #[error("Empty file")]
    EmptyFile,
}

/// True image format, as determined from leading magic bytes.
///
/// The set is closed: these are the formats the service decodes and encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
    Tiff,
}

impl ImageKind {
    /// Detect the format from leading magic bytes, independent of filename,
    /// extension, or any client-declared content type.
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(ImageKind::Jpeg),
            [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(ImageKind::Png),
            [0x52, 0x49, 0x46, 0x46, ..] if bytes.len() >= 12 && &bytes[8..12] == b"WEBP" => {
                Some(ImageKind::Webp)
            }
            [0x47, 0x49, 0x46, 0x38, ..] => Some(ImageKind::Gif),
            [0x42, 0x4D, ..] => Some(ImageKind::Bmp),
            [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Some(ImageKind::Tiff),
            _ => None,
        }
    }

    /// Parse a caller-supplied format name (convert target).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::Webp),
            "gif" => Some(ImageKind::Gif),
            "bmp" => Some(ImageKind::Bmp),
            "tiff" | "tif" => Some(ImageKind::Tiff),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
            ImageKind::Bmp => "bmp",
            ImageKind::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
            ImageKind::Tiff => "image/tiff",
        }
    }

    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageKind::Jpeg => image::ImageFormat::Jpeg,
            ImageKind::Png => image::ImageFormat::Png,
            ImageKind::Webp => image::ImageFormat::WebP,
            ImageKind::Gif => image::ImageFormat::Gif,
            ImageKind::Bmp => image::ImageFormat::Bmp,
            ImageKind::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImageKind::Jpeg => "JPEG",
            ImageKind::Png => "PNG",
            ImageKind::Webp => "WEBP",
            ImageKind::Gif => "GIF",
            ImageKind::Bmp => "BMP",
            ImageKind::Tiff => "TIFF",
        };
        f.write_str(name)
    }
}

/// A validated upload: raw bytes plus the trusted detected format.
///
/// `declared_type` is whatever the client sent and is advisory only; dispatch
/// decisions always use `kind`.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub data: Bytes,
    pub declared_type: Option<String>,
    pub kind: ImageKind,
}

impl UploadedAsset {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Upload validator
///
/// Pure classification: sniffs magic bytes and enforces the size ceiling
/// before any decode work. An upload is accepted wholesale or rejected.
pub struct UploadValidator {
    max_file_size: usize,
}

impl UploadValidator {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn validate(
        &self,
        data: Bytes,
        declared_type: Option<String>,
    ) -> Result<UploadedAsset, ValidationError> {
        if data.is_empty() {
            return Err(ValidationError::EmptyFile);
        }

        if data.len() > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: data.len(),
                max: self.max_file_size,
            });
        }

        let kind = ImageKind::from_magic_bytes(&data).ok_or(ValidationError::UnsupportedFormat)?;

        if let Some(declared) = &declared_type {
            if declared != kind.mime_type() {
                tracing::debug!(
                    declared = %declared,
                    detected = %kind,
                    "Declared content type disagrees with magic bytes; trusting magic bytes"
                );
            }
        }

        Ok(UploadedAsset {
            data,
            declared_type,
            kind,
        })
    }
}
