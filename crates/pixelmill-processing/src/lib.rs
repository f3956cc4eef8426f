//! Image processing pipeline: upload validation, option resolution,
//! decode/encode, and the per-tool transforms.
//!
//! The flow through this crate mirrors the request pipeline:
//! `validator` classifies raw upload bytes, `options` turns raw form fields
//! into typed per-tool options, `codec` decodes/encodes rasters, and
//! `transform` dispatches one tool over the decoded raster.

pub mod codec;
pub mod detector;
pub mod fonts;
pub mod metadata;
pub mod options;
pub mod transform;
pub mod validator;

pub use codec::{Raster, TransformError};
pub use detector::{BackgroundSegmenter, FaceDetector, Region};
pub use options::{OptionError, RawOptions, ToolOptions};
pub use transform::{Capabilities, ProcessingResult};
pub use validator::{ImageKind, UploadValidator, UploadedAsset, ValidationError};
