//! Test helpers: build the router and fixture images for integration tests.
//!
//! Run from workspace root: `cargo test -p pixelmill-api`.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::{DynamicImage, Rgba, RgbaImage};
use pixelmill_api::{build_router, AppState};
use pixelmill_core::Config;
use pixelmill_processing::detector::UnavailableBackend;
use pixelmill_processing::{Capabilities, ImageKind};

/// Server with no detection backends (the production default).
pub fn setup_test_app() -> TestServer {
    app_with_capabilities(unavailable_capabilities())
}

pub fn app_with_capabilities(capabilities: Capabilities) -> TestServer {
    app_with_config_and_capabilities(Config::default(), capabilities)
}

pub fn app_with_config(config: Config) -> TestServer {
    app_with_config_and_capabilities(config, unavailable_capabilities())
}

pub fn app_with_config_and_capabilities(
    config: Config,
    capabilities: Capabilities,
) -> TestServer {
    let state = AppState::with_capabilities(config, capabilities);
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

pub fn unavailable_capabilities() -> Capabilities {
    Capabilities {
        detector: Arc::new(UnavailableBackend),
        segmenter: Arc::new(UnavailableBackend),
        font_path: None,
    }
}

/// Encode a flat-colored test image in the given format.
pub fn test_image(width: u32, height: u32, kind: ImageKind) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x % 256) as u8,
            (y % 256) as u8,
            ((x + y) % 256) as u8,
            255,
        ])
    }));
    let mut buffer = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buffer, kind.to_image_format())
        .expect("encode fixture");
    buffer.into_inner()
}

pub fn png_image(width: u32, height: u32) -> Vec<u8> {
    test_image(width, height, ImageKind::Png)
}

pub fn file_part(data: Vec<u8>, filename: &str, mime: &str) -> Part {
    Part::bytes(bytes::Bytes::from(data))
        .file_name(filename)
        .mime_type(mime)
}

/// Multipart form with a PNG file plus flat option fields.
pub fn png_form(width: u32, height: u32, options: &[(&str, &str)]) -> MultipartForm {
    let mut form = MultipartForm::new().add_part(
        "file",
        file_part(png_image(width, height), "test.png", "image/png"),
    );
    for (key, value) in options {
        form = form.add_text(key.to_string(), value.to_string());
    }
    form
}
