//! End-to-end pipeline tests for `POST /api/{tool-id}`.
//!
//! Run with: `cargo test -p pixelmill-api --test process_test`

mod helpers;

use std::sync::Arc;

use axum_test::multipart::MultipartForm;
use helpers::{
    app_with_capabilities, app_with_config, file_part, png_form, setup_test_app,
    unavailable_capabilities,
};
use pixelmill_core::Config;
use pixelmill_processing::detector::{FixedMaskSegmenter, FixedRegionDetector, Region};

fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).expect("decode response image");
    (img.width(), img.height())
}

#[tokio::test]
async fn test_resize_width_only_scales_proportionally() {
    let server = setup_test_app();
    let response = server
        .post("/api/resize")
        .multipart(png_form(1000, 500, &[("width", "500")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "image/png"
    );
    assert_eq!(decoded_dimensions(response.as_bytes()), (500, 250));
}

#[tokio::test]
async fn test_resize_with_both_dimensions_is_exact() {
    let server = setup_test_app();
    let response = server
        .post("/api/resize")
        .multipart(png_form(1000, 500, &[("width", "500"), ("height", "300")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (500, 300));
}

#[tokio::test]
async fn test_compress_quality_out_of_range_is_invalid_option() {
    let server = setup_test_app();
    let response = server
        .post("/api/compress")
        .multipart(png_form(50, 50, &[("quality", "101")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_OPTION");
    assert!(body["error"].as_str().unwrap().contains("quality"));
}

#[tokio::test]
async fn test_meme_without_file_is_client_error() {
    let server = setup_test_app();
    let form = MultipartForm::new().add_text("top_text", "HELLO");
    let response = server.post("/api/meme").multipart(form).await;

    assert_eq!(response.status_code().as_u16(), 400);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_upload_over_ceiling_is_payload_too_large() {
    // 1 MiB ceiling; a 1.5 MiB upload passes the body-size layer but must be
    // rejected by the validator before any decode work.
    let mut config = Config::default();
    config.max_upload_bytes = 1024 * 1024;
    let server = app_with_config(config);

    let oversized = vec![0x89u8; 1024 * 1024 + 512 * 1024];
    let form = MultipartForm::new().add_part("file", file_part(oversized, "big.png", "image/png"));
    let response = server.post("/api/compress").multipart(form).await;

    assert_eq!(response.status_code().as_u16(), 413);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_spoofed_content_type_is_unsupported_format() {
    let server = setup_test_app();
    let not_an_image = b"<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>".to_vec();
    let form = MultipartForm::new().add_part(
        "file",
        file_part(not_an_image, "image.png", "image/png"),
    );
    let response = server.post("/api/info").multipart(form).await;

    assert_eq!(response.status_code().as_u16(), 415);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn test_corrupt_body_with_valid_magic_is_decode_error() {
    let server = setup_test_app();
    let mut corrupt = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    corrupt.extend_from_slice(&[0xAB; 256]);
    let form =
        MultipartForm::new().add_part("file", file_part(corrupt, "broken.png", "image/png"));
    let response = server.post("/api/info").multipart(form).await;

    assert_eq!(response.status_code().as_u16(), 422);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DECODE_ERROR");
}

#[tokio::test]
async fn test_convert_sets_format_and_attachment_filename() {
    let server = setup_test_app();
    let response = server
        .post("/api/convert")
        .multipart(png_form(40, 30, &[("format", "jpg")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap(),
        "attachment; filename=\"result.jpg\""
    );
    let bytes = response.as_bytes();
    assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    assert_eq!(decoded_dimensions(bytes), (40, 30));
}

#[tokio::test]
async fn test_info_returns_json_description() {
    let server = setup_test_app();
    let response = server
        .post("/api/info")
        .multipart(png_form(320, 240, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["width"], 320);
    assert_eq!(body["height"], 240);
    assert_eq!(body["format"], "PNG");
    assert_eq!(body["dimensions"], "320 x 240");
    assert!(body["file_size"].as_u64().unwrap() > 0);
    assert!(body["file_size_human"].is_string());
}

#[tokio::test]
async fn test_metadata_view_returns_json_not_image() {
    let server = setup_test_app();
    let response = server
        .post("/api/metadata")
        .multipart(png_form(16, 16, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let body: serde_json::Value = response.json();
    assert!(body.is_object());
}

#[tokio::test]
async fn test_metadata_strip_returns_image() {
    let server = setup_test_app();
    let response = server
        .post("/api/metadata")
        .multipart(png_form(16, 16, &[("action", "strip")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "image/png"
    );
}

#[tokio::test]
async fn test_rotate_90_swaps_dimensions() {
    let server = setup_test_app();
    let response = server
        .post("/api/rotate")
        .multipart(png_form(60, 40, &[("degrees", "90")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (40, 60));
}

#[tokio::test]
async fn test_crop_out_of_bounds_is_rejected_not_clamped() {
    let server = setup_test_app();
    let response = server
        .post("/api/crop")
        .multipart(png_form(
            100,
            100,
            &[("x", "80"), ("y", "0"), ("width", "40"), ("height", "40")],
        ))
        .await;

    assert_eq!(response.status_code().as_u16(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_OPTION");
}

#[tokio::test]
async fn test_crop_aspect_ratio_center_crops() {
    let server = setup_test_app();
    let response = server
        .post("/api/crop")
        .multipart(png_form(200, 100, &[("aspect", "1:1")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (100, 100));
}

#[tokio::test]
async fn test_upscale_doubles_dimensions() {
    let server = setup_test_app();
    let response = server
        .post("/api/upscale")
        .multipart(png_form(50, 30, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (100, 60));
}

#[tokio::test]
async fn test_edit_with_defaults_round_trips() {
    let server = setup_test_app();
    let response = server
        .post("/api/edit")
        .multipart(png_form(64, 48, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (64, 48));
}

#[tokio::test]
async fn test_blur_face_without_backend_is_501() {
    let server = setup_test_app();
    let response = server
        .post("/api/blur-face")
        .multipart(png_form(40, 40, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 501);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DETECTOR_UNAVAILABLE");
}

#[tokio::test]
async fn test_blur_face_zero_detections_succeeds() {
    let mut capabilities = unavailable_capabilities();
    capabilities.detector = Arc::new(FixedRegionDetector { regions: vec![] });
    let server = app_with_capabilities(capabilities);

    let response = server
        .post("/api/blur-face")
        .multipart(png_form(40, 40, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (40, 40));
}

#[tokio::test]
async fn test_blur_face_manual_region_needs_no_backend() {
    let server = setup_test_app();
    let response = server
        .post("/api/blur-face")
        .multipart(png_form(40, 40, &[("region", "0,0,20,20")]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
}

#[tokio::test]
async fn test_remove_bg_with_backend_outputs_png() {
    let mut capabilities = unavailable_capabilities();
    capabilities.segmenter = Arc::new(FixedMaskSegmenter {
        foreground: Region {
            x: 8,
            y: 8,
            width: 16,
            height: 16,
        },
    });
    let server = app_with_capabilities(capabilities);

    let response = server
        .post("/api/remove-bg")
        .multipart(png_form(32, 32, &[]))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "image/png"
    );
    let img = image::load_from_memory(response.as_bytes()).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0)[3], 0, "background should be transparent");
    assert_eq!(img.get_pixel(12, 12)[3], 255, "foreground should be opaque");
}

#[tokio::test]
async fn test_compress_jpeg_honours_quality() {
    let server = setup_test_app();
    let jpeg = helpers::test_image(128, 128, pixelmill_processing::ImageKind::Jpeg);

    let low_form = MultipartForm::new()
        .add_part("file", file_part(jpeg.clone(), "in.jpg", "image/jpeg"))
        .add_text("quality", "10");
    let low = server.post("/api/compress").multipart(low_form).await;
    assert_eq!(low.status_code().as_u16(), 200);

    let high_form = MultipartForm::new()
        .add_part("file", file_part(jpeg, "in.jpg", "image/jpeg"))
        .add_text("quality", "95");
    let high = server.post("/api/compress").multipart(high_form).await;
    assert_eq!(high.status_code().as_u16(), 200);

    assert!(low.as_bytes().len() < high.as_bytes().len());
}

#[tokio::test]
async fn test_unknown_option_keys_are_ignored() {
    let server = setup_test_app();
    let response = server
        .post("/api/resize")
        .multipart(png_form(
            100,
            100,
            &[("width", "50"), ("some_future_option", "on")],
        ))
        .await;

    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(decoded_dimensions(response.as_bytes()), (50, 50));
}

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let server = Arc::new(setup_test_app());
    let mut handles = Vec::new();

    for i in 0..6u32 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let width = 40 + i * 10;
            let response = server
                .post("/api/resize")
                .multipart(png_form(200, 200, &[("width", &width.to_string())]))
                .await;
            (width, response)
        }));
    }

    for handle in handles {
        let (width, response) = handle.await.unwrap();
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(decoded_dimensions(response.as_bytes()), (width, width));
    }
}
