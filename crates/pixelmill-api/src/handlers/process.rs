//! The one-shot tool endpoint: `POST /api/{tool-id}` with a multipart body.
//!
//! Pipeline per request: extract multipart → validate upload → resolve
//! options → run the transform on the job pool → build the response. All
//! validation and option errors return before any decode work happens.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use pixelmill_core::{AppError, ToolId};
use pixelmill_processing::{transform, ProcessingResult, RawOptions, ToolOptions};

use crate::error::{transform_to_app, HttpAppError};
use crate::state::AppState;

pub async fn process_tool(
    State(state): State<Arc<AppState>>,
    Path(tool_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let tool = ToolId::parse(&tool_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown tool: {}", tool_id)))?;

    let upload = extract_upload(multipart).await?;
    let file = upload
        .file
        .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    // Classification and option resolution run before any decode work.
    let asset = state.validator.validate(file, upload.content_type)?;
    let options = ToolOptions::resolve(tool, &upload.options)?;

    tracing::debug!(
        tool = %tool,
        format = %asset.kind,
        size = asset.size(),
        "Dispatching tool request"
    );

    let caps = state.capabilities.clone();
    let filename = upload.filename;
    let result = state
        .jobs
        .run(move || {
            transform::run(&options, &asset, &filename, &caps).map_err(transform_to_app)
        })
        .await
        .map_err(HttpAppError)?;

    Ok(build_response(result))
}

struct ExtractedUpload {
    file: Option<Bytes>,
    filename: String,
    content_type: Option<String>,
    options: RawOptions,
}

/// Pull the file part and the flat option fields out of the multipart form.
/// Exactly one field named "file" is accepted; the rest become raw options.
async fn extract_upload(mut multipart: Multipart) -> Result<ExtractedUpload, HttpAppError> {
    let mut file: Option<Bytes> = None;
    let mut filename = "upload".to_string();
    let mut content_type: Option<String> = None;
    let mut options = RawOptions::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        HttpAppError(AppError::InvalidInput(format!(
            "Failed to read multipart: {}",
            e
        )))
    })? {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if file.is_some() {
                return Err(HttpAppError(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                )));
            }
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            content_type = field.content_type().map(|s| s.to_string());
            let data = field.bytes().await.map_err(|e| {
                HttpAppError(AppError::InvalidInput(format!(
                    "Failed to read file data: {}",
                    e
                )))
            })?;
            file = Some(data);
        } else if !field_name.is_empty() {
            let value = field.text().await.map_err(|e| {
                HttpAppError(AppError::InvalidInput(format!(
                    "Failed to read field '{}': {}",
                    field_name, e
                )))
            })?;
            options.insert(field_name, value);
        }
    }

    Ok(ExtractedUpload {
        file,
        filename,
        content_type,
        options,
    })
}

/// One request maps to exactly one body shape: binary image or JSON.
fn build_response(result: ProcessingResult) -> Response {
    match result {
        ProcessingResult::Image { bytes, kind } => {
            let filename = format!("result.{}", kind.extension());
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, kind.mime_type())
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .header(header::CONTENT_LENGTH, bytes.len())
                .body(Body::from(bytes))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        ProcessingResult::Json(value) => Json(value).into_response(),
    }
}
