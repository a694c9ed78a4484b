use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::response::{ApiError, JSend};
use crate::store::{StoreError, UploadRecord};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    /// Stable code when forwarding failed and transcripts are surfaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_error: Option<&'static str>,
    pub size: u64,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadEntry {
    pub created: String,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadListResponse {
    pub files: Vec<UploadEntry>,
}

/// Multipart field names that may carry the audio.
const AUDIO_FIELDS: [&str; 2] = ["audio", "file"];

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    let mut saved: Option<UploadRecord> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(&e))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        if saved.is_some() || !AUDIO_FIELDS.contains(&field_name.as_str()) {
            // Ignore unknown fields and any second audio part
            continue;
        }

        let original = field.file_name().map(|s| s.to_string());
        let name = state
            .store
            .allocator()
            .allocate(original.as_deref(), Utc::now());

        let record = state.store.save(&name, field).await.map_err(|e| {
            if let StoreError::Io(ref io) = e {
                tracing::error!(
                    operation = "save",
                    filename = %name.candidate(0),
                    error = %io,
                    "Failed to store upload"
                );
            } else {
                tracing::warn!(operation = "save", error = %e, "Upload aborted");
            }
            ApiError::from(e)
        })?;

        tracing::debug!(filename = %record.stored_name, size = record.size_bytes, "Stored upload");
        saved = Some(record);
    }

    let record = saved.ok_or_else(|| ApiError::bad_request("audio or file field is required"))?;

    let mut response = UploadResponse {
        filename: record.stored_name.clone(),
        inference_error: None,
        size: record.size_bytes,
        timestamp: record.created_at.to_rfc3339(),
        transcript: None,
    };

    // Forwarding never affects the already-stored file or the status code
    if let Some(outcome) = forward_upload(&state, &record).await {
        let include = state
            .config
            .inference
            .as_ref()
            .is_some_and(|i| i.include_transcript);
        if include {
            match outcome {
                Ok(transcript) => response.transcript = Some(transcript),
                Err(code) => response.inference_error = Some(code),
            }
        }
    }

    Ok(JSend::success(response))
}

pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<UploadListResponse>>, ApiError> {
    let records = state.store.list().await.map_err(|e| {
        tracing::error!(operation = "list", error = %e, "Failed to list uploads");
        ApiError::from(e)
    })?;

    let files = records.iter().map(record_to_entry).collect();
    Ok(JSend::success(UploadListResponse { files }))
}

pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let stored = state.store.get(&filename).await.map_err(|e| {
        match &e {
            StoreError::PathTraversalRejected(_) => {
                tracing::warn!(operation = "get", filename = %filename, "Rejected traversal attempt")
            }
            StoreError::Io(io) => {
                tracing::error!(operation = "get", filename = %filename, error = %io, "Failed to open upload")
            }
            _ => {}
        }
        ApiError::from(e)
    })?;

    let mime = mime_guess::from_path(&stored.name).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(stored.file));

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        mime.essence_str()
            .parse()
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.size));
    if let Ok(value) = format!("inline; filename=\"{}\"", stored.name).parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

// ============================================================================
// Helpers
// ============================================================================

/// Relay a stored upload to the inference endpoint, if one is configured.
///
/// Every failure is logged here; the caller only sees a stable code.
async fn forward_upload(
    state: &AppState,
    record: &UploadRecord,
) -> Option<Result<String, &'static str>> {
    let transcriber = state.transcriber.as_ref()?;

    let audio = match state.store.read(&record.stored_name).await {
        Ok(audio) => audio,
        Err(e) => {
            tracing::error!(
                operation = "forward",
                filename = %record.stored_name,
                error = %e,
                "Failed to read upload for forwarding"
            );
            return Some(Err("io_failure"));
        }
    };

    match transcriber.transcribe(&record.stored_name, audio).await {
        Ok(transcript) => {
            tracing::info!(filename = %record.stored_name, transcript = %transcript, "Transcribed upload");
            Some(Ok(transcript))
        }
        Err(e) => {
            tracing::warn!(
                operation = "forward",
                filename = %record.stored_name,
                code = e.code(),
                error = %e,
                "Inference forwarding failed"
            );
            Some(Err(e.code()))
        }
    }
}

fn record_to_entry(record: &UploadRecord) -> UploadEntry {
    UploadEntry {
        created: record.created_at.to_rfc3339(),
        filename: record.stored_name.clone(),
        size: record.size_bytes,
    }
}
