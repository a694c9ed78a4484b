use axum::extract::multipart::MultipartError;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

// ============================================================================
// JSend status enum
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

// ============================================================================
// JSend success envelope (fields flattened next to the status)
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JSend<T: Serialize> {
    #[serde(flatten)]
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }
}

// ============================================================================
// JSend fail / error body
// ============================================================================

/// Body for both client (`fail`) and server (`error`) errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct JSendProblem {
    /// Stable machine-readable code.
    pub code: String,
    pub message: String,
    pub status: JSendStatus,
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// A JSend-compatible error that can be either a fail (4xx) or error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, &'static str, String),
    Error(StatusCode, &'static str, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (code, status, kind, message) = match self {
            ApiError::Fail(code, kind, msg) => (code, JSendStatus::Fail, kind, msg),
            ApiError::Error(code, kind, msg) => (code, JSendStatus::Error, kind, msg),
        };

        (
            code,
            Json(JSendProblem {
                code: kind.to_string(),
                message,
                status,
            }),
        )
            .into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, "bad_request", message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, "not_found", message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            message.into(),
        )
    }

    pub fn path_traversal(message: impl Into<String>) -> Self {
        ApiError::Fail(
            StatusCode::BAD_REQUEST,
            "path_traversal_rejected",
            message.into(),
        )
    }

    pub fn upload_incomplete(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, "upload_incomplete", message.into())
    }

    pub fn io_failure(message: impl Into<String>) -> Self {
        ApiError::Error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "io_failure",
            message.into(),
        )
    }

    /// Map a multipart parsing error, keeping body-limit violations as 413.
    pub fn from_multipart(e: &MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large("Upload exceeds the maximum allowed size")
        } else {
            ApiError::bad_request(format!("Invalid multipart data: {}", e.body_text()))
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::not_found("File not found"),
            StoreError::PathTraversalRejected(_) => {
                ApiError::path_traversal("Filename must not contain path components")
            }
            StoreError::Incomplete(source) => match source.downcast_ref::<MultipartError>() {
                Some(multipart) if multipart.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                    ApiError::from_multipart(multipart)
                }
                _ => ApiError::upload_incomplete("Upload was interrupted before completion"),
            },
            StoreError::Io(_) => ApiError::io_failure("Storage operation failed"),
        }
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(format!("Invalid query parameter: {e}")))
    }
}
