mod http;

pub use http::HttpTranscriber;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference endpoint unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Inference endpoint returned an unusable response: {0}")]
    UpstreamProtocolError(String),
}

impl InferenceError {
    /// Stable code reported to clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            InferenceError::UpstreamUnavailable(_) => "upstream_unavailable",
            InferenceError::UpstreamProtocolError(_) => "upstream_protocol_error",
        }
    }
}

/// Converts audio bytes into a transcript.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, filename: &str, audio: Bytes) -> Result<String, InferenceError>;
}
