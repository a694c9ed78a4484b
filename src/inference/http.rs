use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use reqwest::Client;
use std::time::Duration;

use super::{InferenceError, Transcriber};
use crate::config::InferenceConfig;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Forwards audio to an HTTP inference endpoint as a multipart form.
pub struct HttpTranscriber {
    client: Client,
    config: InferenceConfig,
}

impl HttpTranscriber {
    pub fn new(config: InferenceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(MAX_CONNECT_TIMEOUT))
            .build()?;

        Ok(Self { client, config })
    }

    fn form(&self, filename: &str, audio: Bytes) -> Result<multipart::Form, InferenceError> {
        let length = audio.len() as u64;
        let file_part = multipart::Part::stream_with_length(audio, length)
            .file_name(filename.to_string())
            .mime_str("audio/wav")
            .map_err(|e| InferenceError::UpstreamProtocolError(format!("mime: {e}")))?;

        let mut form = multipart::Form::new().text("response_format", "json");
        if let Some(model) = &self.config.model {
            form = form.text("model", model.clone());
        }

        Ok(form.part(self.config.file_field.clone(), file_part))
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, filename: &str, audio: Bytes) -> Result<String, InferenceError> {
        let size = audio.len();
        let form = self.form(filename, audio)?;

        tracing::debug!(url = %self.config.url, filename, size, "Forwarding audio for inference");

        let resp = self
            .client
            .post(&self.config.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::UpstreamUnavailable(format!(
                        "timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else {
                    InferenceError::UpstreamUnavailable(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::UpstreamUnavailable(format!(
                "status {status}: {body}"
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| InferenceError::UpstreamProtocolError(format!("body: {e}")))?;

        let transcript = body
            .get(&self.config.transcript_field)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                InferenceError::UpstreamProtocolError(format!(
                    "missing string field '{}'",
                    self.config.transcript_field
                ))
            })?;

        tracing::info!(filename, chars = transcript.len(), "Inference completed");

        Ok(transcript.trim().to_string())
    }
}
