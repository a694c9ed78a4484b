//! Shared test helpers for audio-intake unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::bundle::Bundle;
use crate::config::{BundleConfig, Config, InferenceConfig, ServerConfig, TimestampPrecision, UploadConfig};
use crate::inference::{InferenceError, Transcriber};
use crate::store::UploadStore;
use crate::AppState;

/// Create a test config rooted in a temporary directory.
pub fn test_config(temp_dir: &tempfile::TempDir) -> Config {
    Config {
        bundle: BundleConfig {
            entry: "index.html".to_string(),
            missing_asset_fallback: false,
            root: temp_dir.path().join("dist"),
        },
        inference: None,
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            max_upload_size: 10 * 1024 * 1024, // 10MB for tests
            ..Default::default()
        },
        uploads: UploadConfig {
            dir: temp_dir.path().join("uploads"),
            timestamp_precision: TimestampPrecision::Millis,
        },
    }
}

/// Create a test AppState with a temporary upload directory and no forwarding.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    build_state(test_config(temp_dir), None)
}

/// Create a test AppState that forwards uploads to `transcriber`.
pub fn test_state_with_transcriber(
    temp_dir: &tempfile::TempDir,
    transcriber: Arc<dyn Transcriber>,
    include_transcript: bool,
) -> Arc<AppState> {
    let mut config = test_config(temp_dir);
    let mut inference = InferenceConfig::new("http://127.0.0.1:9/transcribe");
    inference.include_transcript = include_transcript;
    config.inference = Some(inference);
    build_state(config, Some(transcriber))
}

fn build_state(config: Config, transcriber: Option<Arc<dyn Transcriber>>) -> Arc<AppState> {
    let store = UploadStore::new(&config.uploads).expect("Failed to create test upload store");
    let bundle = Bundle::new(&config.bundle, config.server.api_prefix.clone());

    Arc::new(AppState {
        bundle,
        config,
        store,
        transcriber,
    })
}

/// In-memory transcriber recording every call.
pub struct FakeTranscriber {
    reply: Result<String, ()>,
    received: Mutex<Vec<(String, usize)>>,
}

impl FakeTranscriber {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            reply: Err(()),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Filenames and byte counts seen so far.
    pub fn received(&self) -> Vec<(String, usize)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, filename: &str, audio: Bytes) -> Result<String, InferenceError> {
        self.received
            .lock()
            .unwrap()
            .push((filename.to_string(), audio.len()));

        self.reply
            .clone()
            .map_err(|_| InferenceError::UpstreamUnavailable("connection refused".to_string()))
    }
}
