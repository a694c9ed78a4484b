//! audio-intake - Audio clip upload service with single-page application routing
//!
//! This crate provides:
//! - Streaming multipart upload of audio clips into a flat managed directory
//! - Collision-free, timestamped storage names normalized to `.wav`
//! - Optional forwarding of uploads to an HTTP speech-inference endpoint
//! - Static serving of a prebuilt application bundle with entry-document fallback

pub mod api;
pub mod bundle;
pub mod config;
pub mod inference;
pub mod responder;
pub mod store;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use bundle::Bundle;
use config::Config;
use inference::Transcriber;
use store::UploadStore;

/// Shared application state
pub struct AppState {
    pub bundle: Bundle,
    pub config: Config,
    pub store: UploadStore,
    pub transcriber: Option<Arc<dyn Transcriber>>,
}

impl AppState {
    /// Build state from configuration, creating the upload directory and the
    /// HTTP transcriber when forwarding is configured.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = UploadStore::new(&config.uploads)?;
        let bundle = Bundle::new(&config.bundle, config.server.api_prefix.clone());

        let transcriber: Option<Arc<dyn Transcriber>> = match &config.inference {
            Some(inference) => Some(Arc::new(inference::HttpTranscriber::new(inference.clone())?)),
            None => None,
        };

        Ok(Self {
            bundle,
            config,
            store,
            transcriber,
        })
    }
}
