use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bundle: BundleConfig,
    /// Forwarding is disabled when `None`.
    pub inference: Option<InferenceConfig>,
    pub server: ServerConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Reserved path prefix for API routes (e.g. `/api`).
    pub api_prefix: String,
    pub bind_address: String,
    pub cors_permissive: bool,
    /// Maximum upload request size in bytes
    pub max_upload_size: u64,
}

/// Granularity of the timestamp prefixed to stored filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPrecision {
    Millis,
    Seconds,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Managed directory holding every stored clip.
    pub dir: PathBuf,
    pub timestamp_precision: TimestampPrecision,
}

#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Entry document, relative to `root`.
    pub entry: String,
    /// Serve the entry document for dotted paths that do not resolve to a file.
    pub missing_asset_fallback: bool,
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub file_field: String,
    /// Return the transcript in the upload response instead of only logging it.
    pub include_transcript: bool,
    pub model: Option<String>,
    pub timeout: Duration,
    pub transcript_field: String,
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            bind_address: "0.0.0.0:8080".to_string(),
            cors_permissive: true,
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./uploads"),
            timestamp_precision: TimestampPrecision::Millis,
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            entry: "index.html".to_string(),
            missing_asset_fallback: false,
            root: PathBuf::from("./client/dist"),
        }
    }
}

impl InferenceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            file_field: "file".to_string(),
            include_transcript: false,
            model: None,
            timeout: Duration::from_secs(30),
            transcript_field: "text".to_string(),
            url: url.into(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let server_defaults = ServerConfig::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(server_defaults.bind_address);
        let api_prefix = std::env::var("API_PREFIX").unwrap_or(server_defaults.api_prefix);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(server_defaults.max_upload_size);

        let cors_permissive = env_flag("CORS_PERMISSIVE", true);

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());

        let timestamp_precision = match std::env::var("FILENAME_TIMESTAMP")
            .unwrap_or_else(|_| "millis".to_string())
            .to_lowercase()
            .as_str()
        {
            "seconds" | "secs" | "s" => TimestampPrecision::Seconds,
            "millis" | "ms" => TimestampPrecision::Millis,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "FILENAME_TIMESTAMP must be 'millis' or 'seconds', got '{other}'"
                )))
            }
        };

        let bundle_root =
            std::env::var("BUNDLE_DIR").unwrap_or_else(|_| "./client/dist".to_string());
        let bundle_entry = std::env::var("BUNDLE_ENTRY").unwrap_or_else(|_| "index.html".to_string());
        let missing_asset_fallback = env_flag("SPA_FALLBACK_MISSING_ASSETS", false);

        let inference = match std::env::var("INFERENCE_URL").ok().filter(|u| !u.is_empty()) {
            Some(url) => {
                let mut inference = InferenceConfig::new(url);
                inference.model = std::env::var("INFERENCE_MODEL").ok();
                if let Ok(field) = std::env::var("INFERENCE_FILE_FIELD") {
                    inference.file_field = field;
                }
                if let Ok(field) = std::env::var("INFERENCE_TRANSCRIPT_FIELD") {
                    inference.transcript_field = field;
                }
                if let Ok(secs) = std::env::var("INFERENCE_TIMEOUT_SECS") {
                    let secs: u64 = secs.parse().map_err(|_| {
                        ConfigError::ValidationError(format!(
                            "INFERENCE_TIMEOUT_SECS must be an integer, got '{secs}'"
                        ))
                    })?;
                    inference.timeout = Duration::from_secs(secs);
                }
                inference.include_transcript = env_flag("INFERENCE_INCLUDE_TRANSCRIPT", false);
                Some(inference)
            }
            None => None,
        };

        let config = Config {
            bundle: BundleConfig {
                entry: bundle_entry,
                missing_asset_fallback,
                root: PathBuf::from(bundle_root),
            },
            inference,
            server: ServerConfig {
                api_prefix,
                bind_address,
                cors_permissive,
                max_upload_size,
            },
            uploads: UploadConfig {
                dir: PathBuf::from(upload_dir),
                timestamp_precision,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.server.api_prefix;
        if !prefix.starts_with('/') || prefix == "/" || prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "API_PREFIX must start with '/', must not end with '/' and must not be the root, got '{prefix}'"
            )));
        }

        if self.bundle.entry.is_empty() {
            return Err(ConfigError::ValidationError(
                "BUNDLE_ENTRY cannot be empty".to_string(),
            ));
        }

        if let Some(inference) = &self.inference {
            if reqwest::Url::parse(&inference.url).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "INFERENCE_URL is not a valid URL: '{}'",
                    inference.url
                )));
            }
            if inference.timeout.is_zero() {
                return Err(ConfigError::ValidationError(
                    "INFERENCE_TIMEOUT_SECS must be greater than 0".to_string(),
                ));
            }
        }

        if self.server.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_UPLOAD_SIZE must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
