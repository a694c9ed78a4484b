//! Request classification for everything outside the API routes.
//!
//! A request is either an API call, a hit on a file in the prebuilt application
//! bundle, or a client-side route that is answered with the bundle's entry document.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::config::BundleConfig;

/// Outcome of classifying a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Under the reserved API prefix.
    Api,
    /// Dotted path resolving to a regular file inside the bundle.
    StaticHit(PathBuf),
    /// Serve the entry document so the client router can take over.
    SpaFallback,
    /// Dotted path with no file behind it.
    MissingAsset,
}

/// Read-only view of the single-page application bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    api_prefix: String,
    entry: PathBuf,
    missing_asset_fallback: bool,
    root: PathBuf,
}

impl Bundle {
    pub fn new(config: &BundleConfig, api_prefix: impl Into<String>) -> Self {
        Self {
            api_prefix: api_prefix.into(),
            entry: config.root.join(&config.entry),
            missing_asset_fallback: config.missing_asset_fallback,
            root: config.root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry
    }

    /// Whether the entry document is present. Checked once at startup.
    pub fn has_entry(&self) -> bool {
        self.entry.is_file()
    }

    pub fn is_api(&self, path: &str) -> bool {
        path.strip_prefix(self.api_prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Classify a raw (percent-encoded) request path.
    pub async fn classify(&self, path: &str) -> Route {
        if self.is_api(path) {
            return Route::Api;
        }

        let Ok(decoded) = percent_decode_str(path).decode_utf8() else {
            return self.missing();
        };
        let relative = decoded.trim_start_matches('/');

        if Path::new(relative).extension().is_none() {
            return Route::SpaFallback;
        }

        let Some(candidate) = self.resolve(relative) else {
            return self.missing();
        };

        match tokio::fs::metadata(&candidate).await {
            Ok(metadata) if metadata.is_file() => Route::StaticHit(candidate),
            _ => self.missing(),
        }
    }

    fn missing(&self) -> Route {
        if self.missing_asset_fallback {
            Route::SpaFallback
        } else {
            Route::MissingAsset
        }
    }

    /// Join `relative` onto the bundle root if it consists only of plain segments.
    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        if relative.contains(['\\', '\0']) {
            return None;
        }

        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                _ => return None,
            }
        }
        Some(path)
    }
}
