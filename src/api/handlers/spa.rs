use axum::body::Body;
use axum::extract::{OriginalUri, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::response::ApiError;
use crate::bundle::Route;
use crate::AppState;

const ASSET_CACHE_CONTROL: &str = "public, max-age=3600";
const ENTRY_CACHE_CONTROL: &str = "no-cache";

/// Catch-all for every path the API router does not claim.
///
/// Never answers with a JSON error body except for stray API paths: it serves a
/// bundle file, the entry document, or a bare status.
pub async fn serve_app(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let route = state.bundle.classify(request.uri().path()).await;

    match route {
        Route::Api => api_route_missing(request.uri().path()).into_response(),
        _ if request.method() != Method::GET && request.method() != Method::HEAD => {
            let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET, HEAD"));
            response
        }
        Route::StaticHit(path) => serve_file(&path, request, ASSET_CACHE_CONTROL).await,
        Route::MissingAsset => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Route::SpaFallback => {
            let entry = state.bundle.entry_path();
            let response = serve_file(entry, request, ENTRY_CACHE_CONTROL).await;
            if response.status() != StatusCode::NOT_FOUND {
                return response;
            }

            tracing::warn!(entry = %entry.display(), "Entry document unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Application bundle is not available",
            )
                .into_response()
        }
    }
}

/// Fallback for unmatched paths under the API prefix.
pub async fn api_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    api_route_missing(uri.path())
}

fn api_route_missing(path: &str) -> ApiError {
    ApiError::not_found(format!("No API route for {path}"))
}

/// Serve one bundle file, honouring range and conditional requests.
async fn serve_file(path: &Path, request: Request, cache_control: &'static str) -> Response {
    let mut response = match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    let status = response.status();
    if status.is_success() || status == StatusCode::NOT_MODIFIED {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}
