use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_size as usize;

    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/audio",
            post(handlers::upload_audio).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/text", post(handlers::process_text))
        .route("/uploads", get(handlers::list_uploads))
        .route("/uploads/:filename", get(handlers::get_upload))
        .fallback(handlers::api_not_found);

    let mut router = Router::new()
        .nest(&state.config.server.api_prefix, api)
        // Static assets and client-side routes
        .fallback(handlers::serve_app)
        .layer(TraceLayer::new_for_http());

    if state.config.server.cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
