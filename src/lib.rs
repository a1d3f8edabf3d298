//! Stroke-care backend: facility search and speech clarity over hosted vendor APIs

pub mod asr;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod places;
pub mod routes;
pub mod search;
pub mod speech;
pub mod state;
pub mod tts;
pub mod utils;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use state::AppState;

/// Room for multipart boundaries and text fields on top of the audio itself
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Assemble the router with CORS, request tracing and the upload size limit
pub fn build_app(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .merge(routes::create_routes())
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .with_state(state)
}
