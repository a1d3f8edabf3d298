use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::handlers::{search, speech};
use crate::state::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/", get(root))
        .route("/api/health", get(health_check))

        // Facility search
        .route("/api/search", post(search::search_facilities))
        .route("/api/facility/:place_id", get(search::facility_details))

        // Speech clarity
        .route("/api/create-voice-profile", post(speech::create_voice_profile))
        .route("/api/process-speech-fast", post(speech::process_speech_fast))
        .route("/api/test-voice-clone", post(speech::test_voice_clone))
        .route("/api/voices", get(speech::list_voices))
        .route("/api/speed-test", get(speech::speed_test))
        .route("/api/delete-voice/:voice_id", delete(speech::delete_voice))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Backend is running!",
        "status": "ok"
    }))
}

fn key_status(key: &Option<String>) -> &'static str {
    if key.as_deref().is_some_and(|k| !k.is_empty()) {
        "configured"
    } else {
        "missing"
    }
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "apis": {
            "google_maps": key_status(&config.google.api_key),
            "openai": key_status(&config.openai.api_key),
            "elevenlabs": key_status(&config.elevenlabs.api_key)
        }
    }))
}
