use std::collections::HashMap;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::speech::{ProcessedSpeech, SpeechForm, SpeedTest};
use crate::state::AppState;

/// Lowercase hex, the encoding the frontend decodes `audio_base64` with
fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        None => default,
    }
}

async fn read_form(state: &AppState, multipart: Multipart) -> Result<SpeechForm> {
    let server = &state.config.server;
    SpeechForm::read(
        multipart,
        server.max_upload_bytes as u64,
        server.upload_dir.as_deref().map(std::path::Path::new),
    )
    .await
}

pub async fn create_voice_profile(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let form = read_form(&state, multipart).await?;
    let audio = form.require_audio()?;
    let name = form
        .field("name", &query)
        .unwrap_or_else(|| "UnknownVoice".to_string());

    let clip = audio.read_clip().await?;
    let voice_id = state.speech.create_profile(&name, &clip).await?;

    Ok(Json(json!({
        "success": true,
        "voice_id": voice_id,
        "message": format!("Voice profile '{}' created successfully!", name),
    })))
}

fn speech_reply(result: ProcessedSpeech) -> Value {
    let mut reply = json!({
        "success": true,
        "original_text": result.original_text,
        "enhanced_text": result.enhanced_text,
        "detected_language": {
            "code": result.language.code,
            "name": result.language.name,
        },
        "audio_base64": to_hex(&result.audio),
        "timing": result.timing,
        "voice_used": result.voice_used.unwrap_or_else(|| "default".to_string()),
        "auto_cloned": result.auto_cloned,
        "speech_generation_success": result.speech_generation_success,
        "speed_optimized": true,
    });
    if let Some(warning) = result.clone_warning {
        reply["clone_warning"] = json!(warning);
    }
    reply
}

pub async fn process_speech_fast(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Response> {
    let form = read_form(&state, multipart).await?;
    let audio = form.require_audio()?;
    let voice_id = form.field("voice_id", &query);
    let auto_clone = parse_flag(form.field("auto_clone", &query), true);
    info!(
        "Processing speech: {} bytes, voice_id={:?}, auto_clone={}",
        audio.size(),
        voice_id,
        auto_clone
    );

    let clip = audio.read_clip().await?;
    let voice_id_provided = voice_id.is_some();

    match state.speech.process(&clip, voice_id, auto_clone).await {
        Ok(result) => Ok(Json(speech_reply(result)).into_response()),
        Err(e) => {
            error!("process_speech_fast failed: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "debug_info": {
                        "auto_clone_attempted": auto_clone,
                        "voice_id_provided": voice_id_provided,
                    },
                })),
            )
                .into_response())
        }
    }
}

pub async fn test_voice_clone(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let form = read_form(&state, multipart).await?;
    let audio = form.require_audio()?;
    let name = form
        .field("name", &query)
        .unwrap_or_else(|| "TestVoice".to_string());

    let clip = audio.read_clip().await?;
    let (voice_id, duration) = state.speech.test_clone(&name, &clip).await?;

    Ok(Json(json!({
        "success": true,
        "voice_id": voice_id,
        "audio_duration": duration,
        "message": "Voice cloning test successful!",
    })))
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Value> {
    match state.voices.list_voices().await {
        Ok(voices) => Json(json!({
            "success": true,
            "voices": voices,
        })),
        Err(e) => Json(json!({
            "success": false,
            "error": e.to_string(),
            "voices": [],
        })),
    }
}

pub async fn speed_test(State(state): State<AppState>) -> Json<SpeedTest> {
    Json(state.speech.speed_test().await)
}

pub async fn delete_voice(
    State(state): State<AppState>,
    Path(voice_id): Path<String>,
) -> Result<Json<Value>> {
    let deleted = if state.registry.contains(&voice_id) {
        state.registry.release(state.voices.as_ref(), &voice_id).await
    } else {
        state.voices.delete_voice(&voice_id).await
    };

    if !deleted {
        return Err(Error::BadRequest("Failed to delete voice".to_string()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Voice deleted",
    })))
}
