use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use super::interface::{VoiceEngine, VoiceSummary};
use crate::config::{ElevenLabsConfig, VoiceSettings};
use crate::error::{Error, Result};
use crate::speech::audio::AudioClip;
use crate::utils::retry::{send_with_retry, RetryPolicy};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// ElevenLabs text-to-speech and instant voice cloning
pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    default_voice_id: String,
    model_id: String,
    voice_settings: VoiceSettings,
    tts_timeout: Duration,
    clone_timeout: Duration,
    delete_timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

#[derive(Debug, Deserialize)]
struct AddVoiceResponse {
    #[serde(default)]
    voice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

impl ElevenLabsClient {
    pub fn new(client: Client, config: &ElevenLabsConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_voice_id: config.default_voice_id.clone(),
            model_id: config.model_id.clone(),
            voice_settings: config.voice_settings.clone(),
            tts_timeout: Duration::from_secs(config.tts_timeout_secs),
            clone_timeout: Duration::from_secs(config.clone_timeout_secs),
            delete_timeout: Duration::from_secs(config.delete_timeout_secs),
            retry,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("ElevenLabs API key not set".to_string()))
    }
}

/// Map a failed `/voices/add` response to the message shown to the user
fn clone_failure_message(status: StatusCode, body: &str) -> String {
    match status {
        StatusCode::UNPROCESSABLE_ENTITY => match serde_json::from_str::<serde_json::Value>(body) {
            Ok(detail) => {
                let specific = detail
                    .get("detail")
                    .and_then(|d| d.as_array())
                    .and_then(|items| items.first())
                    .map(|first| {
                        first
                            .get("msg")
                            .and_then(|m| m.as_str())
                            .unwrap_or("Audio quality insufficient")
                            .to_string()
                    });
                match specific {
                    Some(msg) => format!("Audio not suitable for cloning: {}", msg),
                    None => "Audio quality insufficient for cloning - try recording 10-30 seconds of clear speech"
                        .to_string(),
                }
            }
            Err(_) => "Audio validation failed - may need longer or clearer recording".to_string(),
        },
        StatusCode::UNAUTHORIZED => "ElevenLabs API key invalid or expired".to_string(),
        StatusCode::TOO_MANY_REQUESTS => {
            "ElevenLabs rate limit exceeded - please wait and try again".to_string()
        }
        other => {
            let snippet: String = body.chars().take(200).collect();
            format!("ElevenLabs API error {}: {}", other.as_u16(), snippet)
        }
    }
}

fn clone_transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Voice cloning timed out - audio may be too long or server busy".to_string()
    } else if err.is_connect() {
        "Cannot connect to ElevenLabs - check internet connection".to_string()
    } else {
        err.to_string()
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[async_trait]
impl VoiceEngine for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>> {
        let api_key = self.api_key()?;
        let voice_id = voice_id
            .filter(|v| !v.is_empty())
            .unwrap_or(self.default_voice_id.as_str());
        debug!("Generating speech with voice ID: {}", voice_id);

        let body = SynthesisRequest {
            text,
            model_id: &self.model_id,
            voice_settings: &self.voice_settings,
        };
        let request = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, voice_id))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", api_key)
            .json(&body)
            .timeout(self.tts_timeout);

        let response = send_with_retry(request, &self.retry, "ElevenLabs TTS")
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            error!("Speech generation error: {} - {}", status, text);
            return Err(Error::Synthesis(format!(
                "ElevenLabs API error: {} - {}",
                status.as_u16(),
                text
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        Ok(audio.to_vec())
    }

    async fn clone_voice(&self, name: &str, clip: &AudioClip) -> Result<String> {
        let api_key = self.api_key()?;
        info!("Starting voice clone for '{}' ({} bytes)", name, clip.data.len());

        let file_part = reqwest::multipart::Part::bytes(clip.data.clone())
            .file_name(format!("{}_voice.wav", name))
            .mime_str("audio/wav")
            .map_err(|e| Error::VoiceClone(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("files", file_part)
            .text("name", format!("{}_{}", name, unix_seconds()))
            .text("description", format!("Auto-cloned voice for {}", name))
            .text("remove_background_noise", "true")
            .text("enhance_audio_quality", "true");

        let response = self
            .client
            .post(format!("{}/voices/add", self.base_url))
            .header("xi-api-key", api_key)
            .multipart(form)
            .timeout(self.clone_timeout)
            .send()
            .await
            .map_err(|e| Error::VoiceClone(clone_transport_message(&e)))?;

        let status = response.status();
        debug!("Clone response status: {}", status);

        if status == StatusCode::OK {
            let result: AddVoiceResponse = response
                .json()
                .await
                .map_err(|e| Error::VoiceClone(e.to_string()))?;
            return match result.voice_id {
                Some(voice_id) => {
                    info!("Voice cloned with ID: {}", voice_id);
                    Ok(voice_id)
                }
                None => Err(Error::VoiceClone(
                    "No voice_id in successful response".to_string(),
                )),
            };
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Voice cloning rejected: {} - {}", status, body);
        Err(Error::VoiceClone(clone_failure_message(status, &body)))
    }

    async fn delete_voice(&self, voice_id: &str) -> bool {
        let Ok(api_key) = self.api_key() else {
            return false;
        };

        let result = self
            .client
            .delete(format!("{}/voices/{}", self.base_url, voice_id))
            .header("xi-api-key", api_key)
            .timeout(self.delete_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                info!("Voice {} deleted successfully", voice_id);
                true
            }
            Ok(response) if response.status() == StatusCode::UNPROCESSABLE_ENTITY => {
                info!("Voice {} not found or already deleted", voice_id);
                true
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                warn!("Failed to delete voice {}: {} - {}", voice_id, status, text);
                false
            }
            Err(e) => {
                warn!("Error deleting voice {}: {}", voice_id, e);
                false
            }
        }
    }

    async fn list_voices(&self) -> Result<Vec<VoiceSummary>> {
        let api_key = self.api_key()?;
        let request = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", api_key)
            .timeout(self.tts_timeout);
        let response = send_with_retry(request, &self.retry, "ElevenLabs voices").await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Synthesis(format!("API error: {}", status.as_u16())));
        }

        let voices: VoicesResponse = response.json().await?;
        Ok(voices
            .voices
            .into_iter()
            .map(|v| VoiceSummary {
                voice_id: v.voice_id,
                name: v.name,
                category: v.category.unwrap_or_else(|| "cloned".to_string()),
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        let api_key = self.api_key()?;
        self.client
            .get(format!("{}/voices", self.base_url))
            .header("xi-api-key", api_key)
            .timeout(PING_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
