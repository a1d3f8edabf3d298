use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use super::interface::{Transcriber, Transcript};
use crate::config::OpenAIConfig;
use crate::error::{Error, Result};
use crate::speech::audio::AudioClip;

/// OpenAI Whisper transcription with automatic language detection
pub struct WhisperTranscriber {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl WhisperTranscriber {
    pub fn new(client: Client, config: &OpenAIConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.transcription_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("OpenAI API key not set".to_string()))?;

        let file_part = reqwest::multipart::Part::bytes(clip.data.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.content_type)
            .map_err(|e| Error::Transcription(format!("Failed to create form part: {e}")))?;

        // No language field: Whisper detects it, which keeps non-English speech intact
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("temperature", "0");

        debug!("Sending {} bytes to Whisper", clip.data.len());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Whisper API error: {} - {}", status, error_text);
            return Err(Error::Transcription(format!(
                "Whisper API error: {} - {}",
                status, error_text
            )));
        }

        let whisper: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(format!("Unreadable transcription: {e}")))?;

        Ok(Transcript {
            text: whisper.text.trim().to_string(),
            language: whisper.language,
        })
    }
}
