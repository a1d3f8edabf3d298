//! ASR interface - transcription is delegated to a hosted model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::speech::audio::AudioClip;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Language reported by the model (ISO-639-1 code or English name)
    pub language: Option<String>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript>;
}
