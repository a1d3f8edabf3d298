use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::speech::audio::AudioClip;

/// A voice known to the speech vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSummary {
    pub voice_id: String,
    pub name: String,
    pub category: String,
}

/// Speech synthesis and voice cloning interface
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Synthesize `text` and return the encoded audio (MPEG)
    ///
    /// # Arguments
    /// * `text` - The text to speak
    /// * `voice_id` - Voice to use; the configured default voice when `None`
    async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>>;

    /// Build a voice profile from a speech sample and return its identifier
    async fn clone_voice(&self, name: &str, clip: &AudioClip) -> Result<String>;

    /// Delete a voice. `true` when the voice no longer exists afterwards.
    async fn delete_voice(&self, voice_id: &str) -> bool;

    async fn list_voices(&self) -> Result<Vec<VoiceSummary>>;

    /// Cheap authenticated round trip, used for warmup and latency checks
    async fn ping(&self) -> Result<()>;

    fn is_configured(&self) -> bool;
}
