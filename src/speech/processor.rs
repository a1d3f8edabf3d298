use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::audio::{validate_for_cloning, AudioClip};
use super::enhance::TextEnhancer;
use super::language::{resolve_language, sanitize_transcript, DetectedLanguage};
use crate::asr::Transcriber;
use crate::config::SpeechConfig;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel, ChatOptions};
use crate::tts::{VoiceEngine, VoiceRegistry};

const AUTO_CLONE_NAME: &str = "AutoClone";

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SpeechTiming {
    pub transcription: f64,
    pub voice_cloning: f64,
    pub processing: f64,
    pub total: f64,
}

/// Outcome of one pass through the speech clarity pipeline
#[derive(Debug, Clone)]
pub struct ProcessedSpeech {
    pub original_text: String,
    pub enhanced_text: String,
    pub language: DetectedLanguage,
    pub audio: Vec<u8>,
    pub timing: SpeechTiming,
    /// Voice that produced `audio`, `None` for the vendor default
    pub voice_used: Option<String>,
    pub auto_cloned: bool,
    pub speech_generation_success: bool,
    pub clone_warning: Option<String>,
}

/// Latency of one vendor round trip, or why it failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Ping {
    Seconds(f64),
    Failed(String),
}

impl Ping {
    fn from_result<T>(started: Instant, result: Result<T>) -> Self {
        match result {
            Ok(_) => Ping::Seconds(started.elapsed().as_secs_f64()),
            Err(e) => Ping::Failed(format!("Error: {}", e)),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Ping::Seconds(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeedTest {
    pub openai_ping: Ping,
    pub elevenlabs_ping: Ping,
    pub total_test_time: f64,
    pub status: &'static str,
}

fn round2(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

/// Speech pipeline: transcribe, optionally clone, enhance, synthesize
pub struct SpeechProcessor {
    transcriber: Arc<dyn Transcriber>,
    voices: Arc<dyn VoiceEngine>,
    llm: Arc<dyn ChatModel>,
    enhancer: TextEnhancer,
    registry: VoiceRegistry,
    limits: SpeechConfig,
}

impl SpeechProcessor {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        voices: Arc<dyn VoiceEngine>,
        llm: Arc<dyn ChatModel>,
        registry: VoiceRegistry,
        limits: SpeechConfig,
    ) -> Self {
        let enhancer = TextEnhancer::new(llm.clone(), limits.overedit_threshold);
        Self {
            transcriber,
            voices,
            llm,
            enhancer,
            registry,
            limits,
        }
    }

    /// Run the full pipeline on one recording.
    ///
    /// # Arguments
    /// * `clip` - The uploaded recording
    /// * `voice_id` - Voice to speak with; when absent and `auto_clone` is set the
    ///   speaker's own voice is cloned for this request only
    pub async fn process(
        &self,
        clip: &AudioClip,
        voice_id: Option<String>,
        auto_clone: bool,
    ) -> Result<ProcessedSpeech> {
        let started = Instant::now();

        let transcribe_start = Instant::now();
        let transcript = self.transcriber.transcribe(clip).await?;
        let transcription = transcribe_start.elapsed();
        debug!("Transcribed: '{}' in {:.2}s", transcript.text, transcription.as_secs_f64());

        let spoken = sanitize_transcript(&transcript.text);
        if spoken.is_empty() {
            return Err(Error::Transcription("No speech detected in audio".to_string()));
        }
        let language = resolve_language(&spoken, transcript.language.as_deref());
        info!("Detected language: {} ({})", language.name, language.code);

        let mut clone_warning = None;
        let mut cloned = None;
        let mut voice_cloning = Duration::ZERO;
        if voice_id.is_none() && auto_clone {
            let clone_start = Instant::now();
            match self.clone_validated(AUTO_CLONE_NAME, clip).await {
                Ok(id) => {
                    self.registry.register(&id, AUTO_CLONE_NAME);
                    voice_cloning = clone_start.elapsed();
                    info!("Auto-cloned voice {} in {:.2}s", id, voice_cloning.as_secs_f64());
                    cloned = Some(id);
                }
                Err(e) => {
                    warn!("Auto-cloning failed, using default voice: {}", e);
                    clone_warning = Some(e.to_string());
                }
            }
        }

        let voice = voice_id.or_else(|| cloned.clone());
        let outcome = self.enhance_and_speak(&spoken, &language, voice, cloned.is_some()).await;

        if let Some(id) = &cloned {
            self.registry.release(self.voices.as_ref(), id).await;
        }

        let spoken_result = outcome?;
        let processing = spoken_result.elapsed;
        Ok(ProcessedSpeech {
            original_text: transcript.text.trim().to_string(),
            enhanced_text: spoken_result.text,
            language,
            audio: spoken_result.audio,
            timing: SpeechTiming {
                transcription: round2(transcription),
                voice_cloning: round2(voice_cloning),
                processing: round2(processing),
                total: round2(started.elapsed()),
            },
            voice_used: spoken_result.voice_used,
            auto_cloned: cloned.is_some(),
            speech_generation_success: spoken_result.primary_voice_ok,
            clone_warning: spoken_result.warning.or(clone_warning),
        })
    }

    async fn enhance_and_speak(
        &self,
        text: &str,
        language: &DetectedLanguage,
        voice: Option<String>,
        auto_cloned: bool,
    ) -> Result<Spoken> {
        let started = Instant::now();
        let enhanced = self.enhancer.enhance(text, language).await;

        let Some(voice_id) = voice else {
            let audio = self.voices.synthesize(&enhanced, None).await?;
            return Ok(Spoken {
                text: enhanced,
                audio,
                voice_used: None,
                primary_voice_ok: true,
                warning: None,
                elapsed: started.elapsed(),
            });
        };

        match self.voices.synthesize(&enhanced, Some(&voice_id)).await {
            Ok(audio) => Ok(Spoken {
                text: enhanced,
                audio,
                voice_used: Some(voice_id),
                primary_voice_ok: true,
                warning: None,
                elapsed: started.elapsed(),
            }),
            Err(e) => {
                warn!("Speech generation failed with voice {}: {}", voice_id, e);
                let audio = self.voices.synthesize(&enhanced, None).await?;
                let warning = auto_cloned
                    .then(|| format!("Cloning succeeded but speech generation failed: {}", e));
                Ok(Spoken {
                    text: enhanced,
                    audio,
                    voice_used: None,
                    primary_voice_ok: false,
                    warning,
                    elapsed: started.elapsed(),
                })
            }
        }
    }

    async fn clone_validated(&self, name: &str, clip: &AudioClip) -> Result<String> {
        validate_for_cloning(clip, &self.limits)?;
        self.voices.clone_voice(name, clip).await
    }

    /// Clone a voice the caller keeps
    pub async fn create_profile(&self, name: &str, clip: &AudioClip) -> Result<String> {
        self.clone_validated(name, clip).await
    }

    /// Validate and clone, reporting the sample duration when it is known
    pub async fn test_clone(&self, name: &str, clip: &AudioClip) -> Result<(String, Option<f64>)> {
        let duration = validate_for_cloning(clip, &self.limits)?;
        let voice_id = self.voices.clone_voice(name, clip).await?;
        Ok((voice_id, duration))
    }

    /// Open connections to both vendors in the background
    pub fn warmup(&self) {
        let llm = self.llm.clone();
        tokio::spawn(async move {
            if !llm.is_configured() {
                return;
            }
            match llm.chat_completion(vec![ChatMessage::user("Hi")], &ChatOptions::new(1, 0.0)).await {
                Ok(_) => debug!("OpenAI connection warmed up"),
                Err(e) => debug!("OpenAI warmup failed: {}", e),
            }
        });

        let voices = self.voices.clone();
        tokio::spawn(async move {
            if !voices.is_configured() {
                return;
            }
            match voices.ping().await {
                Ok(()) => debug!("ElevenLabs connection warmed up"),
                Err(e) => debug!("ElevenLabs warmup failed: {}", e),
            }
        });
    }

    /// Time one cheap request against each vendor
    pub async fn speed_test(&self) -> SpeedTest {
        let started = Instant::now();

        let openai = async {
            let t = Instant::now();
            let result = self
                .llm
                .chat_completion(vec![ChatMessage::user("Hi")], &ChatOptions::new(1, 0.0))
                .await;
            Ping::from_result(t, result)
        };
        let elevenlabs = async {
            let t = Instant::now();
            Ping::from_result(t, self.voices.ping().await)
        };
        let (openai_ping, elevenlabs_ping) = tokio::join!(openai, elevenlabs);

        let status = if openai_ping.is_ok() && elevenlabs_ping.is_ok() {
            "APIs are warmed up!"
        } else {
            "Some APIs may be slow"
        };
        SpeedTest {
            openai_ping,
            elevenlabs_ping,
            total_test_time: round2(started.elapsed()),
            status,
        }
    }

    /// Delete every auto-cloned voice still registered
    pub async fn purge_cloned_voices(&self) -> usize {
        self.registry.purge(self.voices.as_ref()).await
    }
}

struct Spoken {
    text: String,
    audio: Vec<u8>,
    voice_used: Option<String>,
    primary_voice_ok: bool,
    warning: Option<String>,
    elapsed: Duration,
}
