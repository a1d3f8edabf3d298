use std::sync::Arc;
use std::time::Duration;

use crate::asr::{Transcriber, WhisperTranscriber};
use crate::config::Config;
use crate::llm::{ChatModel, OpenAIChat};
use crate::places::PlacesClient;
use crate::search::{FacilitySearch, RelevanceAnalyzer};
use crate::speech::SpeechProcessor;
use crate::tts::{ElevenLabsClient, VoiceEngine, VoiceRegistry};
use crate::utils::retry::RetryPolicy;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub search: Arc<FacilitySearch>,
    pub speech: Arc<SpeechProcessor>,
    pub voices: Arc<dyn VoiceEngine>,
    pub registry: VoiceRegistry,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // One connection pool shared by every vendor client
        let http = reqwest::Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let retry = RetryPolicy::from(&config.retry);

        let places = PlacesClient::new(http.clone(), &config.google, retry);
        let llm: Arc<dyn ChatModel> = Arc::new(OpenAIChat::new(http.clone(), &config.openai, retry));
        let transcriber: Arc<dyn Transcriber> = Arc::new(WhisperTranscriber::new(http.clone(), &config.openai));
        let voices: Arc<dyn VoiceEngine> = Arc::new(ElevenLabsClient::new(http, &config.elevenlabs, retry));
        let registry = VoiceRegistry::new();

        let search = FacilitySearch::new(
            places,
            RelevanceAnalyzer::new(llm.clone()),
            config.search.clone(),
            config.google.search_radius_meters,
        );
        let speech = SpeechProcessor::new(
            transcriber,
            voices.clone(),
            llm,
            registry.clone(),
            config.speech.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            search: Arc::new(search),
            speech: Arc::new(speech),
            voices,
            registry,
        })
    }
}
