pub mod audio;
pub mod enhance;
pub mod language;
pub mod processor;
pub mod upload;

pub use audio::AudioClip;
pub use enhance::TextEnhancer;
pub use language::{detect_language, DetectedLanguage};
pub use processor::{ProcessedSpeech, SpeechProcessor, SpeedTest};
pub use upload::{SpeechForm, SpooledUpload};
