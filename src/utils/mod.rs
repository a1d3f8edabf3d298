pub mod logger;
pub mod retry;
pub mod tts_preprocessor;
