pub mod interface;
pub mod whisper;

pub use interface::{Transcriber, Transcript};
pub use whisper::WhisperTranscriber;
