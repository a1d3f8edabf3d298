pub mod elevenlabs;
pub mod interface;
pub mod registry;

pub use elevenlabs::ElevenLabsClient;
pub use interface::{VoiceEngine, VoiceSummary};
pub use registry::VoiceRegistry;
