pub mod interface;
pub mod openai;

pub use interface::{ChatMessage, ChatModel, ChatOptions};
pub use openai::OpenAIChat;
