use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::language::{comparison_units, detect_language, sanitize_reply, DetectedLanguage, Script};
use crate::llm::{ChatMessage, ChatModel, ChatOptions};

const SYSTEM_PROMPT: &str = "You only fix unclear/garbled words while preserving the original language. \
NEVER translate to a different language. Keep the person's natural speech patterns and original language.";

/// Minimal clean-up of stroke-affected speech through the chat model.
///
/// The model is asked to repair garbled words only. Any reply that looks like a
/// rewrite or a translation is discarded and the transcript is spoken as-is.
pub struct TextEnhancer {
    llm: Arc<dyn ChatModel>,
    overedit_threshold: f64,
}

impl TextEnhancer {
    pub fn new(llm: Arc<dyn ChatModel>, overedit_threshold: f64) -> Self {
        Self {
            llm,
            overedit_threshold,
        }
    }

    fn prompt(text: &str, language: &DetectedLanguage) -> String {
        let same_language = match language.script {
            Script::Unknown => "the same language".to_string(),
            _ => format!("the same language ({})", language.name),
        };
        format!(
            "Only fix unclear or garbled words in this speech. KEEP {} - do not translate. \
Keep everything else exactly the same including the original language, natural speaking style, slang, and sentence structure:\n\n\
Original: \"{}\"\n\nFixed (same language):",
            same_language.to_uppercase(),
            text
        )
    }

    fn options() -> ChatOptions {
        ChatOptions {
            max_tokens: Some(100),
            temperature: 0.0,
            top_p: Some(1.0),
            frequency_penalty: Some(0.0),
            presence_penalty: Some(0.0),
        }
    }

    /// Return the repaired text, or `text` unchanged when the repair cannot be trusted
    pub async fn enhance(&self, text: &str, language: &DetectedLanguage) -> String {
        if text.trim().is_empty() || !self.llm.is_configured() {
            return text.to_string();
        }

        let messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(Self::prompt(text, language)),
        ];
        let reply = match self.llm.chat_completion(messages, &Self::options()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Enhancement error: {}", e);
                return text.to_string();
            }
        };

        let enhanced = sanitize_reply(&reply);
        if enhanced.chars().count() < 3 {
            debug!("Enhancement too short, keeping original");
            return text.to_string();
        }

        let original_script = match language.script {
            Script::Unknown => detect_language(text).script,
            script => script,
        };
        let enhanced_script = detect_language(&enhanced).script;
        if original_script != Script::Unknown && !original_script.compatible_with(enhanced_script) {
            warn!(
                "Enhancement changed script ({:?} -> {:?}), keeping original",
                original_script, enhanced_script
            );
            return text.to_string();
        }

        let overlap = token_overlap(text, &enhanced, original_script);
        if overlap < self.overedit_threshold {
            debug!("AI over-edited (overlap {:.2}), returning original", overlap);
            return text.to_string();
        }

        enhanced
    }
}

/// Share of the original's units that survive in the edit
pub fn token_overlap(original: &str, edited: &str, script: Script) -> f64 {
    let original_units = comparison_units(original, script);
    if original_units.is_empty() {
        return 0.0;
    }
    let edited_units: HashSet<String> = comparison_units(edited, script).into_iter().collect();
    let original_set: HashSet<&String> = original_units.iter().collect();

    let shared = original_set
        .iter()
        .filter(|unit| edited_units.contains(unit.as_str()))
        .count();
    shared as f64 / original_units.len() as f64
}
