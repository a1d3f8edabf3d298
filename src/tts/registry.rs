use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

use super::interface::VoiceEngine;

#[derive(Debug, Clone)]
pub struct ClonedVoice {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Auto-cloned voices that still exist at the vendor.
///
/// A voice is registered right after cloning and released once it has been deleted,
/// so whatever is left at shutdown is purged.
#[derive(Clone, Default)]
pub struct VoiceRegistry {
    voices: Arc<DashMap<String, ClonedVoice>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, voice_id: &str, name: &str) {
        self.voices.insert(
            voice_id.to_string(),
            ClonedVoice {
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub fn contains(&self, voice_id: &str) -> bool {
        self.voices.contains_key(voice_id)
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Delete one registered voice. The entry is kept when the vendor refuses.
    pub async fn release(&self, engine: &dyn VoiceEngine, voice_id: &str) -> bool {
        let deleted = engine.delete_voice(voice_id).await;
        if deleted {
            self.voices.remove(voice_id);
        } else {
            warn!("Cloned voice {} could not be deleted, kept for purge", voice_id);
        }
        deleted
    }

    /// Delete every registered voice, returning how many are gone
    pub async fn purge(&self, engine: &dyn VoiceEngine) -> usize {
        let leftovers: Vec<(String, ClonedVoice)> = self
            .voices
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        if leftovers.is_empty() {
            return 0;
        }

        info!("Purging {} cloned voice(s)", leftovers.len());
        let mut purged = 0;
        for (id, voice) in leftovers {
            let age = Utc::now().signed_duration_since(voice.created_at);
            info!(
                "Purging voice {} ({}), cloned {}s ago",
                id,
                voice.name,
                age.num_seconds()
            );
            if self.release(engine, &id).await {
                purged += 1;
            }
        }
        purged
    }
}
