use std::collections::HashMap;
use std::path::Path;

use axum::extract::multipart::{Field, Multipart};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::audio::AudioClip;
use crate::error::{Error, Result};

/// An uploaded audio field streamed to a temporary file.
///
/// The file is unlinked when the value is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct SpooledUpload {
    file: NamedTempFile,
    file_name: String,
    content_type: Option<String>,
    size: u64,
}

impl SpooledUpload {
    /// Stream `field` to disk, refusing anything larger than `max_bytes`
    ///
    /// The file goes to `spool_dir`, or the system temp directory when unset.
    pub async fn from_field(mut field: Field<'_>, max_bytes: u64, spool_dir: Option<&Path>) -> Result<Self> {
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(|c| c.to_string());

        let mut builder = tempfile::Builder::new();
        builder.prefix("user_voice_").suffix(".wav");
        let file = match spool_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        let mut writer = tokio::fs::File::from_std(file.reopen()?);

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > max_bytes {
                return Err(Error::BadRequest(format!(
                    "Audio file too large (max {}MB)",
                    max_bytes / (1024 * 1024)
                )));
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        debug!("Saved audio to: {} ({} bytes)", file.path().display(), size);

        Ok(Self {
            file,
            file_name,
            content_type,
            size,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Anything but `audio/*` or an untyped binary upload is rejected
    pub fn is_audio(&self) -> bool {
        match self.content_type.as_deref() {
            None => true,
            Some(ct) => ct.starts_with("audio/") || ct == "application/octet-stream",
        }
    }

    pub async fn read_clip(&self) -> Result<AudioClip> {
        let mut data = Vec::with_capacity(self.size as usize);
        let mut reader = tokio::fs::File::from_std(self.file.reopen()?);
        reader.read_to_end(&mut data).await?;

        let file_name = if self.file_name.is_empty() {
            "audio.wav".to_string()
        } else {
            self.file_name.clone()
        };
        let content_type = self
            .content_type
            .clone()
            .filter(|ct| ct.starts_with("audio/"))
            .unwrap_or_else(|| "audio/wav".to_string());

        Ok(AudioClip::new(data, file_name, content_type))
    }
}

/// Multipart body of the speech endpoints: one `audio` file plus text fields
#[derive(Debug, Default)]
pub struct SpeechForm {
    pub audio: Option<SpooledUpload>,
    pub fields: HashMap<String, String>,
}

impl SpeechForm {
    pub async fn read(mut multipart: Multipart, max_bytes: u64, spool_dir: Option<&Path>) -> Result<Self> {
        let mut form = SpeechForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(|n| n.to_string()) else {
                continue;
            };
            if name == "audio" {
                form.audio = Some(SpooledUpload::from_field(field, max_bytes, spool_dir).await?);
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }

        Ok(form)
    }

    /// Form field, falling back to the query string
    pub fn field(&self, name: &str, query: &HashMap<String, String>) -> Option<String> {
        self.fields
            .get(name)
            .or_else(|| query.get(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// The audio upload, validated the way every speech endpoint needs it
    pub fn require_audio(&self) -> Result<&SpooledUpload> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| Error::BadRequest("No audio file provided".to_string()))?;
        if audio.file_name().is_empty() {
            return Err(Error::BadRequest("No file selected".to_string()));
        }
        if !audio.is_audio() {
            return Err(Error::BadRequest("File must be an audio file".to_string()));
        }
        Ok(audio)
    }
}
