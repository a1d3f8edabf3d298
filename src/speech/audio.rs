use std::io::Cursor;

use tracing::{debug, warn};

use crate::config::SpeechConfig;
use crate::error::{Error, Result};

/// Uploaded audio held in memory for the vendor calls
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            data,
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Basic WAV properties, when the clip parses as WAV
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub duration_secs: f64,
    pub channels: u16,
    pub sample_rate: u32,
}

pub fn wav_info(data: &[u8]) -> Option<WavInfo> {
    let reader = hound::WavReader::new(Cursor::new(data)).ok()?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }
    Some(WavInfo {
        duration_secs: reader.duration() as f64 / spec.sample_rate as f64,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Check that a clip is long and large enough to clone a voice from.
/// Returns the duration in seconds when the clip is WAV.
pub fn validate_for_cloning(clip: &AudioClip, limits: &SpeechConfig) -> Result<Option<f64>> {
    let size = clip.len() as u64;
    debug!("Audio file size: {} bytes", size);

    if size == 0 {
        return Err(Error::AudioValidation("Audio file is empty".to_string()));
    }
    if size > limits.max_clone_bytes {
        return Err(Error::AudioValidation(format!(
            "Audio file too large (max {}MB)",
            limits.max_clone_bytes / (1024 * 1024)
        )));
    }
    if size < limits.min_clone_bytes {
        return Err(Error::AudioValidation(
            "Audio file too small - need at least 10-30 seconds of clear speech".to_string(),
        ));
    }

    let Some(info) = wav_info(&clip.data) else {
        warn!("Could not parse as WAV, but will attempt cloning anyway");
        return Ok(None);
    };

    debug!(
        "Audio duration: {:.2}s, channels: {}, sample_rate: {}",
        info.duration_secs, info.channels, info.sample_rate
    );

    if info.duration_secs < limits.min_clone_seconds {
        return Err(Error::AudioValidation(format!(
            "Audio too short ({:.1}s) - need at least 10-30 seconds for good cloning",
            info.duration_secs
        )));
    }
    if info.duration_secs > limits.long_clone_seconds {
        warn!(
            "Audio very long ({:.1}s) - this may take time to process",
            info.duration_secs
        );
    }

    Ok(Some(info.duration_secs))
}

#[cfg(test)]
pub(crate) fn sine_wav(seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let samples = (seconds * sample_rate as f64) as u32;
        for i in 0..samples {
            let t = i as f64 / sample_rate as f64;
            let value = (t * 220.0 * std::f64::consts::TAU).sin() * 8000.0;
            writer.write_sample(value as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
