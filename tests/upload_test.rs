mod common;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use common::{app, mock_config, multipart_body, multipart_post, send, tone_wav, FilePart};
use strokecare_backend::config::Config;

fn spooled_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn spooling_config(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = mock_config(server);
    config.server.upload_dir = Some(dir.path().to_string_lossy().into_owned());
    config
}

fn recording(data: &[u8]) -> FilePart<'_> {
    FilePart {
        name: "audio",
        file_name: "recording.wav",
        content_type: "audio/wav",
        data,
    }
}

#[tokio::test]
async fn test_upload_is_spooled_until_the_reply_is_sent() -> Result<()> {
    let server = MockServer::start();
    let _whisper = server.mock(|when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(200)
            .delay(Duration::from_millis(1500))
            .json_body(json!({ "text": "Good morning", "language": "english" }));
    });
    let _chat = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Good morning." } }]
        }));
    });
    let _tts = server.mock(|when, then| {
        when.method(POST).path("/v1/text-to-speech/saved-voice");
        then.status(200).header("content-type", "audio/mpeg").body(b"ID3\x04");
    });
    let dir = TempDir::new()?;

    let wav = tone_wav(6.0, 16000);
    let body = multipart_body(Some(recording(&wav)), &[("voice_id", "saved-voice")]);
    let in_flight = tokio::spawn(send(
        app(spooling_config(&server, &dir)).await?,
        multipart_post("/api/process-speech-fast", body)?,
    ));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let during = spooled_files(dir.path())?;
    assert_eq!(during.len(), 1, "{:?}", during);
    assert!(during[0].starts_with("user_voice_"));
    assert!(during[0].ends_with(".wav"));

    let (status, reply) = in_flight.await??;
    assert_eq!(status, 200, "{}", reply);
    assert!(spooled_files(dir.path())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_error_replies_leave_no_spooled_files() -> Result<()> {
    let server = MockServer::start();
    let _whisper = server.mock(|when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(500).body("model overloaded");
    });
    let dir = TempDir::new()?;

    let text = FilePart {
        name: "audio",
        file_name: "notes.txt",
        content_type: "text/plain",
        data: b"not a recording",
    };
    let (status, _) = send(
        app(spooling_config(&server, &dir)).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(text), &[]))?,
    )
    .await?;
    assert_eq!(status, 400);
    assert!(spooled_files(dir.path())?.is_empty());

    let wav = tone_wav(2.0, 16000);
    let (status, reply) = send(
        app(spooling_config(&server, &dir)).await?,
        multipart_post(
            "/api/process-speech-fast",
            multipart_body(Some(recording(&wav)), &[("auto_clone", "false")]),
        )?,
    )
    .await?;
    assert_eq!(status, 500);
    assert!(reply["error"].as_str().unwrap().starts_with("Transcription failed"));
    assert!(spooled_files(dir.path())?.is_empty());

    let (status, _) = send(
        app(spooling_config(&server, &dir)).await?,
        multipart_post("/api/test-voice-clone", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;
    assert_eq!(status, 400);
    assert!(spooled_files(dir.path())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() -> Result<()> {
    let server = MockServer::start();
    let whisper = server.mock(|when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(200).json_body(json!({ "text": "unused" }));
    });
    let dir = TempDir::new()?;
    let mut config = spooling_config(&server, &dir);
    config.server.max_upload_bytes = 1024 * 1024;

    // 40 s of 16 kHz mono 16-bit audio is about 1.3 MB
    let wav = tone_wav(40.0, 16000);
    let (status, reply) = send(
        app(config).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;

    assert_eq!(status, 400);
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "Audio file too large (max 1MB)");
    assert_eq!(whisper.hits(), 0);
    assert!(spooled_files(dir.path())?.is_empty());
    Ok(())
}
