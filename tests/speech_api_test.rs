mod common;

use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;

use common::{app, mock_config, multipart_body, multipart_post, send, tone_wav, FilePart};

const DEFAULT_VOICE: &str = "29vD33N1CtxCmqQRPOHJ";
const MP3_BYTES: &[u8] = b"ID3\x04";

fn mock_whisper<'a>(server: &'a MockServer, text: &str) -> httpmock::Mock<'a> {
    let text = text.to_string();
    server.mock(move |when, then| {
        when.method(POST).path("/v1/audio/transcriptions");
        then.status(200).json_body(json!({
            "text": text,
            "language": "english",
            "duration": 6.0
        }));
    })
}

fn mock_chat<'a>(server: &'a MockServer, reply: &str) -> httpmock::Mock<'a> {
    let reply = reply.to_string();
    server.mock(move |when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply } }]
        }));
    })
}

fn mock_tts<'a>(server: &'a MockServer, voice_id: &str, status: u16) -> httpmock::Mock<'a> {
    let path = format!("/v1/text-to-speech/{}", voice_id);
    server.mock(move |when, then| {
        when.method(POST).path(path);
        if status == 200 {
            then.status(200)
                .header("content-type", "audio/mpeg")
                .body(MP3_BYTES);
        } else {
            then.status(status).body("voice not ready");
        }
    })
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
async fn test_speech_uses_and_deletes_auto_clone() -> Result<()> {
    let server = MockServer::start();
    let whisper = mock_whisper(&server, "I want... water  please");
    let chat = mock_chat(&server, "I want water please.");
    let clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "clone-123" }));
    });
    let tts = mock_tts(&server, "clone-123", 200);
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/v1/voices/clone-123");
        then.status(200).json_body(json!({ "status": "ok" }));
    });

    let wav = tone_wav(6.0, 16000);
    let body = multipart_body(Some(recording(&wav)), &[]);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", body)?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    whisper.assert();
    chat.assert();
    clone.assert();
    tts.assert();
    delete.assert();

    assert_eq!(reply["success"], true);
    assert_eq!(reply["original_text"], "I want... water  please");
    assert_eq!(reply["enhanced_text"], "I want water please.");
    assert_eq!(reply["detected_language"]["code"], "en");
    assert_eq!(reply["detected_language"]["name"], "English");
    assert_eq!(reply["audio_base64"], "49443304");
    assert_eq!(reply["voice_used"], "clone-123");
    assert_eq!(reply["auto_cloned"], true);
    assert_eq!(reply["speech_generation_success"], true);
    assert_eq!(reply["speed_optimized"], true);
    assert!(reply.get("clone_warning").is_none());
    assert!(reply["timing"]["total"].as_f64().is_some());
    Ok(())
}

#[tokio::test]
async fn test_clone_rejection_falls_back_to_default_voice() -> Result<()> {
    let server = MockServer::start();
    let _whisper = mock_whisper(&server, "I need my medicine");
    let _chat = mock_chat(&server, "I need my medicine.");
    let _clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(401).json_body(json!({ "detail": "invalid api key" }));
    });
    let tts = mock_tts(&server, DEFAULT_VOICE, 200);

    let wav = tone_wav(6.0, 16000);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    tts.assert();
    assert_eq!(reply["auto_cloned"], false);
    assert_eq!(reply["voice_used"], "default");
    assert_eq!(reply["speech_generation_success"], true);
    assert_eq!(
        reply["clone_warning"],
        "Voice cloning failed: ElevenLabs API key invalid or expired"
    );
    Ok(())
}

#[tokio::test]
async fn test_short_recording_is_not_cloned() -> Result<()> {
    let server = MockServer::start();
    let _whisper = mock_whisper(&server, "Hello");
    let _chat = mock_chat(&server, "Hello.");
    let clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "never" }));
    });
    let _tts = mock_tts(&server, DEFAULT_VOICE, 200);

    let wav = tone_wav(2.0, 16000);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    assert_eq!(clone.hits(), 0);
    assert!(reply["clone_warning"]
        .as_str()
        .unwrap()
        .starts_with("Audio validation failed: Audio too short (2.0s)"));
    Ok(())
}

#[tokio::test]
async fn test_cloned_voice_failure_retries_default_voice() -> Result<()> {
    let server = MockServer::start();
    let _whisper = mock_whisper(&server, "Call my daughter");
    let _chat = mock_chat(&server, "Call my daughter.");
    let _clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "clone-456" }));
    });
    let cloned_tts = mock_tts(&server, "clone-456", 400);
    let default_tts = mock_tts(&server, DEFAULT_VOICE, 200);
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/v1/voices/clone-456");
        then.status(200);
    });

    let wav = tone_wav(6.0, 16000);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    cloned_tts.assert();
    default_tts.assert();
    delete.assert();
    assert_eq!(reply["auto_cloned"], true);
    assert_eq!(reply["voice_used"], "default");
    assert_eq!(reply["speech_generation_success"], false);
    assert!(reply["clone_warning"]
        .as_str()
        .unwrap()
        .starts_with("Cloning succeeded but speech generation failed"));
    Ok(())
}

#[tokio::test]
async fn test_explicit_voice_id_skips_cloning() -> Result<()> {
    let server = MockServer::start();
    let _whisper = mock_whisper(&server, "Good morning");
    let _chat = mock_chat(&server, "Good morning.");
    let clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "never" }));
    });
    let tts = mock_tts(&server, "saved-voice", 200);

    let wav = tone_wav(6.0, 16000);
    let body = multipart_body(Some(recording(&wav)), &[("voice_id", "saved-voice")]);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", body)?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    assert_eq!(clone.hits(), 0);
    tts.assert();
    assert_eq!(reply["voice_used"], "saved-voice");
    assert_eq!(reply["auto_cloned"], false);
    Ok(())
}

#[tokio::test]
async fn test_empty_transcript_reports_debug_info() -> Result<()> {
    let server = MockServer::start();
    let _whisper = mock_whisper(&server, "   ");
    let tts = mock_tts(&server, DEFAULT_VOICE, 200);

    let wav = tone_wav(1.0, 16000);
    let body = multipart_body(Some(recording(&wav)), &[("auto_clone", "false")]);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", body)?,
    )
    .await?;

    assert_eq!(status, 500);
    assert_eq!(tts.hits(), 0);
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "Transcription failed: No speech detected in audio");
    assert_eq!(reply["debug_info"]["auto_clone_attempted"], false);
    assert_eq!(reply["debug_info"]["voice_id_provided"], false);
    Ok(())
}

#[tokio::test]
async fn test_missing_audio_is_rejected() -> Result<()> {
    let server = MockServer::start();
    let whisper = mock_whisper(&server, "unused");

    let body = multipart_body(None, &[("voice_id", "abc")]);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", body)?,
    )
    .await?;

    assert_eq!(status, 400);
    assert_eq!(reply["error"], "No audio file provided");
    assert_eq!(whisper.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_non_audio_upload_is_rejected() -> Result<()> {
    let server = MockServer::start();
    let whisper = mock_whisper(&server, "unused");

    let file = FilePart {
        name: "audio",
        file_name: "notes.txt",
        content_type: "text/plain",
        data: b"not a recording",
    };
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/process-speech-fast", multipart_body(Some(file), &[]))?,
    )
    .await?;

    assert_eq!(status, 400);
    assert_eq!(reply["error"], "File must be an audio file");
    assert_eq!(whisper.hits(), 0);
    Ok(())
}

#[tokio::test]
async fn test_create_voice_profile_keeps_the_voice() -> Result<()> {
    let server = MockServer::start();
    let clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "profile-789" }));
    });
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/v1/voices/profile-789");
        then.status(200);
    });

    let wav = tone_wav(6.0, 16000);
    let body = multipart_body(Some(recording(&wav)), &[("name", "Grandpa")]);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/create-voice-profile", body)?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    clone.assert();
    assert_eq!(delete.hits(), 0);
    assert_eq!(reply["voice_id"], "profile-789");
    assert_eq!(reply["message"], "Voice profile 'Grandpa' created successfully!");
    Ok(())
}

#[tokio::test]
async fn test_voice_clone_test_reports_duration() -> Result<()> {
    let server = MockServer::start();
    let _clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "test-voice" }));
    });

    let wav = tone_wav(6.0, 16000);
    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post("/api/test-voice-clone", multipart_body(Some(recording(&wav)), &[]))?,
    )
    .await?;

    assert_eq!(status, 200, "{}", reply);
    assert_eq!(reply["success"], true);
    assert_eq!(reply["voice_id"], "test-voice");
    assert_eq!(reply["message"], "Voice cloning test successful!");
    let duration = reply["audio_duration"].as_f64().unwrap();
    assert!((duration - 6.0).abs() < 0.01);
    Ok(())
}

#[tokio::test]
async fn test_voice_profile_rejects_tiny_upload() -> Result<()> {
    let server = MockServer::start();
    let clone = server.mock(|when, then| {
        when.method(POST).path("/v1/voices/add");
        then.status(200).json_body(json!({ "voice_id": "never" }));
    });

    let (status, reply) = send(
        app(mock_config(&server)).await?,
        multipart_post(
            "/api/create-voice-profile",
            multipart_body(Some(recording(b"RIFF")), &[]),
        )?,
    )
    .await?;

    assert_eq!(status, 400);
    assert_eq!(clone.hits(), 0);
    assert_eq!(
        reply["error"],
        "Audio validation failed: Audio file too small - need at least 10-30 seconds of clear speech"
    );
    Ok(())
}
