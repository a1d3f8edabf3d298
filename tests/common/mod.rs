#![allow(dead_code)]

use std::io::Cursor;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use httpmock::MockServer;
use serde_json::Value;
use tower::ServiceExt;

use strokecare_backend::build_app;
use strokecare_backend::config::Config;
use strokecare_backend::state::AppState;

pub const BOUNDARY: &str = "strokecare-test-boundary";

/// Config whose vendor endpoints all point at `server`
pub fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();

    config.google.api_key = Some("google-test-key".to_string());
    config.google.geocode_url = server.url("/maps/api/geocode/json");
    config.google.places_base_url = server.base_url();

    config.openai.api_key = Some("sk-test".to_string());
    config.openai.base_url = server.url("/v1");

    config.elevenlabs.api_key = Some("xi-test".to_string());
    config.elevenlabs.base_url = server.url("/v1");

    config.retry.max_retries = 0;
    config.speech.warmup = false;
    config
}

pub async fn app(config: Config) -> Result<Router> {
    Ok(build_app(AppState::new(config).await?))
}

pub async fn send(app: Router, request: Request<Body>) -> Result<(u16, Value)> {
    let response: Response<Body> = app.oneshot(request).await?;
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

pub fn json_post(uri: &str, body: &Value) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

pub fn get(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder().method("GET").uri(uri).body(Body::empty())?)
}

/// One file part of a multipart body
pub struct FilePart<'a> {
    pub name: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

pub fn multipart_body(file: Option<FilePart<'_>>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(file) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.name, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n", name, value).as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_post(uri: &str, body: Vec<u8>) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))?)
}

/// A mono 16-bit WAV tone
pub fn tone_wav(seconds: f64, sample_rate: u32) -> Vec<u8> {
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
            let value = (t * 330.0 * std::f64::consts::TAU).sin() * 6000.0;
            writer.write_sample(value as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
