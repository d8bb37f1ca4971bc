#![allow(dead_code)]

use anyhow::anyhow;
use audio_notes_server::config::ServerConfig;
use audio_notes_server::services::processor::{AudioProcessor, ProcessingResult};
use audio_notes_server::{AppState, create_app};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

pub fn audio(data: &[u8]) -> Part<'_> {
    Part::File {
        name: "audio_data",
        filename: "recording.webm",
        content_type: Some("audio/webm"),
        data,
    }
}

pub fn label(value: &str) -> Part<'_> {
    Part::Text {
        name: "filename",
        value,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                if let Some(content_type) = content_type {
                    body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process_audio")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "non-JSON body with status {}: {:?}",
            status,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}

pub fn upload_dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Test app over a fresh scratch directory. The `TempDir` must outlive the app.
pub fn test_app(processor: Arc<dyn AudioProcessor>) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig::development(dir.path());
    (app_with_config(config, processor), dir)
}

pub fn app_with_config(config: ServerConfig, processor: Arc<dyn AudioProcessor>) -> Router {
    create_app(AppState::new(config, processor))
}

#[derive(Debug, Clone)]
pub struct SeenCall {
    pub path: PathBuf,
    pub label: String,
    pub existed: bool,
    pub bytes: Vec<u8>,
}

pub enum Behaviour {
    Echo,
    Fail,
    DeleteFileFirst,
}

/// Processor that records what it was given and answers like the
/// placeholder unless told to misbehave.
pub struct RecordingProcessor {
    pub calls: Mutex<Vec<SeenCall>>,
    behaviour: Behaviour,
}

impl RecordingProcessor {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            behaviour,
        })
    }

    pub fn calls(&self) -> Vec<SeenCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AudioProcessor for RecordingProcessor {
    async fn process(&self, audio_path: &Path, label: &str) -> anyhow::Result<ProcessingResult> {
        let bytes = tokio::fs::read(audio_path).await.unwrap_or_default();
        self.calls.lock().unwrap().push(SeenCall {
            path: audio_path.to_path_buf(),
            label: label.to_string(),
            existed: audio_path.exists(),
            bytes,
        });

        // Let other requests interleave with this one.
        tokio::task::yield_now().await;

        match self.behaviour {
            Behaviour::Echo => {}
            Behaviour::Fail => return Err(anyhow!("transcription backend unavailable")),
            Behaviour::DeleteFileFirst => tokio::fs::remove_file(audio_path).await?,
        }

        Ok(ProcessingResult {
            transcript: format!("Transcript of {}", label),
            summary: format!("Summary of {}", label),
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
