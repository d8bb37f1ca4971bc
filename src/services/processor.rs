use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::ToSchema;

/// What a processor hands back for one recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProcessingResult {
    pub transcript: String,
    pub summary: String,
}

/// Trait for transcription/summarization backends.
///
/// Implementations receive the path of a staged upload that stays on disk
/// until the call returns. They must not hold on to the path afterwards.
#[async_trait::async_trait]
pub trait AudioProcessor: Send + Sync {
    async fn process(&self, audio_path: &Path, label: &str) -> Result<ProcessingResult>;

    /// Short identifier used in logs and the health report
    fn name(&self) -> &'static str;
}

/// Stand-in processor that never reads the audio
pub struct PlaceholderProcessor;

#[async_trait::async_trait]
impl AudioProcessor for PlaceholderProcessor {
    async fn process(&self, audio_path: &Path, label: &str) -> Result<ProcessingResult> {
        tracing::debug!("Placeholder processing {:?} as '{}'", audio_path, label);
        Ok(ProcessingResult {
            transcript: format!("Transcript of {}", label),
            summary: format!("Summary of {}", label),
        })
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}
