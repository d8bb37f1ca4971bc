use crate::api::error::AppError;
use crate::config::ServerConfig;
use crate::services::processor::{AudioProcessor, ProcessingResult};
use crate::services::temp_upload::TemporaryUpload;
use crate::utils::validation::{resolve_label, validate_audio_content_type};
use std::sync::Arc;
use tokio::io::AsyncRead;

/// One inbound request after the multipart body has been read
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub upload: Option<TemporaryUpload>,
    pub label: Option<String>,
}

/// Stages uploads on disk, runs the processor against them and guarantees
/// the staged file is gone before a response is produced.
pub struct UploadCleanupHandler {
    processor: Arc<dyn AudioProcessor>,
    config: Arc<ServerConfig>,
}

impl UploadCleanupHandler {
    pub fn new(processor: Arc<dyn AudioProcessor>, config: Arc<ServerConfig>) -> Self {
        Self { processor, config }
    }

    pub fn processor_name(&self) -> &'static str {
        self.processor.name()
    }

    /// Persist one file part to a fresh temp upload. On any error the
    /// partially written file is dropped, and with it removed.
    pub async fn stage<'a>(
        &self,
        content_type: Option<&str>,
        reader: impl AsyncRead + Unpin + Send + 'a,
    ) -> Result<TemporaryUpload, AppError> {
        if self.config.enforce_audio_mime {
            if let Some(content_type) = content_type {
                validate_audio_content_type(content_type)
                    .map_err(|e| AppError::UnsupportedMediaType(e.to_string()))?;
            }
        }

        let mut upload = TemporaryUpload::create_in(&self.config.upload_dir)?;
        let size = upload.write_from(reader, self.config.max_file_size).await?;

        tracing::info!("📥 Staged {} bytes at {:?}", size, upload.path());
        Ok(upload)
    }

    pub async fn handle(&self, request: UploadRequest) -> Result<ProcessingResult, AppError> {
        let UploadRequest { upload, label } = request;
        let upload = upload.ok_or(AppError::MissingAudio)?;

        let label = match resolve_label(label.as_deref()) {
            Ok(label) => label,
            Err(e) => {
                upload.release().await;
                return Err(AppError::BadRequest(e.to_string()));
            }
        };

        let timeout = self.config.processing_timeout;
        let outcome =
            tokio::time::timeout(timeout, self.processor.process(upload.path(), &label)).await;

        // Failures are logged while the staged path still exists, then the
        // file is released on every branch before the caller sees a result.
        let result = match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                tracing::error!(
                    "Processor '{}' failed on {:?}: {:#}",
                    self.processor.name(),
                    upload.path(),
                    e
                );
                Err(AppError::ProcessingFailed(e.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    "Processor '{}' timed out after {:?} on {:?}",
                    self.processor.name(),
                    timeout,
                    upload.path()
                );
                Err(AppError::ProcessingTimeout(timeout.as_secs()))
            }
        };

        upload.release().await;
        result
    }
}
