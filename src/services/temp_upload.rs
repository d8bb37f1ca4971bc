use crate::api::error::AppError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Name prefix for every staged upload. The sweeper only touches files
/// carrying it.
pub const UPLOAD_PREFIX: &str = "upload-";
pub const UPLOAD_SUFFIX: &str = ".part";

/// How the guard ended up removing its file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Removed,
    AlreadyGone,
    Failed,
}

/// An uploaded file staged on local disk for the lifetime of one request.
///
/// The file is created with a random name under exclusive-create semantics,
/// so concurrent requests never share a path. It is removed either by
/// [`TemporaryUpload::release`] or, if the owner is dropped first (client
/// disconnect, early return, panic), by `Drop`.
#[derive(Debug)]
pub struct TemporaryUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
    size: u64,
}

impl TemporaryUpload {
    pub fn create_in(dir: &Path) -> Result<Self, AppError> {
        let file = tempfile::Builder::new()
            .prefix(UPLOAD_PREFIX)
            .suffix(UPLOAD_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| AppError::Internal(format!("Failed to create temp upload: {}", e)))?;
        let path = file.path().to_path_buf();

        tracing::debug!("Staging upload at {:?}", path);

        Ok(Self {
            file: Some(file),
            path,
            size: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stream `reader` into the staged file, failing once more than
    /// `max_size` bytes have arrived.
    pub async fn write_from<R>(&mut self, mut reader: R, max_size: usize) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let std_file = match &self.file {
            Some(file) => file.reopen()?,
            None => return Err(AppError::Internal("Temp upload already released".to_string())),
        };
        let mut out = tokio::fs::File::from_std(std_file);

        let mut buffer = [0u8; 8192];
        loop {
            let n = reader.read(&mut buffer).await.map_err(|e| {
                // Body stream errors surface as io::Error via StreamReader.
                AppError::BadRequest(format!("Failed to read upload: {}", e))
            })?;
            if n == 0 {
                break;
            }
            self.size += n as u64;
            if self.size > max_size as u64 {
                return Err(AppError::PayloadTooLarge(
                    "File size limits exceeded".to_string(),
                ));
            }
            out.write_all(&buffer[..n]).await?;
        }
        out.flush().await?;

        Ok(self.size)
    }

    /// Delete the staged file. Never fails: a missing file is logged as a
    /// warning and any other error as an error.
    pub async fn release(mut self) -> ReleaseOutcome {
        let Some(file) = self.file.take() else {
            return ReleaseOutcome::AlreadyGone;
        };
        let path = self.path.clone();

        let closed = tokio::task::spawn_blocking(move || file.close()).await;
        match closed {
            Ok(Ok(())) => {
                tracing::debug!("Removed temp upload {:?}", path);
                ReleaseOutcome::Removed
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Temp upload {:?} was already removed", path);
                ReleaseOutcome::AlreadyGone
            }
            Ok(Err(e)) => {
                tracing::error!("Failed to remove temp upload {:?}: {}", path, e);
                ReleaseOutcome::Failed
            }
            Err(e) => {
                tracing::error!("Cleanup task for {:?} did not complete: {}", path, e);
                ReleaseOutcome::Failed
            }
        }
    }
}

impl Drop for TemporaryUpload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            tracing::debug!("Temp upload {:?} dropped before release, removing", self.path);
            if let Err(e) = file.close() {
                if e.kind() != ErrorKind::NotFound {
                    tracing::error!("Failed to remove temp upload {:?}: {}", self.path, e);
                }
            }
        }
    }
}
