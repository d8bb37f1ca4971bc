use crate::services::temp_upload::{UPLOAD_PREFIX, UPLOAD_SUFFIX};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodically deletes staged uploads left behind by a crashed process.
/// Live requests always remove their own files; this only catches leftovers.
pub struct StaleUploadSweeper {
    upload_dir: PathBuf,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl StaleUploadSweeper {
    pub fn new(
        upload_dir: PathBuf,
        max_age: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            upload_dir,
            max_age,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🧹 Stale upload sweeper started for {:?}", self.upload_dir);

        loop {
            self.sweep_once().await;

            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Stale upload sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {}
            }
        }
    }

    /// Returns the number of files removed
    pub async fn sweep_once(&self) -> usize {
        let mut entries = match tokio::fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Cannot read upload dir {:?}: {}", self.upload_dir, e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with(UPLOAD_PREFIX) || !name.ends_with(UPLOAD_SUFFIX) {
                continue;
            }

            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    tracing::info!("Removed stale upload {:?} (age {:?})", entry.path(), age);
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::error!("Failed to remove stale upload {:?}: {}", entry.path(), e),
            }
        }

        if removed > 0 {
            tracing::info!("✅ Sweep removed {} stale uploads", removed);
        }
        removed
    }
}
