use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a number between 0 and 65535, got '{0}'")]
    InvalidPort(String),

    #[error("HOST must be an IP address, got '{0}'")]
    InvalidHost(String),
}

/// Runtime configuration for the upload server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind (default: 127.0.0.1)
    pub host: IpAddr,

    /// Listening port (default: 3000)
    pub port: u16,

    /// Scratch directory for in-flight uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Frontend assets served at the root path (default: "public")
    pub static_dir: PathBuf,

    /// Maximum audio upload size in bytes (default: 100 MB)
    pub max_file_size: usize,

    /// Upper bound on a single processor call (default: 60s)
    pub processing_timeout: Duration,

    /// Uploads older than this are treated as orphaned (default: 1h)
    pub stale_upload_age: Duration,

    /// How often the sweeper looks for orphaned uploads (default: 15m)
    pub sweep_interval: Duration,

    /// Reject parts whose declared content type is not audio (default: true)
    pub enforce_audio_mime: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("public"),
            max_file_size: 100 * 1024 * 1024, // 100 MB
            processing_timeout: Duration::from_secs(60),
            stale_upload_age: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(900),
            enforce_audio_mime: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is a thin
    /// wrapper; tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let port = match lookup("PORT") {
            None => default.port,
            Some(raw) if raw.trim().is_empty() => default.port,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
        };

        let host = match lookup("HOST") {
            None => default.host,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidHost(raw.clone()))?,
        };

        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Ok(Self {
            host,
            port,

            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.static_dir),

            max_file_size: lookup("MAX_FILE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            processing_timeout: secs("PROCESSING_TIMEOUT_SECS", default.processing_timeout),
            stale_upload_age: secs("STALE_UPLOAD_AGE_SECS", default.stale_upload_age),
            sweep_interval: secs("SWEEP_INTERVAL_SECS", default.sweep_interval),

            enforce_audio_mime: lookup("ENFORCE_AUDIO_MIME")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(default.enforce_audio_mime),
        })
    }

    /// Config for tests and local runs: ephemeral port, caller-chosen scratch dir
    pub fn development(upload_dir: impl AsRef<Path>) -> Self {
        Self {
            port: 0,
            upload_dir: upload_dir.as_ref().to_path_buf(),
            processing_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
