use anyhow::{Result, anyhow};
use validator::Validate;

/// Label used when the client sends no usable `filename` field
pub const DEFAULT_LABEL: &str = "untitled";

pub const MAX_LABEL_LENGTH: u64 = 255;

/// Non-audio types still accepted for audio uploads. Browsers record to
/// `video/webm` even for audio-only streams, and some clients never set a
/// specific type at all.
const EXTRA_ALLOWED_MIME_TYPES: &[&str] = &["video/webm", "application/octet-stream"];

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Validate)]
struct LabelField {
    #[validate(length(min = 1, max = MAX_LABEL_LENGTH))]
    value: String,
}

/// Turn the optional `filename` form field into the label handed to the
/// processor. Missing or blank input yields [`DEFAULT_LABEL`].
pub fn resolve_label(raw: Option<&str>) -> Result<String> {
    let trimmed = raw.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return Ok(DEFAULT_LABEL.to_string());
    }

    let field = LabelField {
        value: trimmed.to_string(),
    };
    field.validate().map_err(|_| {
        anyhow!(ValidationError {
            code: "INVALID_LABEL",
            message: format!("Filename must be at most {} characters", MAX_LABEL_LENGTH),
        })
    })?;

    Ok(field.value)
}

/// Validates a declared part content type against the audio allowlist
pub fn validate_audio_content_type(content_type: &str) -> Result<()> {
    let parsed: mime::Mime = content_type.parse().map_err(|_| {
        anyhow!(ValidationError {
            code: "INVALID_MIME_TYPE",
            message: format!("'{}' is not a valid content type", content_type),
        })
    })?;

    if parsed.type_() == mime::AUDIO {
        return Ok(());
    }

    let essence = parsed.essence_str().to_lowercase();
    if EXTRA_ALLOWED_MIME_TYPES.iter().any(|&allowed| allowed == essence) {
        return Ok(());
    }

    Err(anyhow!(ValidationError {
        code: "INVALID_MIME_TYPE",
        message: format!(
            "MIME type '{}' is not allowed. Only audio uploads are accepted.",
            content_type
        ),
    }))
}
