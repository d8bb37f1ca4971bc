use crate::AppState;
use crate::api::error::AppError;
use crate::services::processor::ProcessingResult;
use crate::services::upload_handler::UploadRequest;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use futures::TryStreamExt;
use tokio_util::io::StreamReader;

pub const AUDIO_FIELD: &str = "audio_data";
pub const LABEL_FIELD: &str = "filename";

#[utoipa::path(
    post,
    path = "/process_audio",
    request_body(content = String, content_type = "multipart/form-data", description = "`audio_data` file part and optional `filename` text field"),
    responses(
        (status = 200, description = "Transcript and summary", body = ProcessingResult),
        (status = 400, description = "No audio file uploaded, malformed form, or invalid filename"),
        (status = 413, description = "Upload exceeds the size limit"),
        (status = 415, description = "Upload is not audio"),
        (status = 502, description = "Audio processor failed"),
        (status = 504, description = "Audio processor timed out")
    ),
    tag = "audio"
)]
pub async fn process_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessingResult>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut request = UploadRequest::default();

    // Anything staged so far is dropped, and removed, on an early return.
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        if name == AUDIO_FIELD {
            if request.upload.is_some() {
                return Err(AppError::BadRequest(
                    "Only one audio file may be uploaded per request".to_string(),
                ));
            }

            let content_type = field.content_type().map(|s| s.to_string());
            let body_with_io_error = field.map_err(std::io::Error::other);
            let reader = StreamReader::new(body_with_io_error);

            request.upload = Some(
                state
                    .handler
                    .stage(content_type.as_deref(), reader)
                    .await?,
            );
        } else if name == LABEL_FIELD {
            request.label = Some(field.text().await?);
        } else {
            tracing::debug!("Ignoring unexpected form field '{}'", name);
        }
    }

    let result = state.handler.handle(request).await?;
    Ok(Json(result))
}
