use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use bytes::Bytes;

use crate::context::RequestContext;
use crate::response::{json_error, ok, AppError};
use crate::services::transcription::{validate_audio, TranscriptionError};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the audio itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    let limit = state.config().audio_max_bytes.saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/transcribe", post(transcribe))
        .layer(DefaultBodyLimit::max(limit))
}

impl From<TranscriptionError> for AppError {
    fn from(err: TranscriptionError) -> Self {
        match err {
            TranscriptionError::EmptyFile | TranscriptionError::UnsupportedFormat => {
                AppError::validation(err.to_string())
            }
            TranscriptionError::TooLarge { .. } => AppError::payload_too_large(err.to_string()),
            TranscriptionError::Timeout => {
                json_error(StatusCode::GATEWAY_TIMEOUT, "ML_TIMEOUT", err.to_string())
            }
            TranscriptionError::Unavailable(_) => {
                json_error(StatusCode::SERVICE_UNAVAILABLE, "ML_UNAVAILABLE", err.to_string())
            }
            TranscriptionError::Service(_) | TranscriptionError::InvalidResponse(_) => {
                json_error(StatusCode::BAD_GATEWAY, "ML_ERROR", err.to_string())
            }
        }
    }
}

/// Reads the multipart field named `name`, returning its file name and contents.
pub(super) async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
) -> Result<(String, Bytes), AppError> {
    loop {
        let field = multipart.next_field().await.map_err(multipart_error)?;
        let Some(field) = field else {
            return Err(AppError::validation(format!("multipart field '{name}' is required")));
        };
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, data));
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large("upload exceeds the size limit")
    } else {
        AppError::validation(format!("invalid multipart body: {}", err.body_text()))
    }
}

async fn transcribe(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (file_name, audio) = read_file_field(&mut multipart, "file").await?;
    validate_audio(&file_name, audio.len(), state.config().audio_max_bytes)?;

    let transcription = state.transcription().transcribe(&ctx, &file_name, audio).await?;
    Ok(ok(transcription))
}
