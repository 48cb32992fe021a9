use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MlConfig;
use crate::context::RequestContext;

const ALLOWED_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("audio file is empty")]
    EmptyFile,
    #[error("unsupported audio format, expected .wav or .mp3")]
    UnsupportedFormat,
    #[error("audio file exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("ML service timeout")]
    Timeout,
    #[error("ML service unavailable")]
    Unavailable(#[source] reqwest::Error),
    #[error("ML service error: {0}")]
    Service(String),
    #[error("invalid ML service response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcription {
    pub transcription: String,
}

#[derive(Debug, Deserialize)]
struct MlResponse {
    #[serde(default)]
    transcription: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Returns the lower-cased extension when it is one the ML service accepts.
pub fn audio_extension(file_name: &str) -> Result<&'static str, TranscriptionError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or(TranscriptionError::UnsupportedFormat)?;
    ALLOWED_EXTENSIONS
        .into_iter()
        .find(|allowed| *allowed == ext)
        .ok_or(TranscriptionError::UnsupportedFormat)
}

pub fn validate_audio(file_name: &str, len: usize, limit: usize) -> Result<&'static str, TranscriptionError> {
    let ext = audio_extension(file_name)?;
    if len == 0 {
        return Err(TranscriptionError::EmptyFile);
    }
    if len > limit {
        return Err(TranscriptionError::TooLarge { limit });
    }
    Ok(ext)
}

/// HTTP client for the speech recognition service.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl TranscriptionClient {
    pub fn new(config: &MlConfig) -> Self {
        let client = match reqwest::Client::builder().timeout(config.timeout).build() {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "ML client builder failed, using default client");
                reqwest::Client::new()
            }
        };
        Self {
            client,
            endpoint: format!("{}/transcribe", config.base_url),
            timeout: config.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn transcribe(
        &self,
        ctx: &RequestContext,
        file_name: &str,
        audio: Bytes,
    ) -> Result<Transcription, TranscriptionError> {
        let ext = audio_extension(file_name)?;
        let mime = if ext == "wav" { "audio/wav" } else { "audio/mpeg" };
        let size = audio.len();

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|err| TranscriptionError::InvalidResponse(err.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::debug!(request_id = ctx.request_id(), endpoint = %self.endpoint, size, "sending audio to ML service");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(crate::context::REQUEST_ID_HEADER, ctx.request_id())
            .multipart(form)
            .send()
            .await
            .map_err(|err| self.classify(ctx, err))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| self.classify(ctx, err))?;
        let parsed: Option<MlResponse> = serde_json::from_slice(&body).ok();

        if let Some(message) = parsed
            .as_ref()
            .and_then(|r| r.error.as_deref())
            .filter(|m| !m.trim().is_empty())
        {
            tracing::warn!(request_id = ctx.request_id(), %status, error = message, "ML service reported an error");
            return Err(TranscriptionError::Service(message.to_string()));
        }

        if !status.is_success() {
            tracing::warn!(request_id = ctx.request_id(), %status, "ML service returned an error status");
            return Err(TranscriptionError::Service(format!("HTTP {status}")));
        }

        let transcription = parsed
            .and_then(|r| r.transcription)
            .ok_or_else(|| TranscriptionError::InvalidResponse("missing transcription".to_string()))?;

        tracing::info!(request_id = ctx.request_id(), size, "audio transcribed");
        Ok(Transcription { transcription })
    }

    fn classify(&self, ctx: &RequestContext, err: reqwest::Error) -> TranscriptionError {
        if err.is_timeout() {
            tracing::warn!(
                request_id = ctx.request_id(),
                timeout_ms = self.timeout.as_millis() as u64,
                "ML service timed out"
            );
            TranscriptionError::Timeout
        } else {
            tracing::error!(request_id = ctx.request_id(), error = %err, "ML service unreachable");
            TranscriptionError::Unavailable(err)
        }
    }
}
