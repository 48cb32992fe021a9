use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use super::audio::read_file_field;
use crate::context::RequestContext;
use crate::middleware::auth::require_auth;
use crate::response::{ok, AppError};
use crate::storage::StorageError;
use crate::state::AppState;

const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router<AppState> {
    let limit = state.config().media.max_bytes.saturating_add(MULTIPART_OVERHEAD);

    let public = Router::new().route("/:reference/url", get(object_url));
    let protected = Router::new()
        .route("/", post(upload))
        .route("/:reference", delete(remove))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
        .layer(DefaultBodyLimit::max(limit));

    public.merge(protected)
}

/// Serves objects through the signed URLs issued by the store.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/:reference", get(download))
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidReference | StorageError::Empty => {
                AppError::validation(err.to_string())
            }
            StorageError::NotFound(_) => AppError::not_found(err.to_string()),
            StorageError::InvalidSignature | StorageError::Expired => {
                AppError::forbidden(err.to_string())
            }
            StorageError::TooLarge { .. } => AppError::payload_too_large(err.to_string()),
            StorageError::Io(_) => {
                tracing::error!(error = %err, "object store failure");
                AppError::internal(err.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct UploadedObject {
    reference: String,
    url: String,
}

#[derive(Debug, Serialize)]
struct ObjectUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SignedQuery {
    expires: i64,
    signature: String,
}

async fn upload(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (file_name, data) = read_file_field(&mut multipart, "file").await?;
    let store = state.object_store();
    let reference = store.upload(&ctx, data, &file_name).await?;
    let url = store.fetch(&ctx, &reference).await?;
    Ok((StatusCode::CREATED, ok(UploadedObject { reference, url })))
}

async fn object_url(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let url = state.object_store().fetch(&ctx, &reference).await?;
    Ok(ok(ObjectUrl { url }))
}

async fn remove(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(reference): Path<String>,
) -> Result<StatusCode, AppError> {
    state.object_store().delete(&ctx, &reference).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<Response, AppError> {
    let object = state
        .object_store()
        .open_signed(&reference, query.expires, &query.signature)
        .await?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes).into_response())
}
