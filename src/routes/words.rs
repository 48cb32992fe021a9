use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::context::RequestContext;
use crate::middleware::auth::{optional_auth, require_auth};
use crate::response::{ok, AppError};
use crate::routes::JsonBody;
use crate::db::operations::words::Word;
use crate::services::words::{self, NewWord, WordError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/random", get(random_word))
        .route("/:word", get(get_word));
    let protected = Router::new()
        .route("/", post(create_word))
        .route("/check", post(check_pronunciation))
        .route("/:word/stats", get(word_stats))
        .route_layer(middleware::from_fn_with_state(state, require_auth));
    public.merge(protected)
}

/// Topic listings report per-user counters when a valid token is supplied.
pub fn topics_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_topics))
        .route("/:topic/words", get(topic_words))
        .route_layer(middleware::from_fn_with_state(state, optional_auth))
}

impl From<WordError> for AppError {
    fn from(err: WordError) -> Self {
        match err {
            WordError::Validation(msg) => AppError::validation(msg),
            WordError::Duplicate(_) => AppError::conflict(err.to_string()),
            WordError::WordNotFound(_) | WordError::TopicNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            WordError::Store(_) => AppError::internal(err.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreatedWord {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RandomQuery {
    topic: Option<String>,
}

#[derive(Debug, Serialize)]
struct RandomWord {
    word: Option<Word>,
}

#[derive(Debug, Deserialize)]
struct CheckRequest {
    word: String,
    transcription: String,
}

async fn create_word(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(body): JsonBody<NewWord>,
) -> Result<impl IntoResponse, AppError> {
    let id = words::create_word(&ctx, state.db(), &body).await?;
    Ok((StatusCode::CREATED, ok(CreatedWord { id })))
}

async fn get_word(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(word): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let found = words::get_word(&ctx, state.db(), &word)
        .await?
        .ok_or(WordError::WordNotFound(word))?;
    Ok(ok(found))
}

async fn random_word(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<RandomQuery>,
) -> Result<impl IntoResponse, AppError> {
    let word = words::random_word(&ctx, state.db(), query.topic.as_deref()).await?;
    Ok(ok(RandomWord { word }))
}

async fn word_stats(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    Path(word): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let stats = words::word_stats(&ctx, state.db(), &user.id, &word).await?;
    Ok(ok(stats))
}

async fn check_pronunciation(
    State(state): State<AppState>,
    ctx: RequestContext,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<CheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result =
        words::check_pronunciation(&ctx, state.db(), &user.id, &body.word, &body.transcription)
            .await?;
    Ok(ok(result))
}

async fn list_topics(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: Option<Extension<AuthUser>>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.as_ref().map(|Extension(user)| user.id.as_str());
    let topics = words::list_topics(&ctx, state.db(), user_id).await?;
    Ok(ok(topics))
}

async fn topic_words(
    State(state): State<AppState>,
    ctx: RequestContext,
    user: Option<Extension<AuthUser>>,
    Path(topic): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = user.as_ref().map(|Extension(user)| user.id.as_str());
    let list = words::words_by_topic(&ctx, state.db(), &topic, user_id).await?;
    Ok(ok(list))
}
