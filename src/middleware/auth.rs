use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::{extract_token, AuthError, AuthUser};
use crate::context::RequestContext;
use crate::response::AppError;
use crate::services::users::check_auth;
use crate::state::AppState;

// Takes the token by value: a borrowed `Request<Body>` held across an await is not `Send`.
async fn authenticate(
    state: &AppState,
    ctx: &RequestContext,
    token: Option<String>,
) -> Result<AuthUser, AuthError> {
    let token = token.ok_or(AuthError::MissingToken)?;
    let keys = state.jwt()?;
    check_auth(ctx, state.db(), keys, &token).await
}

pub async fn require_auth(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, &ctx, extract_token(req.headers())).await {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.id.as_str());
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!(request_id = ctx.request_id(), error = %err, "authentication failed");
            AppError::from(err).into_response()
        }
    }
}

/// Attaches the user when a valid token is present; otherwise continues anonymously.
pub async fn optional_auth(
    State(state): State<AppState>,
    ctx: RequestContext,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&state, &ctx, extract_token(req.headers())).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
        }
        Err(AuthError::MissingToken) => {}
        Err(err) => {
            tracing::debug!(request_id = ctx.request_id(), error = %err, "ignoring unusable token");
        }
    }
    next.run(req).await
}
