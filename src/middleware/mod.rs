use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

use crate::context::{RequestContext, REQUEST_ID_HEADER};

pub mod auth;

/// Attaches a [`RequestContext`] to the request, runs the rest of the stack inside a
/// `request` span and echoes the id back in `x-request-id`.
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_headers(req.headers());
    req.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ctx.request_id(),
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
