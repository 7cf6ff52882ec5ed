//! Optional admin-token gate for `/api/*`.

use super::AppState;
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn extract_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Passes everything through when no token is configured.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_token.as_deref() else {
        return next.run(request).await;
    };

    let provided = extract_bearer(request.headers())
        .or_else(|| extract_header(request.headers(), ADMIN_TOKEN_HEADER));

    if provided == Some(expected) {
        next.run(request).await
    } else {
        tracing::warn!(uri = %request.uri(), "rejected request without valid admin token");
        AppError::Unauthorized.into_response()
    }
}
