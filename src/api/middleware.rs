//! Axum middleware that authenticates bearer tokens and attaches the actor.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::api::error::ApiError;
use crate::auth::jwt::TokenIssuer;

pub type TokenIssuerState = Arc<TokenIssuer>;

/// Authenticate a request from its `Authorization: Bearer` header.
///
/// On success the resolved [`Actor`](crate::auth::jwt::Actor) is inserted as a
/// request extension for handlers to pick up. Tokens with an unknown role
/// claim are rejected the same way as invalid signatures.
pub async fn authenticate(
    State(issuer): State<TokenIssuerState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let header =
        request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()).unwrap_or("");

    let token = match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => {
            warn!(path = %request.uri().path(), "request without bearer token");
            return Err(ApiError::unauthorized("missing bearer token"));
        }
    };

    let actor = issuer
        .validate_token(token)
        .and_then(|claims| claims.to_actor())
        .ok_or_else(|| {
            warn!(path = %request.uri().path(), "bearer token rejected");
            ApiError::unauthorized("invalid or expired access token")
        })?;

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}
