//! HTTP handlers for registration, login, and session management.
//!
//! Refresh tokens never appear in response bodies. They travel in the
//! `tp_refresh` cookie, scoped to the auth endpoints so browsers only attach
//! it where rotation and revocation happen.

use axum::{
    extract::{Extension, State},
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::jwt::Actor;
use crate::auth::models::{
    AuthTokens, ChangePasswordRequest, LoginRequest, RegisterRequest, User,
};
use crate::auth::REFRESH_COOKIE_NAME;

const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// Body returned by register, login, and refresh.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub access_token: String,
    pub user: User,
}

/// A session response plus the `Set-Cookie` header carrying the refresh token.
pub struct SessionResponse {
    status: StatusCode,
    body: SessionBody,
    cookie: Cookie<'static>,
}

impl SessionResponse {
    fn new(status: StatusCode, user: User, tokens: AuthTokens) -> Self {
        let cookie = refresh_cookie(&tokens);
        Self { status, body: SessionBody { access_token: tokens.access_token, user }, cookie }
    }
}

impl IntoResponse for SessionResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        append_cookie(&mut response, self.cookie);
        response
    }
}

fn refresh_cookie(tokens: &AuthTokens) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, tokens.refresh_token.clone()))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .expires(
            time::OffsetDateTime::from_unix_timestamp(tokens.refresh_expires_at.timestamp()).ok(),
        )
        .into()
}

/// Expired, empty cookie that tells the browser to drop the refresh token.
fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, ""))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .into()
}

fn append_cookie(response: &mut Response, cookie: Cookie<'static>) {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

fn cleared_cookie_response(status: StatusCode) -> Response {
    let mut response = status.into_response();
    append_cookie(&mut response, removal_cookie());
    response
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and session opened", body = SessionBody),
        (status = 400, description = "Invalid registration payload"),
        (status = 409, description = "Email address already registered")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<SessionResponse, ApiError> {
    let (user, tokens) = state.auth_service.register(payload).await?;
    Ok(SessionResponse::new(StatusCode::OK, user, tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionBody),
        (status = 400, description = "Invalid login payload"),
        (status = 401, description = "Invalid email or password")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<ApiState>,
    Json(payload): Json<LoginRequest>,
) -> Result<SessionResponse, ApiError> {
    let (user, tokens) = state.auth_service.login(payload).await?;
    Ok(SessionResponse::new(StatusCode::OK, user, tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Session rotated", body = SessionBody),
        (status = 401, description = "Missing, expired, or revoked refresh token"),
        (status = 403, description = "Refresh token reuse detected; all sessions revoked")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
) -> Result<SessionResponse, ApiError> {
    let raw = jar
        .get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| ApiError::unauthorized("missing refresh token"))?;

    let (user, tokens) = state.auth_service.refresh_session(&raw).await?;
    Ok(SessionResponse::new(StatusCode::OK, user, tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session closed; refresh cookie cleared")
    ),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<ApiState>,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE_NAME) {
        state.auth_service.logout(cookie.value()).await?;
    }
    Ok(cleared_cookie_response(StatusCode::NO_CONTENT))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed; every refresh session revoked"),
        (status = 400, description = "Invalid password change payload"),
        (status = 401, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    state.auth_service.change_password(&actor.user_id, payload).await?;
    Ok(cleared_cookie_response(StatusCode::NO_CONTENT))
}
