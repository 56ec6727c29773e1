use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{AuthService, SessionService, TokenIssuer};
use crate::config::AppConfig;
use crate::services::TaskService;
use crate::storage::repositories::{
    SqlxRefreshTokenRepository, SqlxTaskRepository, SqlxUserRepository,
};
use crate::storage::DbPool;

use super::{
    docs,
    handlers::{
        change_password_handler, get_task_handler, login_handler, logout_handler,
        refresh_handler, register_handler, update_assignee_handler, update_status_handler,
    },
    middleware::authenticate,
};

#[derive(Clone)]
pub struct ApiState {
    pub auth_service: Arc<AuthService>,
    pub task_service: TaskService,
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

pub fn build_router(pool: DbPool, config: &AppConfig) -> Router {
    let token_issuer = Arc::new(TokenIssuer::new(&config.auth));
    let session_service = SessionService::new(
        Arc::new(SqlxRefreshTokenRepository::new(pool.clone())),
        &config.auth,
    );
    let auth_service = Arc::new(AuthService::new(
        Arc::new(SqlxUserRepository::new(pool.clone())),
        session_service,
        token_issuer.clone(),
    ));
    let task_service = TaskService::new(Arc::new(SqlxTaskRepository::new(pool)));

    let state = ApiState { auth_service, task_service };

    // register/login/refresh/logout authenticate through credentials or the
    // refresh cookie, not through a bearer token
    let public_api = Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/api/v1/auth/refresh", post(refresh_handler))
        .route("/api/v1/auth/logout", post(logout_handler));

    let secured_api = Router::new()
        .route("/api/v1/auth/change-password", post(change_password_handler))
        .route("/api/v1/tasks/{id}", get(get_task_handler))
        .route("/api/v1/tasks/{id}/assignee", put(update_assignee_handler))
        .route("/api/v1/tasks/{id}/status", put(update_status_handler))
        .layer(middleware::from_fn_with_state(token_issuer, authenticate));

    let mut router = public_api
        .merge(secured_api)
        .with_state(state)
        .route("/health", get(health_handler))
        .merge(docs::docs_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.server.timeout())),
        );

    if config.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}
