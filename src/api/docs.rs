//! OpenAPI document for the HTTP surface, served as plain JSON.

use axum::{routing::get, Json, Router};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::register_handler,
        crate::api::handlers::auth::login_handler,
        crate::api::handlers::auth::refresh_handler,
        crate::api::handlers::auth::logout_handler,
        crate::api::handlers::auth::change_password_handler,
        crate::api::handlers::tasks::get_task_handler,
        crate::api::handlers::tasks::update_assignee_handler,
        crate::api::handlers::tasks::update_status_handler
    ),
    components(
        schemas(
            crate::auth::models::RegisterRequest,
            crate::auth::models::LoginRequest,
            crate::auth::models::ChangePasswordRequest,
            crate::auth::models::User,
            crate::auth::models::Role,
            crate::api::handlers::auth::SessionBody,
            crate::api::handlers::tasks::ReassignTaskRequest,
            crate::api::handlers::tasks::UpdateTaskStatusRequest,
            crate::storage::repositories::Task,
            crate::storage::repositories::TaskStatus
        )
    ),
    tags(
        (name = "auth", description = "Accounts, sessions, and refresh-token rotation"),
        (name = "tasks", description = "Task reads and mutations gated by the role policy")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

pub fn docs_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
