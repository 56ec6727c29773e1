//! HTTP handlers for task reads and policy-gated mutations.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::jwt::Actor;
use crate::domain::{TaskId, UserId};
use crate::storage::repositories::{Task, TaskStatus};

/// Body for reassigning a task. A null assignee clears the assignment.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReassignTaskRequest {
    pub assignee_id: Option<UserId>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task details", body = Task),
        (status = 403, description = "Actor may not read this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn get_task_handler(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    let task = state.task_service.get_task(&actor, &id).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}/assignee",
    params(("id" = String, Path, description = "Task identifier")),
    request_body = ReassignTaskRequest,
    responses(
        (status = 200, description = "Task reassigned", body = Task),
        (status = 403, description = "Actor may not modify this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn update_assignee_handler(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TaskId>,
    Json(payload): Json<ReassignTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let task =
        state.task_service.reassign_task(&actor, &id, payload.assignee_id.as_ref()).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}/status",
    params(("id" = String, Path, description = "Task identifier")),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Task status updated", body = Task),
        (status = 403, description = "Actor may not modify this task"),
        (status = 404, description = "Task not found")
    ),
    security(("bearer_auth" = [])),
    tag = "tasks"
)]
pub async fn update_status_handler(
    State(state): State<ApiState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<TaskId>,
    Json(payload): Json<UpdateTaskStatusRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state.task_service.update_status(&actor, &id, payload.status).await?;
    Ok(Json(task))
}
