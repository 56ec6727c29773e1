//! Task repository.
//!
//! Besides plain task fetches, this repository loads the access scope for a
//! task (owning organization, team membership, assignee) in one place so the
//! policy check and the data it runs on always agree.

use crate::auth::policy::ResourceScope;
use crate::domain::{OrganizationId, ProjectId, TaskId, UserId};
use crate::errors::{Result, TaskplaneError};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(TaskStatusParseError(other.to_string())),
        }
    }
}

/// Error returned when task status parsing fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid task status: {0}")]
pub struct TaskStatusParseError(pub String);

/// Stored representation of a task.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub project_id: ProjectId,
    pub assignee_id: Option<UserId>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub project_id: String,
    pub assignee_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct TaskScopeRow {
    pub team_id: String,
    pub organization_id: String,
    pub assignee_id: Option<String>,
}

fn to_model(row: TaskRow) -> Result<Task> {
    let status = TaskStatus::from_str(&row.status).map_err(|_| {
        TaskplaneError::validation(format!("Unknown task status '{}' for task {}", row.status, row.id))
    })?;

    Ok(Task {
        id: TaskId::from_string(row.id),
        title: row.title,
        description: row.description,
        status,
        due_date: row.due_date,
        project_id: ProjectId::from_string(row.project_id),
        assignee_id: row.assignee_id.map(UserId::from_string),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const SELECT_COLUMNS: &str =
    "id, title, description, status, due_date, project_id, assignee_id, created_at, updated_at";

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_task(&self, id: &TaskId) -> Result<Task>;

    /// Load the access scope for a task: owning organization, members of the
    /// owning team, and the current assignee.
    async fn load_scope(&self, id: &TaskId) -> Result<ResourceScope>;

    async fn update_assignee(&self, id: &TaskId, assignee: Option<&UserId>) -> Result<()>;

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqlxTaskRepository {
    pool: DbPool,
}

impl SqlxTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqlxTaskRepository {
    async fn get_task(&self, id: &TaskId) -> Result<Task> {
        let row: TaskRow =
            sqlx::query_as(&format!("SELECT {} FROM tasks WHERE id = $1", SELECT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| TaskplaneError::Database {
                    source: err,
                    context: "Failed to fetch task".to_string(),
                })?
                .ok_or_else(|| TaskplaneError::not_found("task", id.as_str()))?;

        to_model(row)
    }

    async fn load_scope(&self, id: &TaskId) -> Result<ResourceScope> {
        let scope_row: TaskScopeRow = sqlx::query_as(
            "SELECT teams.id AS team_id, teams.organization_id, tasks.assignee_id
             FROM tasks
             JOIN projects ON projects.id = tasks.project_id
             JOIN teams ON teams.id = projects.team_id
             WHERE tasks.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to load task scope".to_string(),
        })?
        .ok_or_else(|| TaskplaneError::not_found("task", id.as_str()))?;

        let member_ids: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM team_members WHERE team_id = $1")
                .bind(&scope_row.team_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|err| TaskplaneError::Database {
                    source: err,
                    context: "Failed to load team members for task scope".to_string(),
                })?;

        Ok(ResourceScope {
            organization_id: Some(OrganizationId::from_string(scope_row.organization_id)),
            team_member_ids: member_ids.into_iter().map(UserId::from_string).collect(),
            assignee_id: scope_row.assignee_id.map(UserId::from_string),
            // Tasks are not anyone's own record; self-scoping goes through
            // the assignee.
            subject_user_id: None,
        })
    }

    async fn update_assignee(&self, id: &TaskId, assignee: Option<&UserId>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tasks SET assignee_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(assignee)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to update task assignee".to_string(),
        })?;

        if result.rows_affected() == 0 {
            return Err(TaskplaneError::not_found("task", id.as_str()));
        }

        Ok(())
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| TaskplaneError::Database {
            source: err,
            context: "Failed to update task status".to_string(),
        })?;

        if result.rows_affected() == 0 {
            return Err(TaskplaneError::not_found("task", id.as_str()));
        }

        Ok(())
    }
}
