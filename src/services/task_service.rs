//! Task operations gated by the access policy.
//!
//! Every operation loads the task's scope first and consults the policy
//! before touching the row, so the role rules live in one place instead of
//! being re-derived per handler.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::jwt::Actor;
use crate::auth::policy::{self, Action};
use crate::domain::{TaskId, UserId};
use crate::errors::{Result, TaskplaneError};
use crate::storage::repositories::{Task, TaskRepository, TaskStatus};

#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    /// Fetch a task the actor is allowed to read.
    pub async fn get_task(&self, actor: &Actor, id: &TaskId) -> Result<Task> {
        let scope = self.repository.load_scope(id).await?;
        policy::require_access(actor, Action::Read, &scope)?;
        self.repository.get_task(id).await
    }

    /// Reassign a task to another user (or clear the assignment).
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, task_id = %id))]
    pub async fn reassign_task(
        &self,
        actor: &Actor,
        id: &TaskId,
        assignee: Option<&UserId>,
    ) -> Result<Task> {
        let scope = self.repository.load_scope(id).await?;
        policy::require_access(actor, Action::Write, &scope)?;

        // Assignments stay within the task's team regardless of who assigns
        if let Some(assignee) = assignee {
            if !scope.team_member_ids.contains(assignee) {
                return Err(TaskplaneError::validation_field(
                    "assignee must be a member of the task's team",
                    "assigneeId",
                ));
            }
        }

        self.repository.update_assignee(id, assignee).await?;
        info!(assignee = assignee.map(|a| a.to_string()), "task reassigned");
        self.repository.get_task(id).await
    }

    /// Move a task to a new workflow status.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, task_id = %id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Task> {
        let scope = self.repository.load_scope(id).await?;
        policy::require_access(actor, Action::Write, &scope)?;

        self.repository.update_status(id, status).await?;
        self.repository.get_task(id).await
    }
}
