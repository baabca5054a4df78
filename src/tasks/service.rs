//! Task lifecycle — create, complete and delete tasks against a `TaskStore`.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::{DatabaseError, TaskError};
use crate::store::TaskStore;
use crate::tasks::model::{Category, NewTask, Task, TaskDraft, User, UserIdentity};
use crate::tasks::recurrence;

/// Whether completing `task` right now would be a repeat.
///
/// One-off tasks are done once `completed` is set; recurring tasks are done
/// when the occurrence for `now`'s month is already satisfied.
pub fn is_already_done<Tz: TimeZone>(task: &Task, now: &DateTime<Tz>) -> bool {
    match task.recurrence() {
        Some(_) => recurrence::task_satisfied_in_window(task, now),
        None => task.completed,
    }
}

/// Applies lifecycle operations on behalf of a task owner.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Find or create the user behind an external identity.
    pub async fn register_user(&self, identity: &UserIdentity) -> Result<User, TaskError> {
        Ok(self.store.upsert_user(identity).await?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, TaskError> {
        Ok(self.store.list_users().await?)
    }

    /// Validate a draft and persist it as a new task.
    pub async fn create_task(&self, owner: i64, draft: TaskDraft) -> Result<Task, TaskError> {
        self.create_task_at(owner, draft, Utc::now()).await
    }

    /// Like [`create_task`](Self::create_task) with an explicit creation time.
    pub async fn create_task_at(
        &self,
        owner: i64,
        draft: TaskDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("task title must not be empty".into()));
        }
        if let Some(rec) = draft.recurrence.filter(|rec| !rec.is_valid()) {
            return Err(TaskError::Validation(format!(
                "recurrence day must be 1-31 and window 0-14, got day {} window {}",
                rec.day, rec.window_days
            )));
        }

        let category_id = match draft.category.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                Some(self.store.get_or_create_category(owner, name).await?.id)
            }
            _ => None,
        };

        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let task = self
            .store
            .create_task(&NewTask {
                user_id: owner,
                category_id,
                title: title.to_string(),
                description,
                deadline: draft.deadline,
                schedule: draft.schedule(),
                created_at,
            })
            .await?;

        info!(
            user_id = owner,
            task_id = task.id,
            recurring = task.is_recurring(),
            "Task created"
        );
        Ok(task)
    }

    /// Load a task owned by `owner`.
    pub async fn get_task(&self, owner: i64, task_id: i64) -> Result<Task, TaskError> {
        self.store
            .find_task(owner, task_id)
            .await?
            .ok_or(TaskError::NotFound { task_id })
    }

    /// Mark a task done at `at`.
    ///
    /// Recurring tasks only advance `last_satisfied_at`; one-off tasks also
    /// set `completed`.
    pub async fn complete_task(
        &self,
        owner: i64,
        task_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        let mut task = self.get_task(owner, task_id).await?;
        if !task.is_recurring() {
            task.completed = true;
        }
        task.last_satisfied_at = Some(at);
        task.updated_at = at;
        match self.store.update_task_completion(&task).await {
            Ok(()) => {}
            // Deleted since it was read.
            Err(DatabaseError::NotFound { .. }) => return Err(TaskError::NotFound { task_id }),
            Err(e) => return Err(e.into()),
        }

        info!(
            user_id = owner,
            task_id,
            recurring = task.is_recurring(),
            "Task completed"
        );
        Ok(task)
    }

    pub async fn delete_task(&self, owner: i64, task_id: i64) -> Result<(), TaskError> {
        if !self.store.delete_task(owner, task_id).await? {
            return Err(TaskError::NotFound { task_id });
        }
        info!(user_id = owner, task_id, "Task deleted");
        Ok(())
    }

    /// Open one-off tasks plus every recurring task, in store order.
    pub async fn list_actionable(&self, owner: i64) -> Result<Vec<Task>, TaskError> {
        let tasks = self.store.list_actionable_tasks(owner).await?;
        debug!(user_id = owner, count = tasks.len(), "Listed actionable tasks");
        Ok(tasks)
    }

    pub async fn list_categories(&self, owner: i64) -> Result<Vec<Category>, TaskError> {
        Ok(self.store.list_categories(owner).await?)
    }
}
