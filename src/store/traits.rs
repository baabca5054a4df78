//! `TaskStore` trait — single async interface for planner persistence.
//!
//! Every task and category operation is scoped to an owner; a task that
//! exists but belongs to someone else is indistinguishable from a missing one.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::tasks::model::{Category, NewTask, Task, User, UserIdentity};

/// Backend-agnostic store covering users, categories and tasks.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Find or create a user by Telegram id, refreshing their profile fields.
    async fn upsert_user(&self, identity: &UserIdentity) -> Result<User, DatabaseError>;

    /// All known users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    // ── Categories ──────────────────────────────────────────────────

    /// Idempotent get-or-create, exact (case-sensitive) name match.
    async fn get_or_create_category(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Category, DatabaseError>;

    /// Categories of a user, ordered by name.
    async fn list_categories(&self, user_id: i64) -> Result<Vec<Category>, DatabaseError>;

    // ── Tasks ───────────────────────────────────────────────────────

    /// Insert a task and return it with its assigned id.
    async fn create_task(&self, task: &NewTask) -> Result<Task, DatabaseError>;

    /// Find a task by id, scoped to its owner.
    async fn find_task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>, DatabaseError>;

    /// Non-completed one-off tasks plus every recurring task.
    ///
    /// Ordered by deadline (undated last), then newest first.
    async fn list_actionable_tasks(&self, user_id: i64) -> Result<Vec<Task>, DatabaseError>;

    /// Persist `completed`, `last_satisfied_at` and `updated_at`.
    async fn update_task_completion(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Delete a task scoped to its owner. Returns whether a row was removed.
    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool, DatabaseError>;
}
