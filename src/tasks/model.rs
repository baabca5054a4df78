//! Task data model — users, categories, tasks and creation drafts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Largest accepted recurrence day-of-month.
pub const MAX_RECURRENCE_DAY: u32 = 31;
/// Largest accepted recurrence window radius, in days.
pub const MAX_RECURRENCE_WINDOW: u32 = 14;

/// Type marker stored for monthly recurring tasks.
pub const RECUR_TYPE_MONTHLY: &str = "monthly";

/// A chat user, identified by their Telegram id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// External identity used to upsert a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserIdentity {
    pub telegram_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

/// Owner-scoped task category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Monthly recurrence: due on `day` (clamped to short months), actionable
/// for `window_days` on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyRecurrence {
    pub day: u32,
    pub window_days: u32,
}

impl MonthlyRecurrence {
    pub fn new(day: u32, window_days: u32) -> Self {
        Self { day, window_days }
    }

    pub fn is_valid(&self) -> bool {
        (1..=MAX_RECURRENCE_DAY).contains(&self.day) && self.window_days <= MAX_RECURRENCE_WINDOW
    }
}

/// How a task repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    OneOff,
    Monthly(MonthlyRecurrence),
}

/// A single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    /// Owning user id.
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub schedule: Schedule,
    /// Only ever set for one-off tasks.
    pub completed: bool,
    /// Last completion; for recurring tasks this is the per-cycle marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_satisfied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn recurrence(&self) -> Option<MonthlyRecurrence> {
        match self.schedule {
            Schedule::Monthly(rec) => Some(rec),
            Schedule::OneOff => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, Schedule::Monthly(_))
    }
}

/// Fields of a task under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub recurrence: Option<MonthlyRecurrence>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder: set description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builder: set category name.
    pub fn with_category(mut self, name: impl Into<String>) -> Self {
        self.category = Some(name.into());
        self
    }

    /// Builder: set deadline.
    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Builder: make the task recur monthly.
    pub fn monthly(mut self, day: u32, window_days: u32) -> Self {
        self.recurrence = Some(MonthlyRecurrence::new(day, window_days));
        self
    }

    pub fn schedule(&self) -> Schedule {
        match self.recurrence {
            Some(rec) => Schedule::Monthly(rec),
            None => Schedule::OneOff,
        }
    }
}

/// Record ready to be inserted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
}
