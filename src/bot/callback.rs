//! Inline-button payloads.
//!
//! Formats: `complete:<id>`, `delete:<id>` on task-list buttons;
//! `confirm:<action>:<id>`, `cancel:<action>:<id>` on confirmation prompts.

use std::str::FromStr;

use crate::conversation::Action;

/// Decoded `callback_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    /// Task-list button: ask to confirm `action` on the task.
    Request { action: Action, task_id: i64 },
    /// Confirmation prompt, affirmative button.
    Confirm { action: Action, task_id: i64 },
    /// Confirmation prompt, negative button.
    Cancel { action: Action, task_id: i64 },
}

impl CallbackData {
    pub fn request(action: Action, task_id: i64) -> Self {
        Self::Request { action, task_id }
    }

    pub fn confirm(action: Action, task_id: i64) -> Self {
        Self::Confirm { action, task_id }
    }

    pub fn cancel(action: Action, task_id: i64) -> Self {
        Self::Cancel { action, task_id }
    }
}

impl std::fmt::Display for CallbackData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { action, task_id } => write!(f, "{action}:{task_id}"),
            Self::Confirm { action, task_id } => write!(f, "confirm:{action}:{task_id}"),
            Self::Cancel { action, task_id } => write!(f, "cancel:{action}:{task_id}"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [action, id] => Ok(Self::request(action.parse()?, parse_id(id)?)),
            ["confirm", action, id] => Ok(Self::confirm(action.parse()?, parse_id(id)?)),
            ["cancel", action, id] => Ok(Self::cancel(action.parse()?, parse_id(id)?)),
            _ => Err(format!("unrecognised callback data '{s}'")),
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("invalid task id '{raw}'"))
}
