//! User-facing texts.

use std::fmt::Write as _;

use crate::conversation::{Action, Prompt, Reprompt};
use crate::tasks::format::{escape_html, NO_CATEGORY};
use crate::tasks::model::{Category, Task};

pub const GREETING: &str = "👋 Hi! I keep track of your tasks and send you a digest every few hours.\n\nUse the menu below or /help to see what I can do.";

pub const HELP: &str = "<b>Commands</b>
/newtask — create a task
/tasks — list active tasks
/complete &lt;id&gt; — mark a task done
/delete &lt;id&gt; — delete a task
/categories — list your categories
/digest — send the digest now
/interval [hours] — show or change the digest interval
/cancel — abort the current dialog";

pub const NOT_UNDERSTOOD: &str = "I didn't understand that. Use /newtask to create a task or /help for the list of commands.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. See /help.";
pub const CANCELLED: &str = "Cancelled.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const DIALOG_RESET: &str = "The dialog was reset. Start again with /newtask.";
pub const TASK_NOT_FOUND: &str = "Task not found. It may have been deleted.";
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again later.";
pub const STALE_PROMPT: &str = "This prompt is no longer active.";
pub const NO_CATEGORIES: &str = "You have no categories yet. They are created with your tasks.";
pub const INTERVAL_USAGE: &str = "The interval must be a positive whole number of hours, e.g. /interval 3.";

pub fn usage(action: Action) -> String {
    format!("Usage: /{action} <task id>")
}

/// Question for a dialog stage.
pub fn prompt(prompt: Prompt) -> &'static str {
    match prompt {
        Prompt::Title => "Enter the task title:",
        Prompt::Description => "Add a description, or press Skip:",
        Prompt::Category => "Choose a category or type your own, or press Skip:",
        Prompt::Deadline => "Enter the deadline as YYYY-MM-DD, or press Skip:",
        Prompt::RecurrenceFlag => "Should the task repeat every month? (yes/no)",
        Prompt::RecurrenceDay => "On which day of the month is it due? (1-31)",
        Prompt::RecurrenceWindow => "How many days before and after that day may it be done? (0-14)",
    }
}

/// Explanation for rejected dialog input.
pub fn reprompt(reprompt: Reprompt) -> &'static str {
    match reprompt {
        Reprompt::EmptyTitle => "The title cannot be empty. Enter the task title:",
        Reprompt::InvalidDeadline => "Could not read that date. Use YYYY-MM-DD, or press Skip.",
        Reprompt::InvalidRecurrenceFlag => "Please answer yes or no.",
        Reprompt::InvalidRecurrenceDay => "The day must be a whole number from 1 to 31.",
        Reprompt::InvalidRecurrenceWindow => "The window must be a whole number from 0 to 14.",
    }
}

/// Summary sent after a task is created.
pub fn task_created(task: &Task, category: Option<&str>) -> String {
    let mut out = format!(
        "✅ <b>Task created</b>\nID: {}\nTitle: {}",
        task.id,
        escape_html(&task.title)
    );
    if let Some(desc) = task.description.as_deref() {
        let _ = write!(out, "\nDescription: {}", escape_html(desc));
    }
    let _ = write!(
        out,
        "\nCategory: {}",
        escape_html(category.unwrap_or(NO_CATEGORY))
    );
    if let Some(deadline) = task.deadline {
        let _ = write!(out, "\nDeadline: {}", deadline.format("%Y-%m-%d"));
    }
    if let Some(rec) = task.recurrence() {
        let _ = write!(
            out,
            "\nRepeats monthly on day {} (window ±{} d)",
            rec.day, rec.window_days
        );
    }
    out
}

/// Question asked before a guarded action runs.
pub fn confirm_question(action: Action, task: &Task) -> String {
    let title = escape_html(&task.title);
    match action {
        Action::Complete => format!("Mark <b>{title}</b> [{}] as done?", task.id),
        Action::Delete => format!("Delete <b>{title}</b> [{}]? This cannot be undone.", task.id),
    }
}

pub fn confirm_reprompt(action: Action) -> String {
    format!("Please answer \"confirm\" to {action} the task or \"back\" to keep it as is.")
}

pub fn already_done(task: &Task) -> String {
    let title = escape_html(&task.title);
    if task.is_recurring() {
        format!("<b>{title}</b> is already done for the current window.")
    } else {
        format!("<b>{title}</b> is already done.")
    }
}

pub fn completed(task: &Task) -> String {
    let title = escape_html(&task.title);
    if task.is_recurring() {
        format!("✅ <b>{title}</b> marked done for the current window.")
    } else {
        format!("✅ <b>{title}</b> marked done.")
    }
}

pub fn deleted(task: &Task) -> String {
    format!("🗑 <b>{}</b> deleted.", escape_html(&task.title))
}

pub fn category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return NO_CATEGORIES.to_string();
    }
    let mut out = String::from("<b>Your categories:</b>");
    for category in categories {
        let _ = write!(out, "\n• {}", escape_html(&category.name));
    }
    out
}

pub fn interval_current(schedule: &impl std::fmt::Display) -> String {
    format!("Digest schedule: {schedule}.\nChange it with /interval &lt;hours&gt;.")
}

pub fn interval_changed(schedule: &impl std::fmt::Display) -> String {
    format!("Digest schedule changed: {schedule}.")
}
