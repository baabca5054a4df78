//! Digest composer — the periodic per-user report.
//!
//! The report always has both sections; an empty one renders a placeholder
//! line instead of being dropped.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Duration, FixedOffset};

use crate::error::TaskError;
use crate::tasks::format::{category_names, category_of, escape_html};
use crate::tasks::model::Task;
use crate::tasks::recurrence::{self, start_of_day};
use crate::tasks::service::TaskService;

pub const EMPTY_OPEN_TASKS: &str = "— no open tasks";
pub const EMPTY_RECURRING: &str = "— nothing due in the current window";

/// Builds digests from the tasks of one user.
#[derive(Clone)]
pub struct DigestComposer {
    service: TaskService,
}

impl DigestComposer {
    pub fn new(service: TaskService) -> Self {
        Self { service }
    }

    /// Compose the HTML digest for `user_id` as of `now`.
    pub async fn compose(&self, user_id: i64, now: DateTime<FixedOffset>) -> Result<String, TaskError> {
        let tasks = self.service.list_actionable(user_id).await?;
        let categories = self.service.list_categories(user_id).await?;
        Ok(render_digest(&tasks, &category_names(&categories), now))
    }
}

/// Open one-off tasks in digest order, and recurring tasks due at `now`.
pub fn partition<'a>(tasks: &'a [Task], now: &DateTime<FixedOffset>) -> (Vec<&'a Task>, Vec<&'a Task>) {
    let mut pending: Vec<&Task> = Vec::new();
    let mut recurring_due: Vec<&Task> = Vec::new();

    for task in tasks {
        if task.is_recurring() {
            if recurrence::task_due_now(task, now) {
                recurring_due.push(task);
            }
        } else if !task.completed {
            pending.push(task);
        }
    }

    pending.sort_by(|a, b| compare_pending(a, b));
    (pending, recurring_due)
}

/// Deadline ascending, undated last, undated ties newest-created first.
fn compare_pending(a: &Task, b: &Task) -> Ordering {
    match (a.deadline, b.deadline) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b
            .created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id)),
    }
}

/// Render the full digest text.
pub fn render_digest(
    tasks: &[Task],
    categories: &HashMap<i64, String>,
    now: DateTime<FixedOffset>,
) -> String {
    let (pending, recurring_due) = partition(tasks, &now);

    let mut out = String::new();
    out.push_str("📋 <b>Daily digest</b>\n");
    let _ = writeln!(out, "🗓 {}\n", now.format("%d.%m.%Y"));

    out.push_str("🔥 <b>Open tasks</b>\n");
    if pending.is_empty() {
        let _ = writeln!(out, "{EMPTY_OPEN_TASKS}");
    } else {
        for task in pending {
            out.push_str(&format_open_task(task, categories, &now));
        }
    }

    out.push_str("\n♻️ <b>Recurring tasks</b>\n");
    if recurring_due.is_empty() {
        let _ = writeln!(out, "{EMPTY_RECURRING}");
    } else {
        for task in recurring_due {
            out.push_str(&format_recurring_task(task, categories, &now));
        }
    }

    out.trim().to_string()
}

fn format_open_task(task: &Task, categories: &HashMap<i64, String>, now: &DateTime<FixedOffset>) -> String {
    let deadline = task.deadline.map(|d| start_of_day(&now.timezone(), d));

    let icon = match deadline {
        Some(d) if *now > d => "⚠️",
        Some(d) if d - *now <= Duration::hours(48) => "⏳",
        _ => "🟢",
    };

    let mut out = format!("{icon} {}", escape_html(task.title.trim()));
    if let Some(name) = category_of(task, categories) {
        let _ = write!(out, " <i>({})</i>", escape_html(name));
    }

    if let Some(d) = deadline {
        let date = d.format("%Y-%m-%d");
        if *now > d {
            let _ = write!(out, "\n   ⏰ due {date} · <b>overdue</b>");
        } else {
            let days_left = (d - *now).num_hours() / 24 + 1;
            let unit = if days_left == 1 { "day" } else { "days" };
            let _ = write!(out, "\n   ⏰ due {date} · ≈{days_left} {unit} left");
        }
    }

    if let Some(desc) = task.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        let _ = write!(out, "\n   📝 {}", escape_html(desc));
    }

    out.push('\n');
    out
}

fn format_recurring_task(
    task: &Task,
    categories: &HashMap<i64, String>,
    now: &DateTime<FixedOffset>,
) -> String {
    let mut out = format!("♻️ {}", escape_html(task.title.trim()));
    if let Some(name) = category_of(task, categories) {
        let _ = write!(out, " <i>({})</i>", escape_html(name));
    }

    if let Some(rec) = task.recurrence() {
        let window = recurrence::due_window(rec, now);
        let _ = write!(
            out,
            "\n   📆 Due: {} (window ±{} d)",
            window.due.format("%Y-%m-%d"),
            rec.window_days
        );
    }

    match task.last_satisfied_at {
        Some(last) => {
            let _ = write!(
                out,
                "\n   ✅ Last done: {}",
                last.with_timezone(&now.timezone()).format("%Y-%m-%d")
            );
        }
        None => out.push_str("\n   ✅ Not done yet"),
    }

    out.push('\n');
    out
}
