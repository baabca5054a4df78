//! `/tasks` view — actionable tasks grouped by category.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};

use crate::tasks::format::{capitalize_first, category_label, category_of, escape_html, short_title};
use crate::tasks::model::Task;
use crate::tasks::recurrence::{self, start_of_day};

/// Button label length for one-off and recurring tasks.
const ONE_OFF_LABEL_LEN: usize = 24;
const RECURRING_LABEL_LEN: usize = 20;

/// Shown when the user has nothing actionable.
pub const EMPTY_LIST: &str = "No active tasks. Create one with /newtask.";

/// Where a recurring task stands relative to its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceStatus {
    DueNow,
    Satisfied,
    OutsideWindow,
}

impl RecurrenceStatus {
    pub fn of(task: &Task, now: &DateTime<FixedOffset>) -> Option<Self> {
        task.recurrence()?;
        Some(if recurrence::task_due_now(task, now) {
            Self::DueNow
        } else if recurrence::task_satisfied_in_window(task, now) {
            Self::Satisfied
        } else {
            Self::OutsideWindow
        })
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::DueNow => "🔁",
            Self::Satisfied => "✅",
            Self::OutsideWindow => "🗓",
        }
    }
}

/// A task row that gets action buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub task_id: i64,
    /// Short button label, e.g. `[3] Pay rent`.
    pub label: String,
}

/// Rendered task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListView {
    pub text: String,
    pub entries: Vec<ListEntry>,
}

impl TaskListView {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Group key: named categories sort by name, uncategorised last.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Named(String),
    Uncategorised,
}

/// Dated first by deadline, then one-off before recurring, then id.
fn compare_in_group(a: &Task, b: &Task) -> Ordering {
    let by_deadline = match (a.deadline, b.deadline) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_deadline
        .then_with(|| a.is_recurring().cmp(&b.is_recurring()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Render the task list.
pub fn render_task_list(
    tasks: &[Task],
    categories: &HashMap<i64, String>,
    now: DateTime<FixedOffset>,
) -> TaskListView {
    let mut groups: BTreeMap<GroupKey, (Option<&str>, Vec<&Task>)> = BTreeMap::new();
    for task in tasks.iter().filter(|t| t.is_recurring() || !t.completed) {
        let name = category_of(task, categories);
        let key = match name {
            Some(n) => GroupKey::Named(n.to_lowercase()),
            None => GroupKey::Uncategorised,
        };
        groups.entry(key).or_insert_with(|| (name, Vec::new())).1.push(task);
    }

    if groups.is_empty() {
        return TaskListView {
            text: EMPTY_LIST.to_string(),
            entries: Vec::new(),
        };
    }

    let mut text = String::from("<b>Active tasks:</b>\n\n");
    let mut entries = Vec::new();

    for (name, mut section) in groups.into_values() {
        section.sort_by(|a, b| compare_in_group(a, b));
        let _ = writeln!(text, "{}", category_label(name));

        for task in section {
            let title = capitalize_first(&task.title);
            let max = match RecurrenceStatus::of(task, &now) {
                Some(status) => {
                    text.push_str(&format_recurring_entry(task, status, &now));
                    RECURRING_LABEL_LEN
                }
                None => {
                    text.push_str(&format_one_off_entry(task, &now));
                    ONE_OFF_LABEL_LEN
                }
            };
            entries.push(ListEntry {
                task_id: task.id,
                label: format!("[{}] {}", task.id, short_title(&title, max)),
            });
        }
        text.push('\n');
    }

    TaskListView {
        text: text.trim().to_string(),
        entries,
    }
}

fn format_one_off_entry(task: &Task, now: &DateTime<FixedOffset>) -> String {
    let deadline = task.deadline.map(|d| start_of_day(&now.timezone(), d));
    let overdue = deadline.is_some_and(|d| *now > d);
    let icon = match deadline {
        Some(_) if overdue => "🔴",
        Some(d) if d - *now <= chrono::Duration::hours(48) => "🟠",
        _ => "🟢",
    };

    let mut out = format!(
        "{icon} [{}] {}\n",
        task.id,
        escape_html(&capitalize_first(&task.title))
    );
    if let Some(d) = deadline {
        let date = d.format("%Y-%m-%d");
        if overdue {
            let _ = writeln!(out, "  ⚠️ deadline: {date} (overdue)");
        } else {
            let _ = writeln!(out, "  📅 deadline: {date}");
        }
    }
    if let Some(desc) = task.description.as_deref() {
        let _ = writeln!(out, "  📝 {}", escape_html(desc));
    }
    out.push('\n');
    out
}

fn format_recurring_entry(task: &Task, status: RecurrenceStatus, now: &DateTime<FixedOffset>) -> String {
    let mut out = format!(
        "{} [{}] {}\n",
        status.icon(),
        task.id,
        escape_html(&capitalize_first(&task.title))
    );
    if let Some(rec) = task.recurrence() {
        let window = recurrence::due_window(rec, now);
        let _ = writeln!(
            out,
            "  📅 due: {} (window ±{} d)",
            window.due.format("%Y-%m-%d"),
            rec.window_days
        );
    }
    match task.last_satisfied_at {
        Some(last) => {
            let _ = writeln!(
                out,
                "  🔄 last done: {}",
                last.with_timezone(&now.timezone()).format("%Y-%m-%d")
            );
        }
        None => out.push_str("  🔄 not done yet\n"),
    }
    out.push('\n');
    out
}
