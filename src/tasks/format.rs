//! HTML text helpers shared by the digest and the task list.

use std::collections::HashMap;

use crate::tasks::model::{Category, Task};

/// Label used for tasks without a category.
pub const NO_CATEGORY: &str = "No category";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trim and upper-case the first character.
pub fn capitalize_first(s: &str) -> String {
    let trimmed = s.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Truncate to `max` characters, appending an ellipsis when cut.
pub fn short_title(title: &str, max: usize) -> String {
    if title.chars().count() <= max {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max).collect();
        format!("{cut}…")
    }
}

/// Category names keyed by id.
pub fn category_names(categories: &[Category]) -> HashMap<i64, String> {
    categories.iter().map(|c| (c.id, c.name.clone())).collect()
}

/// Trimmed category name of a task, if it has a non-blank one.
pub fn category_of<'a>(task: &Task, names: &'a HashMap<i64, String>) -> Option<&'a str> {
    task.category_id
        .and_then(|id| names.get(&id))
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
}

/// Section heading for a category group, with an icon picked by name.
pub fn category_label(name: Option<&str>) -> String {
    let base = name.unwrap_or(NO_CATEGORY).trim();
    let icon = match name.map(|n| n.trim().to_lowercase()).as_deref() {
        None => "📁",
        Some("study") => "🎓",
        Some("health") => "💪",
        Some("work") => "💼",
        Some("shopping") => "🛒",
        Some(_) => "📂",
    };
    format!("{icon} {}", escape_html(&capitalize_first(base)))
}
