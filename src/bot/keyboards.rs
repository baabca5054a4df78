//! Keyboards attached to planner replies.

use crate::bot::callback::CallbackData;
use crate::channels::{InlineButton, Keyboard};
use crate::conversation::{Action, Prompt};
use crate::tasks::listing::ListEntry;

// ── Menu labels ─────────────────────────────────────────────────────

pub const MENU_NEW_TASK: &str = "New task";
pub const MENU_TASKS: &str = "Tasks";
pub const MENU_CATEGORIES: &str = "Categories";
pub const MENU_HELP: &str = "Help";

const BUTTON_CANCEL: &str = "Cancel";
const BUTTON_SKIP: &str = "Skip";

/// Categories offered as one-tap answers in the dialog.
const SUGGESTED_CATEGORIES: [[&str; 2]; 2] = [["Work", "Health"], ["Study", "Shopping"]];

/// Command a menu label stands for.
pub fn menu_command(text: &str) -> Option<&'static str> {
    let text = text.trim();
    [
        (MENU_NEW_TASK, "/newtask"),
        (MENU_TASKS, "/tasks"),
        (MENU_CATEGORIES, "/categories"),
        (MENU_HELP, "/help"),
    ]
    .into_iter()
    .find(|(label, _)| label.eq_ignore_ascii_case(text))
    .map(|(_, command)| command)
}

// ── Reply keyboards ─────────────────────────────────────────────────

pub fn main_menu() -> Keyboard {
    Keyboard::reply([[MENU_NEW_TASK, MENU_TASKS], [MENU_CATEGORIES, MENU_HELP]])
}

fn cancel_only() -> Keyboard {
    Keyboard::reply([[BUTTON_CANCEL]])
}

fn skip_or_cancel() -> Keyboard {
    Keyboard::reply([[BUTTON_SKIP], [BUTTON_CANCEL]])
}

fn categories() -> Keyboard {
    let mut rows: Vec<Vec<String>> = SUGGESTED_CATEGORIES
        .iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect();
    rows.push(vec![BUTTON_SKIP.to_string()]);
    rows.push(vec![BUTTON_CANCEL.to_string()]);
    Keyboard::Reply(rows)
}

fn yes_no() -> Keyboard {
    Keyboard::reply(vec![vec!["Yes", "No"], vec![BUTTON_CANCEL]])
}

/// Keyboard shown with a dialog question.
pub fn for_prompt(prompt: Prompt) -> Keyboard {
    match prompt {
        Prompt::Title | Prompt::RecurrenceDay | Prompt::RecurrenceWindow => cancel_only(),
        Prompt::Description | Prompt::Deadline => skip_or_cancel(),
        Prompt::Category => categories(),
        Prompt::RecurrenceFlag => yes_no(),
    }
}

// ── Inline keyboards ────────────────────────────────────────────────

/// One row per task: the label as a complete button, plus a delete button.
pub fn task_actions(entries: &[ListEntry]) -> Keyboard {
    Keyboard::Inline(
        entries
            .iter()
            .map(|entry| {
                vec![
                    InlineButton::new(
                        format!("✅ {}", entry.label),
                        CallbackData::request(Action::Complete, entry.task_id).to_string(),
                    ),
                    InlineButton::new(
                        "🗑",
                        CallbackData::request(Action::Delete, entry.task_id).to_string(),
                    ),
                ]
            })
            .collect(),
    )
}

/// Confirm / back buttons bound to one request.
pub fn confirmation(action: Action, task_id: i64) -> Keyboard {
    Keyboard::Inline(vec![vec![
        InlineButton::new("✅ Confirm", CallbackData::confirm(action, task_id).to_string()),
        InlineButton::new("↩️ Back", CallbackData::cancel(action, task_id).to_string()),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_aliases_are_case_insensitive() {
        assert_eq!(menu_command("New task"), Some("/newtask"));
        assert_eq!(menu_command(" tasks "), Some("/tasks"));
        assert_eq!(menu_command("CATEGORIES"), Some("/categories"));
        assert_eq!(menu_command("help"), Some("/help"));
        assert_eq!(menu_command("Pay rent"), None);
    }

    #[test]
    fn task_buttons_carry_callback_data() {
        let keyboard = task_actions(&[ListEntry {
            task_id: 4,
            label: "[4] Pay rent".into(),
        }]);
        let Keyboard::Inline(rows) = keyboard else {
            panic!("expected inline keyboard");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].text, "✅ [4] Pay rent");
        assert_eq!(rows[0][0].callback_data, "complete:4");
        assert_eq!(rows[0][1].callback_data, "delete:4");
    }

    #[test]
    fn confirmation_buttons_name_action_and_task() {
        let Keyboard::Inline(rows) = confirmation(Action::Delete, 8) else {
            panic!("expected inline keyboard");
        };
        assert_eq!(rows[0][0].callback_data, "confirm:delete:8");
        assert_eq!(rows[0][1].callback_data, "cancel:delete:8");
    }

    #[test]
    fn prompt_keyboards() {
        assert_eq!(for_prompt(Prompt::Title), Keyboard::reply([["Cancel"]]));
        assert_eq!(
            for_prompt(Prompt::Deadline),
            Keyboard::reply([["Skip"], ["Cancel"]])
        );
        let Keyboard::Reply(rows) = for_prompt(Prompt::Category) else {
            panic!("expected reply keyboard");
        };
        assert_eq!(rows.len(), 4);
    }
}
