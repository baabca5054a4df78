//! Confirmation gate — one pending guarded action per user.
//!
//! A new request replaces the previous one. Resolving takes the slot, so an
//! affirmative reply yields `Execute` at most once per request.

use std::collections::HashMap;
use std::str::FromStr;

/// Action that needs an explicit yes before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Complete,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(Self::Complete),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// The guarded action waiting for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub task_id: i64,
    pub action: Action,
}

/// How a free-text reply reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    Other,
}

const AFFIRMATIVE: &[&str] = &["confirm", "yes", "y"];
const NEGATIVE: &[&str] = &["back", "no", "n"];

/// Classify a reply, case-insensitively.
pub fn classify(text: &str) -> Reply {
    let text = text.trim().to_lowercase();
    if AFFIRMATIVE.contains(&text.as_str()) {
        Reply::Affirmative
    } else if NEGATIVE.contains(&text.as_str()) {
        Reply::Negative
    } else {
        Reply::Other
    }
}

/// Result of resolving a user's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Slot taken; run the action.
    Execute(PendingConfirmation),
    /// Slot taken; do nothing.
    Dismissed,
    /// Slot kept; ask again.
    Reprompt(PendingConfirmation),
    /// Nothing pending (or a stale button).
    Idle,
}

/// Per-user pending confirmations.
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    slots: HashMap<i64, PendingConfirmation>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a request, replacing any earlier one. Returns the replaced request.
    pub fn request(
        &mut self,
        user_id: i64,
        task_id: i64,
        action: Action,
    ) -> Option<PendingConfirmation> {
        self.slots
            .insert(user_id, PendingConfirmation { task_id, action })
    }

    pub fn pending(&self, user_id: i64) -> Option<PendingConfirmation> {
        self.slots.get(&user_id).copied()
    }

    pub fn clear(&mut self, user_id: i64) -> Option<PendingConfirmation> {
        self.slots.remove(&user_id)
    }

    /// Resolve the user's slot with a free-text reply.
    pub fn resolve(&mut self, user_id: i64, reply: Reply) -> Resolution {
        match (reply, self.pending(user_id)) {
            (_, None) => Resolution::Idle,
            (Reply::Affirmative, Some(_)) => self
                .slots
                .remove(&user_id)
                .map_or(Resolution::Idle, Resolution::Execute),
            (Reply::Negative, Some(_)) => {
                self.slots.remove(&user_id);
                Resolution::Dismissed
            }
            (Reply::Other, Some(pending)) => Resolution::Reprompt(pending),
        }
    }

    /// Resolve from an inline button that names its task and action.
    ///
    /// Only resolves when the slot still holds that exact request; a button
    /// from an older prompt is `Idle`.
    pub fn resolve_inline(
        &mut self,
        user_id: i64,
        task_id: i64,
        action: Action,
        reply: Reply,
    ) -> Resolution {
        let expected = PendingConfirmation { task_id, action };
        if self.pending(user_id) != Some(expected) {
            return Resolution::Idle;
        }
        self.resolve(user_id, reply)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_vocabulary() {
        for yes in ["confirm", "Yes", " y ", "CONFIRM"] {
            assert_eq!(classify(yes), Reply::Affirmative, "{yes}");
        }
        for no in ["back", "No", "n"] {
            assert_eq!(classify(no), Reply::Negative, "{no}");
        }
        for other in ["", "sure", "cancel", "yess"] {
            assert_eq!(classify(other), Reply::Other, "{other}");
        }
    }

    #[test]
    fn action_round_trips_through_str() {
        for action in [Action::Complete, Action::Delete] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("archive".parse::<Action>().is_err());
    }

    #[test]
    fn affirmative_executes_exactly_once() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Complete);

        let first = gate.resolve(1, Reply::Affirmative);
        let second = gate.resolve(1, Reply::Affirmative);
        assert_eq!(
            first,
            Resolution::Execute(PendingConfirmation {
                task_id: 7,
                action: Action::Complete
            })
        );
        assert_eq!(second, Resolution::Idle);
        assert!(gate.is_empty());
    }

    #[test]
    fn negative_dismisses() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Delete);
        assert_eq!(gate.resolve(1, Reply::Negative), Resolution::Dismissed);
        assert_eq!(gate.pending(1), None);
    }

    #[test]
    fn other_input_keeps_slot() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Delete);
        for _ in 0..3 {
            assert!(matches!(gate.resolve(1, Reply::Other), Resolution::Reprompt(p) if p.task_id == 7));
        }
        assert!(gate.pending(1).is_some());
    }

    #[test]
    fn last_request_wins() {
        let mut gate = ConfirmationGate::new();
        assert_eq!(gate.request(1, 7, Action::Complete), None);
        let replaced = gate.request(1, 8, Action::Delete);
        assert_eq!(replaced.map(|p| p.task_id), Some(7));
        assert_eq!(
            gate.resolve(1, Reply::Affirmative),
            Resolution::Execute(PendingConfirmation {
                task_id: 8,
                action: Action::Delete
            })
        );
    }

    #[test]
    fn users_are_independent() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Complete);
        gate.request(2, 9, Action::Complete);
        assert_eq!(gate.resolve(1, Reply::Negative), Resolution::Dismissed);
        assert_eq!(gate.pending(2).map(|p| p.task_id), Some(9));
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn stale_inline_button_is_idle() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Complete);
        gate.request(1, 8, Action::Complete);

        assert_eq!(
            gate.resolve_inline(1, 7, Action::Complete, Reply::Affirmative),
            Resolution::Idle
        );
        assert_eq!(
            gate.resolve_inline(1, 8, Action::Delete, Reply::Affirmative),
            Resolution::Idle
        );
        assert!(matches!(
            gate.resolve_inline(1, 8, Action::Complete, Reply::Affirmative),
            Resolution::Execute(_)
        ));
    }

    #[test]
    fn typed_and_inline_race_executes_once() {
        let mut gate = ConfirmationGate::new();
        gate.request(1, 7, Action::Complete);
        let typed = gate.resolve(1, Reply::Affirmative);
        let tapped = gate.resolve_inline(1, 7, Action::Complete, Reply::Affirmative);
        assert!(matches!(typed, Resolution::Execute(_)));
        assert_eq!(tapped, Resolution::Idle);
    }
}
