//! Per-user interaction state shared by concurrent handlers.
//!
//! Both the dialog states and the pending confirmations live behind one
//! mutex. Every method does O(1) map work under the lock and returns; no
//! caller holds it across I/O.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::confirmation::{Action, ConfirmationGate, PendingConfirmation, Reply, Resolution};
use super::draft::{self, ConversationState, Transition};

#[derive(Debug, Default)]
struct Slots {
    conversations: HashMap<i64, ConversationState>,
    confirmations: ConfirmationGate,
}

/// Result of [`Interaction::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The stored dialog moved on; carries the transition that was applied.
    Applied(Transition),
    /// No dialog was open for the user when the input arrived.
    Missing,
}

/// Dialog and confirmation slots for every user.
#[derive(Debug, Default)]
pub struct Interaction {
    slots: Mutex<Slots>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Conversations ───────────────────────────────────────────────

    /// Open a fresh dialog, replacing any open one and dropping a pending
    /// confirmation.
    pub fn begin_conversation(&self, user_id: i64) {
        let mut slots = self.lock();
        slots.conversations.insert(user_id, ConversationState::new());
        slots.confirmations.clear(user_id);
    }

    pub fn has_conversation(&self, user_id: i64) -> bool {
        self.lock().conversations.contains_key(&user_id)
    }

    /// Snapshot of a user's dialog.
    pub fn conversation(&self, user_id: i64) -> Option<ConversationState> {
        self.lock().conversations.get(&user_id).cloned()
    }

    /// Feed one input to the user's dialog and store the outcome.
    ///
    /// `Advance` and `Reprompt` keep the dialog; `Submit` and `Cancel` end it.
    pub fn advance(&self, user_id: i64, input: &str) -> Step {
        let mut slots = self.lock();
        let Some(state) = slots.conversations.remove(&user_id) else {
            return Step::Missing;
        };

        let transition = draft::step(state, input);
        match &transition {
            Transition::Advance(next, _) | Transition::Reprompt(next, _) => {
                slots.conversations.insert(user_id, next.clone());
            }
            Transition::Submit(_) | Transition::Cancel => {}
        }
        Step::Applied(transition)
    }

    pub fn clear_conversation(&self, user_id: i64) -> bool {
        self.lock().conversations.remove(&user_id).is_some()
    }

    // ── Confirmations ───────────────────────────────────────────────

    /// Ask for confirmation; a previous request of the same user is replaced.
    pub fn request_confirmation(&self, user_id: i64, task_id: i64, action: Action) {
        self.lock().confirmations.request(user_id, task_id, action);
    }

    pub fn pending_confirmation(&self, user_id: i64) -> Option<PendingConfirmation> {
        self.lock().confirmations.pending(user_id)
    }

    /// Resolve the pending confirmation with free text.
    pub fn resolve(&self, user_id: i64, text: &str) -> Resolution {
        self.lock()
            .confirmations
            .resolve(user_id, super::confirmation::classify(text))
    }

    /// Resolve from an inline confirm/cancel button.
    pub fn resolve_inline(
        &self,
        user_id: i64,
        task_id: i64,
        action: Action,
        reply: Reply,
    ) -> Resolution {
        self.lock()
            .confirmations
            .resolve_inline(user_id, task_id, action, reply)
    }

    pub fn clear_confirmation(&self, user_id: i64) -> bool {
        self.lock().confirmations.clear(user_id).is_some()
    }

    /// Drop both slots of a user. Returns whether anything was open.
    pub fn reset(&self, user_id: i64) -> bool {
        let mut slots = self.lock();
        let had_conversation = slots.conversations.remove(&user_id).is_some();
        let had_confirmation = slots.confirmations.clear(user_id).is_some();
        had_conversation || had_confirmation
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conversation::draft::{Prompt, Stage};
    use crate::tasks::model::TaskDraft;

    #[test]
    fn advance_without_dialog_is_missing() {
        let interaction = Interaction::new();
        assert_eq!(interaction.advance(1, "hello"), Step::Missing);
    }

    #[test]
    fn dialog_progresses_and_ends_on_submit() {
        let interaction = Interaction::new();
        interaction.begin_conversation(1);

        for input in ["Pay rent", "skip", "skip", "skip"] {
            assert!(matches!(
                interaction.advance(1, input),
                Step::Applied(Transition::Advance(..))
            ));
        }
        assert_eq!(
            interaction.conversation(1).map(|s| s.stage),
            Some(Stage::RecurrenceFlag)
        );

        let step = interaction.advance(1, "no");
        assert_eq!(step, Step::Applied(Transition::Submit(TaskDraft::new("Pay rent"))));
        assert!(!interaction.has_conversation(1));
    }

    #[test]
    fn reprompt_keeps_dialog() {
        let interaction = Interaction::new();
        interaction.begin_conversation(1);
        assert!(matches!(
            interaction.advance(1, ""),
            Step::Applied(Transition::Reprompt(..))
        ));
        assert_eq!(interaction.conversation(1), Some(ConversationState::new()));
    }

    #[test]
    fn cancel_then_restart_has_no_leaked_fields() {
        let interaction = Interaction::new();
        interaction.begin_conversation(1);
        interaction.advance(1, "Old title");
        interaction.advance(1, "Old description");

        assert_eq!(interaction.advance(1, "cancel"), Step::Applied(Transition::Cancel));
        assert!(!interaction.has_conversation(1));

        interaction.begin_conversation(1);
        assert_eq!(interaction.conversation(1), Some(ConversationState::new()));
        match interaction.advance(1, "New title") {
            Step::Applied(Transition::Advance(state, Prompt::Description)) => {
                assert_eq!(state.draft, TaskDraft::new("New title"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn begin_conversation_drops_pending_confirmation() {
        let interaction = Interaction::new();
        interaction.request_confirmation(1, 5, Action::Delete);
        interaction.begin_conversation(1);
        assert_eq!(interaction.pending_confirmation(1), None);
    }

    #[test]
    fn confirmation_can_coexist_with_dialog() {
        let interaction = Interaction::new();
        interaction.begin_conversation(1);
        interaction.request_confirmation(1, 5, Action::Complete);
        assert!(interaction.has_conversation(1));
        assert!(interaction.pending_confirmation(1).is_some());
    }

    #[test]
    fn reset_clears_both_slots() {
        let interaction = Interaction::new();
        assert!(!interaction.reset(1));
        interaction.begin_conversation(1);
        interaction.request_confirmation(1, 5, Action::Complete);
        assert!(interaction.reset(1));
        assert!(!interaction.has_conversation(1));
        assert_eq!(interaction.pending_confirmation(1), None);
    }

    #[test]
    fn concurrent_affirmatives_execute_once() {
        let interaction = Arc::new(Interaction::new());
        interaction.request_confirmation(1, 7, Action::Complete);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let interaction = Arc::clone(&interaction);
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        interaction.resolve(1, "yes")
                    } else {
                        interaction.resolve_inline(1, 7, Action::Complete, Reply::Affirmative)
                    }
                })
            })
            .collect();

        let executed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| matches!(r, Resolution::Execute(_)))
            .count();
        assert_eq!(executed, 1);
    }

    #[test]
    fn users_do_not_share_dialogs() {
        let interaction = Interaction::new();
        interaction.begin_conversation(1);
        interaction.advance(1, "mine");
        assert_eq!(interaction.advance(2, "theirs"), Step::Missing);
        assert!(interaction.has_conversation(1));
    }
}
