//! Per-user interaction state: the new-task dialog and the confirmation gate.

pub mod confirmation;
pub mod draft;
pub mod session;

pub use confirmation::{Action, ConfirmationGate, PendingConfirmation, Reply, Resolution};
pub use draft::{ConversationState, Prompt, Reprompt, Stage, Transition};
pub use session::{Interaction, Step};
