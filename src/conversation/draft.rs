//! New-task dialog — a forward-only state machine collecting a `TaskDraft`.
//!
//! `step` is pure: it consumes the current state and one line of input and
//! returns the next transition. Invalid input never advances the stage and
//! never touches the draft.

use chrono::NaiveDate;

use crate::tasks::model::{MAX_RECURRENCE_DAY, MAX_RECURRENCE_WINDOW, TaskDraft};

/// Word that abandons the dialog at any stage.
pub const CANCEL_TOKEN: &str = "cancel";

/// Words that leave an optional field empty.
pub const SKIP_TOKENS: &[&str] = &["skip", "-"];

/// Deadline input format.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

const YES_TOKENS: &[&str] = &["yes", "y"];
const NO_TOKENS: &[&str] = &["no", "n", "-"];

fn normalized(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Whether the input is the dialog cancel token (or the `/cancel` command).
pub fn is_cancel(input: &str) -> bool {
    let input = normalized(input);
    input == CANCEL_TOKEN || input == "/cancel"
}

pub fn is_skip(input: &str) -> bool {
    SKIP_TOKENS.contains(&normalized(input).as_str())
}

/// Stages of the dialog, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Title,
    Description,
    Category,
    Deadline,
    RecurrenceFlag,
    RecurrenceDay,
    /// Carries the day chosen at the previous stage.
    RecurrenceWindow { day: u32 },
}

impl Stage {
    /// The question asked when entering this stage.
    pub fn prompt(&self) -> Prompt {
        match self {
            Self::Title => Prompt::Title,
            Self::Description => Prompt::Description,
            Self::Category => Prompt::Category,
            Self::Deadline => Prompt::Deadline,
            Self::RecurrenceFlag => Prompt::RecurrenceFlag,
            Self::RecurrenceDay => Prompt::RecurrenceDay,
            Self::RecurrenceWindow { .. } => Prompt::RecurrenceWindow,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Category => "category",
            Self::Deadline => "deadline",
            Self::RecurrenceFlag => "recurrence_flag",
            Self::RecurrenceDay => "recurrence_day",
            Self::RecurrenceWindow { .. } => "recurrence_window",
        };
        write!(f, "{s}")
    }
}

/// Question to show the user after a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Title,
    Description,
    Category,
    Deadline,
    RecurrenceFlag,
    RecurrenceDay,
    RecurrenceWindow,
}

/// Why the input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reprompt {
    EmptyTitle,
    InvalidDeadline,
    InvalidRecurrenceFlag,
    InvalidRecurrenceDay,
    InvalidRecurrenceWindow,
}

/// Dialog state of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub stage: Stage,
    pub draft: TaskDraft,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationState {
    /// Fresh dialog at the title stage with an empty draft.
    pub fn new() -> Self {
        Self {
            stage: Stage::Title,
            draft: TaskDraft::default(),
        }
    }

    fn advance(mut self, stage: Stage) -> Transition {
        self.stage = stage;
        Transition::Advance(self, stage.prompt())
    }
}

/// Outcome of feeding one input to the dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the next stage.
    Advance(ConversationState, Prompt),
    /// Input rejected; same stage, same draft.
    Reprompt(ConversationState, Reprompt),
    /// Draft complete; the dialog ends.
    Submit(TaskDraft),
    /// User abandoned the dialog.
    Cancel,
}

/// Apply one line of input to the dialog.
pub fn step(state: ConversationState, input: &str) -> Transition {
    if is_cancel(input) {
        return Transition::Cancel;
    }

    let text = input.trim();
    match state.stage {
        Stage::Title => {
            if text.is_empty() {
                return Transition::Reprompt(state, Reprompt::EmptyTitle);
            }
            let mut state = state;
            state.draft.title = text.to_string();
            state.advance(Stage::Description)
        }
        Stage::Description => {
            let mut state = state;
            state.draft.description = optional_field(text);
            state.advance(Stage::Category)
        }
        Stage::Category => {
            let mut state = state;
            state.draft.category = optional_field(text);
            state.advance(Stage::Deadline)
        }
        Stage::Deadline => {
            if is_skip(text) || text.is_empty() {
                let mut state = state;
                state.draft.deadline = None;
                return state.advance(Stage::RecurrenceFlag);
            }
            match NaiveDate::parse_from_str(text, DEADLINE_FORMAT) {
                Ok(date) => {
                    let mut state = state;
                    state.draft.deadline = Some(date);
                    state.advance(Stage::RecurrenceFlag)
                }
                Err(_) => Transition::Reprompt(state, Reprompt::InvalidDeadline),
            }
        }
        Stage::RecurrenceFlag => {
            let answer = normalized(text);
            if YES_TOKENS.contains(&answer.as_str()) {
                state.advance(Stage::RecurrenceDay)
            } else if NO_TOKENS.contains(&answer.as_str()) {
                let mut draft = state.draft;
                draft.recurrence = None;
                Transition::Submit(draft)
            } else {
                Transition::Reprompt(state, Reprompt::InvalidRecurrenceFlag)
            }
        }
        Stage::RecurrenceDay => match text.parse::<u32>() {
            Ok(day) if (1..=MAX_RECURRENCE_DAY).contains(&day) => {
                state.advance(Stage::RecurrenceWindow { day })
            }
            _ => Transition::Reprompt(state, Reprompt::InvalidRecurrenceDay),
        },
        Stage::RecurrenceWindow { day } => match text.parse::<u32>() {
            Ok(window) if window <= MAX_RECURRENCE_WINDOW => {
                Transition::Submit(state.draft.monthly(day, window))
            }
            _ => Transition::Reprompt(state, Reprompt::InvalidRecurrenceWindow),
        },
    }
}

fn optional_field(text: &str) -> Option<String> {
    if text.is_empty() || is_skip(text) {
        None
    } else {
        Some(text.to_string())
    }
}
