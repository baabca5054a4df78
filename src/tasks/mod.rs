//! Tasks: data model, recurrence windows, lifecycle and rendering.

pub mod digest;
pub mod format;
pub mod listing;
pub mod model;
pub mod recurrence;
pub mod service;

pub use digest::DigestComposer;
pub use model::{Category, MonthlyRecurrence, Schedule, Task, TaskDraft, User, UserIdentity};
pub use service::TaskService;
