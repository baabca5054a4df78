//! Chat-facing layer: event dispatch, replies and digest delivery.

pub mod callback;
pub mod digest;
pub mod dispatcher;
pub mod keyboards;
pub mod planner;
pub mod replies;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use callback::CallbackData;
pub use digest::{DigestReport, DigestRunner, spawn_digest_scheduler};
pub use dispatcher::Dispatcher;
pub use planner::Planner;

/// Source of "now"; injectable so tests can pin the date.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
