//! Daily Planner — personal task tracking over Telegram.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod store;
pub mod tasks;
