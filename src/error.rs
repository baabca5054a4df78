//! Error types for the daily planner.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DatabaseError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("task: {0}")]
    Task(#[from] TaskError),
}

/// Problems reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),

    #[error("{key} is invalid: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures of the libSQL store.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Opening the database or a connection.
    #[error("cannot open database: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("{entity} {id} does not exist")]
    NotFound { entity: String, id: String },

    #[error("schema migration failed: {0}")]
    Migration(String),

    /// A stored value that does not decode (bad timestamp, unknown type).
    #[error("malformed row: {0}")]
    Serialization(String),
}

/// Transport failures.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("{name} could not deliver: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("http: {0}")]
    Http(String),
}

/// Task lifecycle errors.
///
/// `Validation` is always recoverable by asking the user again; `NotFound`
/// covers both missing tasks and tasks owned by someone else.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("{0}")]
    Validation(String),

    #[error("task {task_id} not found")]
    NotFound { task_id: i64 },

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, Error>;
