use thiserror::Error;

use crate::domain::{JobId, NotificationId, ReminderId, ValidationError};
use crate::ports::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("reminder not found: {0}")]
    ReminderNotFound(ReminderId),

    #[error("notification not found: {0}")]
    NotificationNotFound(NotificationId),

    #[error("engine is stopped")]
    Stopped,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
