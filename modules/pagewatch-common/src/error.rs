use thiserror::Error;
use uuid::Uuid;

/// Result type alias for pagewatch operations.
pub type Result<T> = std::result::Result<T, PagewatchError>;

#[derive(Error, Debug)]
pub enum PagewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),
}
