use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    #[error("Extraction miss: {0}")]
    Extraction(String),
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
    #[error("Processing error: {0}")]
    Processing(String),
    #[error("Scoring error: {0}")]
    Scoring(String),
    #[error("Validation error: {0}")]
    Validation(String),
}
