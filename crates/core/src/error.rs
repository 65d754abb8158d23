//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid task spec: {0}")]
    InvalidSpec(String),

    #[error("A task is already active")]
    TaskActive,

    #[error("No task is currently running")]
    TaskNotRunning,

    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
