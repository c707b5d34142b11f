use dynacon_core::CoreError;
use dynacon_numbering::NumberingError;
use thiserror::Error;

use crate::task::{TaskId, TaskStatus};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Dependency not satisfied for submission {submission}: {reason}")]
    DependencyNotSatisfied { submission: String, reason: String },

    #[error("Unknown submission: {0}")]
    UnknownSubmission(String),

    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error("Task {id} can't go from {from} to {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Worker pool is shut down")]
    PoolClosed,

    #[error("Malformed contacts file {path}: {reason}")]
    ContactsParse { path: String, reason: String },

    #[error(transparent)]
    Numbering(#[from] NumberingError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
