//! Task records and their status lifecycle.
//!
//! ```text
//! Pending --dispatch--> Running --ok--> Success
//!                          \----err/panic--> Failed
//! ```
//!
//! No status ever goes back; `Success` and `Failed` are terminal.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TaskId = u64;

#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TaskType {
    Interactions,
    Numbering,
    Analysis,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Interactions => "Calculating interactions",
            TaskType::Numbering => "Numbering",
            TaskType::Analysis => "Analysis",
        };
        write!(f, "{}", name)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Failed,
    Success,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Success)
    }

    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Success)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::Running => "Running",
            TaskStatus::Failed => "Failed",
            TaskStatus::Success => "Success",
        };
        write!(f, "{}", name)
    }
}

/// One queued stage of one submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionTask {
    pub id: TaskId,
    pub submission_id: String,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Notes left by the worker, per form id.
    pub progress_info: BTreeMap<u32, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubmissionTask {
    pub fn new(id: TaskId, submission_id: &str, task_type: TaskType) -> Self {
        let now = Utc::now();
        SubmissionTask {
            id,
            submission_id: submission_id.to_string(),
            task_type,
            status: TaskStatus::Pending,
            progress_info: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(TaskStatus::Pending, TaskStatus::Running, true)]
    #[case(TaskStatus::Running, TaskStatus::Success, true)]
    #[case(TaskStatus::Running, TaskStatus::Failed, true)]
    #[case(TaskStatus::Pending, TaskStatus::Success, false)]
    #[case(TaskStatus::Running, TaskStatus::Pending, false)]
    #[case(TaskStatus::Success, TaskStatus::Running, false)]
    #[case(TaskStatus::Failed, TaskStatus::Success, false)]
    fn test_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    fn test_new_task_is_pending() {
        let task = SubmissionTask::new(1, "abc", TaskType::Interactions);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.status.is_terminal());
        assert_eq!(task.created_at, task.updated_at);
    }
}
