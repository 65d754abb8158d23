//! Task update payloads and merge rules
//!
//! Updates about the current task arrive from two unordered sources: the
//! push channel and status polls. Both are reduced to a [`TaskUpdate`] and
//! merged through one set of rules:
//!
//! - a terminal status always wins, and a terminal task absorbs everything
//!   that arrives after it
//! - while running, progress is monotonic: an update carrying lower
//!   progress than the stored value is stale and discarded whole
//! - updates without progress carry status news only and always apply
//! - terminal updates never touch progress, so the stored value stays at
//!   the maximum seen while running

use serde::{Deserialize, Serialize};

use super::de;
use super::model::{Task, TaskStatus};

/// News about a single task, normalized from any source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(alias = "id")]
    pub task_id: String,
    #[serde(default, deserialize_with = "de::opt_status")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "de::opt_progress")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    #[serde(default, alias = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of merging an update into a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Update applied, task still active
    Applied,
    /// Update applied and the task reached a terminal status
    Finished,
    /// Update carried lower progress than the stored value, discarded
    Stale,
    /// Task was already terminal, update ignored
    AlreadyTerminal,
    /// Update was keyed to a different task, ignored
    Mismatch,
}

impl TaskUpdate {
    /// Progress news for a running task
    pub fn progress(task_id: impl Into<String>, progress: f64) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(TaskStatus::Running),
            progress: Some(de::normalize_progress(progress)),
            ..Default::default()
        }
    }

    /// Status-only news, no progress attached
    pub fn status(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(status),
            ..Default::default()
        }
    }

    /// Terminal success with the final results
    pub fn completed(task_id: impl Into<String>, results: Option<serde_json::Value>) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(TaskStatus::Completed),
            results,
            ..Default::default()
        }
    }

    /// Terminal failure with the service's error message
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(TaskStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Terminal cancellation
    pub fn cancelled(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: Some(TaskStatus::Cancelled),
            ..Default::default()
        }
    }

    /// Check if this update carries a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|status| status.is_terminal())
    }

    /// Merge this update into a task
    pub fn apply_to(&self, task: &mut Task) -> MergeOutcome {
        if self.task_id != task.id {
            return MergeOutcome::Mismatch;
        }
        if task.status.is_terminal() {
            return MergeOutcome::AlreadyTerminal;
        }

        if let Some(status) = self.status {
            if status.is_terminal() {
                task.status = status;
                if let Some(results) = &self.results {
                    task.results = Some(results.clone());
                }
                if let Some(error) = &self.error {
                    task.error = Some(error.clone());
                }
                task.stamp_end_time();
                return MergeOutcome::Finished;
            }
        }

        if let Some(progress) = self.progress {
            if progress < task.progress {
                return MergeOutcome::Stale;
            }
            task.progress = progress;
        }
        if let Some(status) = self.status {
            // The lifecycle never steps back from running to pending
            if !(task.status == TaskStatus::Running && status == TaskStatus::Pending) {
                task.status = status;
            }
        }
        MergeOutcome::Applied
    }
}

impl From<&Task> for TaskUpdate {
    /// Reduce a polled task snapshot to the same update shape push events use
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            status: Some(task.status),
            progress: Some(task.progress),
            results: task.results.clone(),
            error: task.error.clone(),
        }
    }
}
