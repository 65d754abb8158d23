//! Push channel event payloads
//!
//! The service pushes JSON frames tagged with a `type` field. Task frames
//! are folded into [`TaskUpdate`] so push news and poll snapshots flow
//! through one merge path; roster frames surface as agent status changes.
//! Unknown frame types are skipped rather than rejected: the service grows
//! event types faster than clients update.

use serde::Deserialize;
use serde_json::Value;

use crate::agent::AgentStatus;
use crate::task::TaskUpdate;
use crate::{Error, Result};

/// Live status change for one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatusUpdate {
    pub agent_id: String,
    pub status: AgentStatus,
}

/// One decoded frame from the push channel
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// News about a research task
    Task(TaskUpdate),
    /// An agent's live status changed
    Agent(AgentStatusUpdate),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletedFrame {
    #[serde(alias = "id")]
    task_id: String,
    #[serde(default)]
    results: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorFrame {
    #[serde(alias = "id")]
    task_id: String,
    #[serde(default, alias = "errorMessage")]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelledFrame {
    #[serde(alias = "id")]
    task_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentStatusFrame {
    agent_id: String,
    status: String,
}

fn require_task_id(task_id: &str) -> Result<()> {
    if task_id.trim().is_empty() {
        return Err(Error::InvalidEvent("frame carries no task id".to_string()));
    }
    Ok(())
}

impl PushEvent {
    /// Decode one push frame
    ///
    /// `Ok(None)` means a well-formed frame this client has no use for:
    /// an unknown type, an agent status it cannot interpret, or
    /// `task_created`, which duplicates the create response the creating
    /// client already holds.
    pub fn decode(raw: &str) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Decode an already-parsed frame
    pub fn from_value(value: Value) -> Result<Option<Self>> {
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Err(Error::InvalidEvent("frame has no type field".to_string()));
        };

        match kind.as_str() {
            "task_update" => {
                let update: TaskUpdate = serde_json::from_value(value)?;
                require_task_id(&update.task_id)?;
                Ok(Some(Self::Task(update)))
            }
            "task_completed" => {
                let frame: CompletedFrame = serde_json::from_value(value)?;
                require_task_id(&frame.task_id)?;
                Ok(Some(Self::Task(TaskUpdate::completed(
                    frame.task_id,
                    frame.results,
                ))))
            }
            "task_error" => {
                let frame: ErrorFrame = serde_json::from_value(value)?;
                require_task_id(&frame.task_id)?;
                let error = frame.error.unwrap_or_else(|| "task failed".to_string());
                Ok(Some(Self::Task(TaskUpdate::failed(frame.task_id, error))))
            }
            "task_cancelled" => {
                let frame: CancelledFrame = serde_json::from_value(value)?;
                require_task_id(&frame.task_id)?;
                Ok(Some(Self::Task(TaskUpdate::cancelled(frame.task_id))))
            }
            "agent_status" => {
                let frame: AgentStatusFrame = serde_json::from_value(value)?;
                Ok(AgentStatus::parse_lenient(&frame.status).map(|status| {
                    Self::Agent(AgentStatusUpdate {
                        agent_id: frame.agent_id,
                        status,
                    })
                }))
            }
            "task_created" => Ok(None),
            _ => Ok(None),
        }
    }
}
