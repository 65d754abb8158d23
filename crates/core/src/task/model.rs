//! Research task model definitions
//!
//! These types mirror the service's task payloads and are tolerant of the
//! drift the service exhibits (percent progress, free-form status text,
//! naive timestamps).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

use super::de;

/// Agent enlisted when a spec names none
pub const DEFAULT_AGENT: &str = "planning";

/// Category of research task understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Research,
    Analysis,
    Browser,
    General,
}

impl Default for TaskType {
    fn default() -> Self {
        Self::Research
    }
}

/// Lifecycle status of a research task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    /// Check if this status ends the task lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Parse a status string, tolerating the aliases the service emits
    ///
    /// Returns `None` for free-form phase text ("Processing... 30%"), which
    /// callers treat as "no status news".
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" | "initializing" | "created" => Some(Self::Pending),
            "running" | "in_progress" => Some(Self::Running),
            "completed" | "done" => Some(Self::Completed),
            "failed" | "error" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Parameters for creating a new research task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub query: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub agents: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
}

impl TaskSpec {
    /// Create a spec for the given query with default settings
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            task_type: TaskType::default(),
            agents: Vec::new(),
            options: serde_json::Value::Null,
        }
    }

    /// Set the task type
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Set the agents to enlist
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }

    /// Set the opaque options bag passed through to the service
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    /// Validate the spec and fill in defaults
    ///
    /// An empty query is rejected; an empty agent list falls back to the
    /// default planning agent.
    pub fn normalized(mut self) -> Result<Self> {
        if self.query.trim().is_empty() {
            return Err(Error::InvalidSpec("query cannot be empty".to_string()));
        }
        if self.agents.is_empty() {
            self.agents.push(DEFAULT_AGENT.to_string());
        }
        Ok(self)
    }
}

/// A research task as tracked by this client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Service-assigned identifier, immutable once bound
    pub id: String,
    pub query: String,
    #[serde(rename = "type", default)]
    pub task_type: TaskType,
    #[serde(default)]
    pub agents: Vec<String>,
    /// Opaque options bag, passed through untouched
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
    #[serde(default, deserialize_with = "de::status")]
    pub status: TaskStatus,
    /// Completion fraction in [0, 1], non-decreasing while running
    #[serde(default, deserialize_with = "de::progress")]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    /// Failure message, wired as `error` or `errorMessage` depending on
    /// the service version
    #[serde(default, alias = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "de::datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "de::opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task shell with the given id and query
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            task_type: TaskType::default(),
            agents: vec![DEFAULT_AGENT.to_string()],
            options: serde_json::Value::Null,
            status: TaskStatus::default(),
            progress: 0.0,
            results: None,
            error: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Set the task type
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Set the agents
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Check if the task reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Stamp the end time, once
    pub(crate) fn stamp_end_time(&mut self) {
        if self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
    }

    /// Wall-clock duration, available once the task has ended
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time.map(|ended| {
            let duration = ended.signed_duration_since(self.start_time);
            duration.num_milliseconds().max(0) as u64
        })
    }
}
