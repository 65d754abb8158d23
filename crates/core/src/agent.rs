//! Agent roster models
//!
//! Agents execute remotely; the client renders the roster, patches live
//! status from push events and submits configuration changes.

use serde::{Deserialize, Deserializer, Serialize};

/// Live status reported for an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Idle,
    Error,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    /// Parse a status string, tolerating the aliases the service emits
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" | "busy" | "running" => Some(Self::Active),
            "idle" | "ready" => Some(Self::Idle),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A roster entry carrying an unknown status is shown as idle rather than
/// rejected with the whole payload.
pub(crate) fn status_lenient<'de, D>(deserializer: D) -> Result<AgentStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(AgentStatus::parse_lenient(&raw).unwrap_or_default())
}

pub(crate) fn default_enabled() -> bool {
    true
}

/// One agent in the service's roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub agent_type: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "status_lenient")]
    pub status: AgentStatus,
}

/// Model parameters accepted by the per-agent configuration endpoint.
/// Unset fields are omitted from the request and left unchanged remotely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl AgentConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model the agent should use
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token limit
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the nucleus sampling parameter
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }
}
