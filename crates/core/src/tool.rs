//! MCP tool registry models
//!
//! Tools are search, crawl and memory backends the service connects to
//! over MCP. The client lists them, registers new ones and probes
//! connectivity.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::agent::default_enabled;

/// Connection state of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolConnection {
    Connected,
    Disconnected,
}

impl Default for ToolConnection {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl ToolConnection {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Anything other than an affirmative "connected" renders as disconnected.
fn connection_lenient<'de, D>(deserializer: D) -> Result<ToolConnection, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().eq_ignore_ascii_case("connected") {
        Ok(ToolConnection::Connected)
    } else {
        Ok(ToolConnection::Disconnected)
    }
}

/// One tool in the service's registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "connection_lenient")]
    pub status: ToolConnection,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Registration request for a new tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRegistration {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Opaque configuration bag, passed through untouched
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

impl ToolRegistration {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            endpoint: None,
            config: Value::Null,
        }
    }

    /// Set the endpoint the service should reach the tool at
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the opaque configuration bag
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

/// Outcome of probing a tool's connectivity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolProbe {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ToolProbe {
    pub fn succeeded(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}
