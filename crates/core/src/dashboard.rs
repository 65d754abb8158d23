//! Dashboard and service health models
//!
//! The dashboard payload is a read-only aggregate computed by the service.
//! Every field defaults so a drifting payload renders partially instead of
//! not at all.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{status_lenient, AgentStatus};
use crate::task::{de, Task};

/// Headline counters shown at the top of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    #[serde(default)]
    pub completed_tasks: u64,
    #[serde(default)]
    pub active_agents: u32,
    /// Preformatted by the service, e.g. "94%"
    #[serde(default)]
    pub success_rate: String,
    /// Preformatted by the service, e.g. "12h 34m"
    #[serde(default)]
    pub total_research_time: String,
}

/// Per-agent activity row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub id: String,
    #[serde(default, deserialize_with = "status_lenient")]
    pub status: AgentStatus,
    /// Tasks currently assigned to the agent
    #[serde(default)]
    pub tasks: u32,
}

/// Service-computed performance aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    #[serde(default)]
    pub avg_response_time: f64,
    #[serde(default)]
    pub task_success_rate: f64,
    /// Task counts per day, oldest first
    #[serde(default)]
    pub daily_tasks: Vec<u32>,
}

/// Full dashboard payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub stats: DashboardStats,
    #[serde(default)]
    pub recent_tasks: Vec<Task>,
    #[serde(default)]
    pub agent_status: Vec<AgentActivity>,
    #[serde(default)]
    pub performance_metrics: PerformanceMetrics,
}

impl DashboardSnapshot {
    /// Patch one agent's live status in place, from a push event.
    /// Returns whether the agent was present.
    pub fn patch_agent(&mut self, agent_id: &str, status: AgentStatus) -> bool {
        match self
            .agent_status
            .iter_mut()
            .find(|entry| entry.id == agent_id)
        {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }
}

/// Liveness summary from the health endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: String,
    #[serde(
        default,
        deserialize_with = "de::opt_datetime",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_tasks: u32,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
