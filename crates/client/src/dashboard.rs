//! Dashboard aggregation with last-known-good semantics
//!
//! Periodic refreshes replace the whole snapshot; a failed refresh keeps
//! the previous data readable and records the failure instead of blanking
//! the view. Agent status pushes are patched into the snapshot between
//! refreshes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use dra_core::agent::Agent;
use dra_core::dashboard::DashboardSnapshot;
use dra_core::event::AgentStatusUpdate;

use crate::error::ApiError;
use crate::gateway::ResearchApi;

/// Last-known-good dashboard data plus freshness metadata
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub snapshot: DashboardSnapshot,
    pub agents: Vec<Agent>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl DashboardState {
    /// Whether the data is older than `max_age` (or was never fetched)
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.refreshed_at {
            Some(at) => Utc::now() - at > max_age,
            None => true,
        }
    }
}

/// Shared handle to the aggregated dashboard view
#[derive(Clone)]
pub struct DashboardAggregator {
    api: Arc<dyn ResearchApi>,
    state: Arc<RwLock<DashboardState>>,
}

impl DashboardAggregator {
    pub fn new(api: Arc<dyn ResearchApi>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(DashboardState::default())),
        }
    }

    /// Clone of the current view
    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Fetch the dashboard snapshot and agent roster
    ///
    /// Both fetches must succeed before anything is replaced; on failure
    /// the previous view survives and only `last_error` changes.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let fetched = self.fetch().await;
        let mut state = self.state.write().await;
        match fetched {
            Ok((snapshot, agents)) => {
                state.snapshot = snapshot;
                state.agents = agents;
                state.refreshed_at = Some(Utc::now());
                state.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!("Dashboard refresh failed: {}", err);
                state.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<(DashboardSnapshot, Vec<Agent>), ApiError> {
        let snapshot = self.api.dashboard().await?;
        let agents = self.api.agents().await?;
        Ok((snapshot, agents))
    }

    /// Patch one agent's status from a push event
    pub async fn apply_agent_status(&self, update: &AgentStatusUpdate) {
        let mut state = self.state.write().await;
        let in_snapshot = state.snapshot.patch_agent(&update.agent_id, update.status);
        let mut in_roster = false;
        if let Some(agent) = state
            .agents
            .iter_mut()
            .find(|agent| agent.id == update.agent_id)
        {
            agent.status = update.status;
            in_roster = true;
        }
        if !in_snapshot && !in_roster {
            debug!("Status push for unknown agent {} ignored", update.agent_id);
        }
    }
}
