//! Test doubles shared by the store, dashboard and session tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use dra_core::agent::{Agent, AgentConfigUpdate, AgentStatus};
use dra_core::dashboard::{AgentActivity, DashboardSnapshot, ServiceHealth};
use dra_core::settings::{ClientSettings, SettingsPatch};
use dra_core::task::{Task, TaskSpec, TaskStatus};
use dra_core::tool::{Tool, ToolProbe, ToolRegistration};

use crate::error::{ApiError, Result};
use crate::gateway::ResearchApi;

/// Scripted in-memory stand-in for the HTTP gateway.
/// Responses are queued per endpoint and consumed in order; an endpoint
/// called without a scripted response fails like an unreachable server.
#[derive(Default)]
pub(crate) struct FakeApi {
    pub create_responses: Mutex<VecDeque<Result<Task>>>,
    pub status_responses: Mutex<VecDeque<Result<Task>>>,
    pub cancel_responses: Mutex<VecDeque<Result<()>>>,
    pub dashboard_responses: Mutex<VecDeque<Result<DashboardSnapshot>>>,
    pub history_tasks: Mutex<Vec<Task>>,
    pub agent_roster: Mutex<Vec<Agent>>,
    pub last_created_spec: Mutex<Option<TaskSpec>>,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub dashboard_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create(&self, response: Result<Task>) {
        self.create_responses.lock().unwrap().push_back(response);
    }

    pub fn script_status(&self, response: Result<Task>) {
        self.status_responses.lock().unwrap().push_back(response);
    }

    pub fn script_cancel(&self, response: Result<()>) {
        self.cancel_responses.lock().unwrap().push_back(response);
    }

    pub fn script_dashboard(&self, response: Result<DashboardSnapshot>) {
        self.dashboard_responses.lock().unwrap().push_back(response);
    }

    pub fn set_roster(&self, agents: Vec<Agent>) {
        *self.agent_roster.lock().unwrap() = agents;
    }

    pub fn set_history(&self, tasks: Vec<Task>) {
        *self.history_tasks.lock().unwrap() = tasks;
    }

    fn unscripted<T>() -> Result<T> {
        Err(ApiError::network("unscripted call"))
    }
}

#[async_trait]
impl ResearchApi for FakeApi {
    async fn create_task(&self, spec: &TaskSpec) -> Result<Task> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_created_spec.lock().unwrap() = Some(spec.clone());
        self.create_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    async fn task_status(&self, _task_id: &str) -> Result<Task> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    async fn cancel_task(&self, _task_id: &str) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancel_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn history(&self, limit: usize) -> Result<Vec<Task>> {
        let tasks = self.history_tasks.lock().unwrap().clone();
        Ok(tasks.into_iter().take(limit).collect())
    }

    async fn agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agent_roster.lock().unwrap().clone())
    }

    async fn update_agent_config(
        &self,
        _agent_id: &str,
        _update: &AgentConfigUpdate,
    ) -> Result<()> {
        Ok(())
    }

    async fn toggle_agent(&self, _agent_id: &str, _enabled: bool) -> Result<()> {
        Ok(())
    }

    async fn restart_agent(&self, _agent_id: &str) -> Result<()> {
        Ok(())
    }

    async fn tools(&self) -> Result<Vec<Tool>> {
        Ok(Vec::new())
    }

    async fn register_tool(&self, _registration: &ToolRegistration) -> Result<String> {
        Ok("tool_1".to_string())
    }

    async fn test_tool(&self, _tool_id: &str) -> Result<ToolProbe> {
        Ok(ToolProbe::default())
    }

    async fn settings(&self) -> Result<ClientSettings> {
        Ok(ClientSettings::default())
    }

    async fn update_settings(&self, _patch: &SettingsPatch) -> Result<()> {
        Ok(())
    }

    async fn api_keys(&self) -> Result<HashMap<String, bool>> {
        Ok(HashMap::new())
    }

    async fn update_api_key(&self, _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn dashboard(&self) -> Result<DashboardSnapshot> {
        self.dashboard_calls.fetch_add(1, Ordering::SeqCst);
        self.dashboard_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(Self::unscripted)
    }

    async fn health(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::default())
    }
}

/// Task shaped like a create response: pending, zero progress
pub(crate) fn pending_task(id: &str, query: &str) -> Task {
    Task::new(id, query)
}

/// Task shaped like a status poll snapshot
pub(crate) fn polled_task(id: &str, status: TaskStatus, progress: f64) -> Task {
    let mut task = Task::new(id, "test query").with_status(status);
    task.progress = progress;
    task
}

pub(crate) fn roster_agent(id: &str, status: AgentStatus) -> Agent {
    Agent {
        id: id.to_string(),
        name: id.to_string(),
        agent_type: format!("{}_agent", id),
        model: Some("claude-3-7-sonnet-thinking".to_string()),
        enabled: true,
        status,
    }
}

pub(crate) fn dashboard_with_agents(agents: &[(&str, AgentStatus)]) -> DashboardSnapshot {
    DashboardSnapshot {
        agent_status: agents
            .iter()
            .map(|(id, status)| AgentActivity {
                id: id.to_string(),
                status: *status,
                tasks: 0,
            })
            .collect(),
        ..Default::default()
    }
}
