//! HTTP gateway to the research service
//!
//! One thin method per service endpoint: attach the bearer credential,
//! send, map the failure into [`ApiError`], decode. No retries live here;
//! redelivery policy belongs to the callers that know what is idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dra_core::agent::{Agent, AgentConfigUpdate};
use dra_core::dashboard::{DashboardSnapshot, ServiceHealth};
use dra_core::settings::{ClientSettings, SettingsPatch};
use dra_core::task::{Task, TaskSpec};
use dra_core::tool::{Tool, ToolProbe, ToolRegistration};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, Result};

/// Request surface of the research service
///
/// The store and aggregator depend on this trait, so tests substitute an
/// in-memory fake for the HTTP gateway.
#[async_trait]
pub trait ResearchApi: Send + Sync {
    async fn create_task(&self, spec: &TaskSpec) -> Result<Task>;
    async fn task_status(&self, task_id: &str) -> Result<Task>;
    async fn cancel_task(&self, task_id: &str) -> Result<()>;
    async fn history(&self, limit: usize) -> Result<Vec<Task>>;

    async fn agents(&self) -> Result<Vec<Agent>>;
    async fn update_agent_config(&self, agent_id: &str, update: &AgentConfigUpdate) -> Result<()>;
    async fn toggle_agent(&self, agent_id: &str, enabled: bool) -> Result<()>;
    async fn restart_agent(&self, agent_id: &str) -> Result<()>;

    async fn tools(&self) -> Result<Vec<Tool>>;
    async fn register_tool(&self, registration: &ToolRegistration) -> Result<String>;
    async fn test_tool(&self, tool_id: &str) -> Result<ToolProbe>;

    async fn settings(&self) -> Result<ClientSettings>;
    async fn update_settings(&self, patch: &SettingsPatch) -> Result<()>;
    async fn api_keys(&self) -> Result<HashMap<String, bool>>;
    async fn update_api_key(&self, name: &str, value: &str) -> Result<()>;

    async fn dashboard(&self) -> Result<DashboardSnapshot>;
    async fn health(&self) -> Result<ServiceHealth>;
}

/// Reqwest-backed implementation of [`ResearchApi`]
pub struct Gateway {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

#[derive(Deserialize)]
struct RegisteredTool {
    id: String,
}

#[derive(Serialize)]
struct ApiKeyUpdate<'a> {
    key: &'a str,
    value: &'a str,
}

pub(crate) fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::network(err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::server(status, format!("undecodable payload: {}", err)))
}

impl Gateway {
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: config.base_url.clone(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the credential, send, and map failures.
    /// A 401 clears the stored credential so the next attempt starts clean.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        let request = match self.credentials.get().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            debug!("Service rejected credential, clearing it");
            self.credentials.clear().await;
            return Err(ApiError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::not_found(path));
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::server(status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path, self.client.get(self.url(path))).await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(path)).json(body);
        let response = self.send(path, request).await?;
        decode(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path, self.client.post(self.url(path))).await?;
        decode(response).await
    }

    /// POST without a body where only the status matters
    async fn post_ack(&self, path: &str) -> Result<()> {
        self.send(path, self.client.post(self.url(path)))
            .await
            .map(|_| ())
    }

    /// PUT where only the status matters
    async fn put_ack<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let request = self.client.put(self.url(path)).json(body);
        self.send(path, request).await.map(|_| ())
    }
}

#[async_trait]
impl ResearchApi for Gateway {
    async fn create_task(&self, spec: &TaskSpec) -> Result<Task> {
        info!("Creating research task: {:?}", spec.task_type);
        // Sent exactly once: retrying a failed create could duplicate the
        // task server-side. Redelivery stays with the caller.
        self.post_json("/api/research/task", spec).await
    }

    async fn task_status(&self, task_id: &str) -> Result<Task> {
        let path = format!("/api/research/task/{}", urlencoding::encode(task_id));
        self.get_json(&path).await
    }

    async fn cancel_task(&self, task_id: &str) -> Result<()> {
        info!("Cancelling research task {}", task_id);
        let path = format!("/api/research/task/{}/cancel", urlencoding::encode(task_id));
        self.post_ack(&path).await
    }

    async fn history(&self, limit: usize) -> Result<Vec<Task>> {
        let path = "/api/research/history";
        let request = self
            .client
            .get(self.url(path))
            .query(&[("limit", limit)]);
        let response = self.send(path, request).await?;
        decode(response).await
    }

    async fn agents(&self) -> Result<Vec<Agent>> {
        self.get_json("/api/agents").await
    }

    async fn update_agent_config(&self, agent_id: &str, update: &AgentConfigUpdate) -> Result<()> {
        let path = format!("/api/agents/{}/config", urlencoding::encode(agent_id));
        self.put_ack(&path, update).await
    }

    async fn toggle_agent(&self, agent_id: &str, enabled: bool) -> Result<()> {
        debug!("Toggling agent {} to enabled={}", agent_id, enabled);
        let path = format!("/api/agents/{}/toggle", urlencoding::encode(agent_id));
        // The service takes the flag as a query parameter
        let request = self
            .client
            .post(self.url(&path))
            .query(&[("enabled", enabled)]);
        self.send(&path, request).await.map(|_| ())
    }

    async fn restart_agent(&self, agent_id: &str) -> Result<()> {
        info!("Restarting agent {}", agent_id);
        let path = format!("/api/agents/{}/restart", urlencoding::encode(agent_id));
        self.post_ack(&path).await
    }

    async fn tools(&self) -> Result<Vec<Tool>> {
        self.get_json("/api/mcp/tools").await
    }

    async fn register_tool(&self, registration: &ToolRegistration) -> Result<String> {
        info!("Registering tool {}", registration.name);
        let registered: RegisteredTool = self
            .post_json("/api/mcp/tools/register", registration)
            .await?;
        Ok(registered.id)
    }

    async fn test_tool(&self, tool_id: &str) -> Result<ToolProbe> {
        let path = format!("/api/mcp/tools/{}/test", urlencoding::encode(tool_id));
        self.post_empty(&path).await
    }

    async fn settings(&self) -> Result<ClientSettings> {
        self.get_json("/api/settings").await
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<()> {
        self.put_ack("/api/settings", patch).await
    }

    async fn api_keys(&self) -> Result<HashMap<String, bool>> {
        self.get_json("/api/settings/api-keys").await
    }

    async fn update_api_key(&self, name: &str, value: &str) -> Result<()> {
        // The presence map, not the value, is all that ever comes back
        self.put_ack("/api/settings/api-keys", &ApiKeyUpdate { key: name, value })
            .await
    }

    async fn dashboard(&self) -> Result<DashboardSnapshot> {
        self.get_json("/api/dashboard").await
    }

    async fn health(&self) -> Result<ServiceHealth> {
        self.get_json("/api/health").await
    }
}
