//! Research session: wiring between store, dashboard and service
//!
//! `ResearchSession::connect` opens the push channel and spawns the
//! background workers that keep the local state converging on the
//! service's: a push dispatcher, a status poll loop that covers for
//! dropped events, and the dashboard refresh cadence.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use dra_core::event::PushEvent;

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::dashboard::DashboardAggregator;
use crate::error::ApiError;
use crate::gateway::{Gateway, ResearchApi};
use crate::push::{PushChannel, PushHandle};
use crate::store::{StoreEvent, TaskStore};

const EVENT_QUEUE_CAPACITY: usize = 256;

/// A connected client session
///
/// Dropping the session disconnects the push channel and stops the
/// workers.
pub struct ResearchSession {
    store: TaskStore,
    dashboard: DashboardAggregator,
    push: Option<PushHandle>,
    workers: Vec<JoinHandle<()>>,
}

impl ResearchSession {
    /// Connect to the service and start the background workers
    pub async fn connect(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let api: Arc<dyn ResearchApi> = Arc::new(Gateway::new(&config, credentials.clone()));
        let store = TaskStore::new(api.clone(), config.history_cap);
        let dashboard = DashboardAggregator::new(api);

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let push = PushChannel::new(&config, credentials)
            .connect(events_tx)
            .await?;
        info!("Session connected to {}", config.base_url);

        let workers = spawn_workers(store.clone(), dashboard.clone(), events_rx, &config);
        Ok(Self {
            store,
            dashboard,
            push: Some(push),
            workers,
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn dashboard(&self) -> &DashboardAggregator {
        &self.dashboard
    }

    /// True while the push stream is still being read
    ///
    /// The status poll keeps task state converging either way; once this
    /// turns false the owner decides whether to connect again.
    pub fn push_connected(&self) -> bool {
        self.push.as_ref().is_some_and(|push| push.is_connected())
    }

    /// Disconnect the push channel and stop the workers
    pub fn shutdown(&mut self) {
        if let Some(mut push) = self.push.take() {
            push.disconnect();
        }
        for worker in self.workers.drain(..) {
            worker.abort();
        }
    }
}

impl Drop for ResearchSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the session's background loops
///
/// Four workers: push dispatch, status polling, periodic dashboard
/// refresh (first tick fires immediately, standing in for the initial
/// fetch), and a listener that refreshes the dashboard once a task
/// finishes so its counters catch up right away.
fn spawn_workers(
    store: TaskStore,
    dashboard: DashboardAggregator,
    mut events: mpsc::Receiver<PushEvent>,
    config: &ClientConfig,
) -> Vec<JoinHandle<()>> {
    let dispatch = {
        let store = store.clone();
        let dashboard = dashboard.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PushEvent::Task(update) => {
                        store.apply_update(update).await;
                    }
                    PushEvent::Agent(update) => {
                        dashboard.apply_agent_status(&update).await;
                    }
                }
            }
            debug!("Push dispatch stopped");
        })
    };

    let poll = {
        let store = store.clone();
        let mut ticker = tokio::time::interval(config.task_poll_interval);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                if let Err(err) = store.refresh_status().await {
                    debug!("Background status poll failed: {}", err);
                }
            }
        })
    };

    let refresh = {
        let dashboard = dashboard.clone();
        let mut ticker = tokio::time::interval(config.dashboard_refresh_interval);
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let _ = dashboard.refresh().await;
            }
        })
    };

    let on_finished = {
        let mut changes = store.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(StoreEvent::Finished { .. }) => {
                        let _ = dashboard.refresh().await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Change listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    vec![dispatch, poll, refresh, on_finished]
}
