//! Task store: single writer for the session's task state
//!
//! Every mutation passes through this store, which serializes writers
//! behind one lock and applies each piece of news atomically against the
//! state it finds. Push events and poll snapshots are merged through the
//! same reducer, so neither source can corrupt the other's view.
//! Observable changes fan out on a broadcast channel.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use dra_core::task::{
    MergeOutcome, ResearchPhase, ResearchState, Task, TaskSpec, TaskStatus, TaskUpdate,
};

use crate::error::TaskError;
use crate::gateway::ResearchApi;

const CHANGES_CAPACITY: usize = 64;

/// Store change notification
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A task was created and is now tracked
    Created { task_id: String },
    /// The tracked task or its transient-error flag changed
    Updated { task_id: String },
    /// The tracked task reached a terminal status
    Finished { task_id: String, status: TaskStatus },
    /// Creation failed before any id was assigned
    CreateFailed,
    /// The history list was replaced from the service
    HistoryLoaded,
    /// The readable task and retained errors were dropped
    Cleared,
}

/// Shared handle to the session's task state
#[derive(Clone)]
pub struct TaskStore {
    api: Arc<dyn ResearchApi>,
    state: Arc<RwLock<ResearchState>>,
    changes: broadcast::Sender<StoreEvent>,
}

fn task_error(err: dra_core::Error) -> TaskError {
    match err {
        dra_core::Error::InvalidSpec(message) => TaskError::Validation(message),
        dra_core::Error::TaskActive => TaskError::AlreadyRunning,
        dra_core::Error::TaskNotRunning => TaskError::NotRunning,
        other => TaskError::Validation(other.to_string()),
    }
}

impl TaskStore {
    pub fn new(api: Arc<dyn ResearchApi>, history_cap: usize) -> Self {
        let (changes, _) = broadcast::channel(CHANGES_CAPACITY);
        Self {
            api,
            state: Arc::new(RwLock::new(ResearchState::new(history_cap))),
            changes,
        }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }

    /// Clone of the full session state
    pub async fn snapshot(&self) -> ResearchState {
        self.state.read().await.clone()
    }

    pub async fn current_task(&self) -> Option<Task> {
        self.state.read().await.current().cloned()
    }

    pub async fn phase(&self) -> ResearchPhase {
        self.state.read().await.phase()
    }

    /// Create a new research task
    ///
    /// The `Creating` phase is claimed under the write lock before the
    /// request goes out, so of two racing creates exactly one reaches the
    /// service; the other observes the claim and fails `AlreadyRunning`.
    /// Validation failures are local and leave the state untouched.
    pub async fn create(&self, spec: TaskSpec) -> Result<Task, TaskError> {
        let spec = {
            let mut state = self.state.write().await;
            state.begin_create(spec).map_err(task_error)?
        };

        match self.api.create_task(&spec).await {
            Ok(task) => {
                let task = {
                    let mut state = self.state.write().await;
                    state.bind_created(task)
                };
                info!("Research task {} created", task.id);
                let _ = self.changes.send(StoreEvent::Created {
                    task_id: task.id.clone(),
                });
                if task.is_terminal() {
                    let _ = self.changes.send(StoreEvent::Finished {
                        task_id: task.id.clone(),
                        status: task.status,
                    });
                }
                Ok(task)
            }
            Err(err) => {
                warn!("Task creation failed: {}", err);
                {
                    let mut state = self.state.write().await;
                    state.create_failed(err.to_string());
                }
                let _ = self.changes.send(StoreEvent::CreateFailed);
                Err(TaskError::Api(err))
            }
        }
    }

    /// Cancel the running task
    ///
    /// Rejected locally, with no request issued, when nothing is running.
    /// Once the service acknowledges, the local transition to `Cancelled`
    /// is immediate; the corroborating push event arriving later is
    /// absorbed as a no-op.
    pub async fn cancel(&self) -> Result<(), TaskError> {
        let task_id = {
            let state = self.state.read().await;
            state.cancellable().map_err(task_error)?.to_string()
        };

        self.api
            .cancel_task(&task_id)
            .await
            .map_err(TaskError::Cancel)?;
        self.apply_update(TaskUpdate::cancelled(&task_id)).await;
        Ok(())
    }

    /// Merge news about the tracked task, from push or poll alike
    pub async fn apply_update(&self, update: TaskUpdate) -> MergeOutcome {
        let (outcome, status) = {
            let mut state = self.state.write().await;
            let outcome = state.apply_update(&update);
            (outcome, state.current().map(|task| task.status))
        };

        let task_id = update.task_id;
        match outcome {
            MergeOutcome::Applied => {
                let _ = self.changes.send(StoreEvent::Updated { task_id });
            }
            MergeOutcome::Finished => {
                if let Some(status) = status {
                    info!("Research task {} finished: {:?}", task_id, status);
                    let _ = self.changes.send(StoreEvent::Finished { task_id, status });
                }
            }
            MergeOutcome::Stale => debug!("Discarding stale update for {}", task_id),
            MergeOutcome::AlreadyTerminal => {
                debug!("Task {} already terminal, update ignored", task_id)
            }
            MergeOutcome::Mismatch => debug!("Update for untracked task {} ignored", task_id),
        }
        outcome
    }

    /// Fetch the running task's status and merge it like a push event
    ///
    /// `Ok(None)` when no task is running. A fetch failure is recorded as
    /// the transient error and surfaced; it never changes the task.
    pub async fn refresh_status(&self) -> Result<Option<MergeOutcome>, TaskError> {
        let task_id = {
            let state = self.state.read().await;
            match state.phase() {
                ResearchPhase::Running => state.current().map(|task| task.id.clone()),
                _ => None,
            }
        };
        let Some(task_id) = task_id else {
            return Ok(None);
        };

        match self.api.task_status(&task_id).await {
            Ok(snapshot) => {
                self.state.write().await.clear_transient_error();
                let outcome = self.apply_update(TaskUpdate::from(&snapshot)).await;
                Ok(Some(outcome))
            }
            Err(err) => {
                warn!("Status refresh for {} failed: {}", task_id, err);
                self.state
                    .write()
                    .await
                    .record_transient_error(err.to_string());
                let _ = self.changes.send(StoreEvent::Updated { task_id });
                Err(TaskError::Api(err))
            }
        }
    }

    /// Replace the local history from the service, most recent first.
    /// The tracked task stays authoritative for itself.
    pub async fn load_history(&self, limit: usize) -> Result<Vec<Task>, TaskError> {
        let tasks = self.api.history(limit).await.map_err(TaskError::Api)?;
        let kept = {
            let mut state = self.state.write().await;
            state.absorb_history(tasks);
            state.history().to_vec()
        };
        let _ = self.changes.send(StoreEvent::HistoryLoaded);
        Ok(kept)
    }

    /// Drop the readable task and retained errors once the session has
    /// settled; a task in flight stays tracked
    pub async fn clear(&self) {
        let dropped = {
            let mut state = self.state.write().await;
            state.clear()
        };
        if dropped {
            let _ = self.changes.send(StoreEvent::Cleared);
        }
    }
}
