//! Deep Research Agent client - Async orchestration layer
//!
//! This crate provides the networked half of the client: the HTTP
//! gateway, the push channel, credential storage, and the background
//! session that keeps the local task and dashboard state converging on
//! the service's.

mod config;
mod credentials;
mod dashboard;
mod error;
mod gateway;
mod push;
mod session;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use dashboard::{DashboardAggregator, DashboardState};
pub use error::{ApiError, Result, TaskError};
pub use gateway::{Gateway, ResearchApi};
pub use push::{PushChannel, PushHandle, EVENTS_PATH};
pub use session::ResearchSession;
pub use store::{StoreEvent, TaskStore};
