//! Core library for the Deep Research Agent client
//!
//! This crate contains the client-side domain logic, including:
//! - Research task lifecycle and update merging
//! - Push event payloads
//! - Agent, tool, settings and dashboard models
//!
//! Everything here is pure state: no network, no timers. The async
//! orchestration lives in the `dra-client` crate.

pub mod agent;
pub mod dashboard;
pub mod error;
pub mod event;
pub mod settings;
pub mod task;
pub mod tool;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
