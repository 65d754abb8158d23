//! Research task module
//!
//! This module contains the task model, the update merge rules and the
//! client-side session state machine.

pub(crate) mod de;
mod history;
mod model;
mod state;
mod update;

pub use history::{TaskHistory, DEFAULT_HISTORY_CAP};
pub use model::*;
pub use state::{ResearchPhase, ResearchState};
pub use update::{MergeOutcome, TaskUpdate};
