//! Client-side session state machine
//!
//! At most one research task is tracked per session. The state walks
//! `Idle -> Creating -> Running -> {Completed | Failed | Cancelled}` and
//! becomes eligible for a new create again once the task is terminal. The
//! terminal task stays readable until the next create replaces it or
//! [`ResearchState::clear`] drops it.
//!
//! All methods are synchronous and pure; the async store in `dra-client`
//! serializes callers and applies each event atomically against this state.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

use super::history::TaskHistory;
use super::model::{Task, TaskSpec, TaskStatus};
use super::update::{MergeOutcome, TaskUpdate};

/// Lifecycle phase of the research session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchPhase {
    /// No task tracked yet
    Idle,
    /// A create request is in flight, no id assigned yet
    Creating,
    /// The task is executing remotely
    Running,
    /// Terminal: finished with results
    Completed,
    /// Terminal: finished with an error
    Failed,
    /// Terminal: cancelled by the user
    Cancelled,
}

impl Default for ResearchPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl ResearchPhase {
    /// Check if the phase is a terminal one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Check if a task is in flight (created or creating)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Creating | Self::Running)
    }
}

fn terminal_phase(status: TaskStatus) -> ResearchPhase {
    match status {
        TaskStatus::Completed => ResearchPhase::Completed,
        TaskStatus::Failed => ResearchPhase::Failed,
        TaskStatus::Cancelled => ResearchPhase::Cancelled,
        TaskStatus::Pending | TaskStatus::Running => ResearchPhase::Running,
    }
}

/// Authoritative session state: the current task, bounded history and the
/// errors retained for display
#[derive(Debug, Clone)]
pub struct ResearchState {
    phase: ResearchPhase,
    current: Option<Task>,
    history: TaskHistory,
    /// Creation failure retained for display, cleared on the next create
    last_error: Option<String>,
    /// Background refresh failure; never promoted to a task status change
    transient_error: Option<String>,
}

impl Default for ResearchState {
    fn default() -> Self {
        Self::new(super::history::DEFAULT_HISTORY_CAP)
    }
}

impl ResearchState {
    pub fn new(history_cap: usize) -> Self {
        Self {
            phase: ResearchPhase::Idle,
            current: None,
            history: TaskHistory::new(history_cap),
            last_error: None,
            transient_error: None,
        }
    }

    pub fn phase(&self) -> ResearchPhase {
        self.phase
    }

    /// The tracked task, if any; stays readable after it turns terminal
    pub fn current(&self) -> Option<&Task> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &TaskHistory {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn transient_error(&self) -> Option<&str> {
        self.transient_error.as_deref()
    }

    /// Check if a new create is currently accepted
    pub fn can_create(&self) -> bool {
        !self.phase.is_active()
    }

    /// Claim the `Creating` phase for a validated spec
    ///
    /// Fails with [`Error::TaskActive`] while another task is in flight and
    /// with [`Error::InvalidSpec`] on an empty query; neither failure
    /// changes any state. On success the phase is claimed synchronously, so
    /// a racing create observes `Creating` and is rejected.
    pub fn begin_create(&mut self, spec: TaskSpec) -> Result<TaskSpec> {
        if !self.can_create() {
            return Err(Error::TaskActive);
        }
        let spec = spec.normalized()?;
        self.phase = ResearchPhase::Creating;
        self.last_error = None;
        self.transient_error = None;
        Ok(spec)
    }

    /// Bind the service's create response as the tracked task
    ///
    /// The assigned id is immutable from here on. The service answers with
    /// a pending-style status; the task counts as running the moment it is
    /// bound. A terminal status in the response is honored directly.
    pub fn bind_created(&mut self, mut task: Task) -> Task {
        if task.status.is_terminal() {
            task.stamp_end_time();
            self.phase = terminal_phase(task.status);
            self.history.record(task.clone());
        } else {
            task.status = TaskStatus::Running;
            self.phase = ResearchPhase::Running;
        }
        self.current = Some(task.clone());
        task
    }

    /// Roll back a failed create
    ///
    /// No task is retained for the attempt; the failure is kept for
    /// display. A previously finished task stays readable.
    pub fn create_failed(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.phase = match &self.current {
            Some(task) => terminal_phase(task.status),
            None => ResearchPhase::Idle,
        };
    }

    /// Merge news about the current task from any source
    ///
    /// The rules live in [`TaskUpdate::apply_to`]; on a terminal outcome
    /// the task is frozen into history and the session becomes eligible
    /// for a new create.
    pub fn apply_update(&mut self, update: &TaskUpdate) -> MergeOutcome {
        let Some(task) = self.current.as_mut() else {
            return MergeOutcome::Mismatch;
        };

        let outcome = update.apply_to(task);
        if outcome == MergeOutcome::Finished {
            self.phase = terminal_phase(task.status);
            self.history.record(task.clone());
        }
        outcome
    }

    /// Id of the task a cancel request may target
    ///
    /// Only a running task is cancellable; anything else is rejected here,
    /// before any network request is issued.
    pub fn cancellable(&self) -> Result<&str> {
        if self.phase != ResearchPhase::Running {
            return Err(Error::TaskNotRunning);
        }
        self.current
            .as_ref()
            .map(|task| task.id.as_str())
            .ok_or(Error::TaskNotRunning)
    }

    /// Record a failed background refresh; never touches the task itself
    pub fn record_transient_error(&mut self, message: impl Into<String>) {
        self.transient_error = Some(message.into());
    }

    /// A successful refresh retracts the transient flag
    pub fn clear_transient_error(&mut self) {
        self.transient_error = None;
    }

    /// Drop the readable task and any retained errors
    ///
    /// Only settled sessions are cleared; while a task is in flight the
    /// call clears the error fields and keeps the task. Returns whether
    /// the task was dropped.
    pub fn clear(&mut self) -> bool {
        self.last_error = None;
        self.transient_error = None;
        if self.phase.is_active() {
            return false;
        }
        self.current = None;
        self.phase = ResearchPhase::Idle;
        true
    }

    /// Replace the history with a server-provided list, most recent first
    ///
    /// The current task stays authoritative for itself and is filtered out
    /// of the incoming list.
    pub fn absorb_history(&mut self, tasks: Vec<Task>) {
        let current_id = self.current.as_ref().map(|task| task.id.clone());
        let tasks = tasks
            .into_iter()
            .filter(|task| current_id.as_deref() != Some(task.id.as_str()))
            .collect();
        self.history.replace(tasks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::DEFAULT_AGENT;

    fn spec(query: &str) -> TaskSpec {
        TaskSpec::new(query)
    }

    fn created_task(id: &str) -> Task {
        let mut task = Task::new(id, "test query");
        task.status = TaskStatus::Pending;
        task
    }

    fn state_with_running_task(id: &str) -> ResearchState {
        let mut state = ResearchState::new(10);
        state.begin_create(spec("test query")).unwrap();
        state.bind_created(created_task(id));
        state
    }

    #[test]
    fn test_create_from_idle_claims_creating() {
        let mut state = ResearchState::new(10);
        assert_eq!(state.phase(), ResearchPhase::Idle);

        let normalized = state.begin_create(spec("llm evaluation methods")).unwrap();
        assert_eq!(state.phase(), ResearchPhase::Creating);
        assert_eq!(normalized.agents, vec![DEFAULT_AGENT.to_string()]);
    }

    #[test]
    fn test_empty_query_is_rejected_without_state_change() {
        let mut state = ResearchState::new(10);
        let result = state.begin_create(spec("   "));

        assert!(matches!(result, Err(Error::InvalidSpec(_))));
        assert_eq!(state.phase(), ResearchPhase::Idle);
        assert!(state.current().is_none());
    }

    #[test]
    fn test_create_while_active_is_rejected_and_task_untouched() {
        let mut state = state_with_running_task("task_1");

        let result = state.begin_create(spec("another query"));
        assert!(matches!(result, Err(Error::TaskActive)));
        assert_eq!(state.phase(), ResearchPhase::Running);
        assert_eq!(state.current().map(|t| t.id.as_str()), Some("task_1"));

        // Also rejected while the create request is still in flight
        let mut state = ResearchState::new(10);
        state.begin_create(spec("first")).unwrap();
        assert!(matches!(
            state.begin_create(spec("second")),
            Err(Error::TaskActive)
        ));
    }

    #[test]
    fn test_bind_created_marks_running() {
        let mut state = ResearchState::new(10);
        state.begin_create(spec("test query")).unwrap();

        let task = state.bind_created(created_task("task_1"));
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(state.phase(), ResearchPhase::Running);
        assert_eq!(state.current().map(|t| t.id.as_str()), Some("task_1"));
    }

    #[test]
    fn test_create_failure_returns_to_idle_with_error_retained() {
        let mut state = ResearchState::new(10);
        state.begin_create(spec("test query")).unwrap();

        state.create_failed("service unavailable");
        assert_eq!(state.phase(), ResearchPhase::Idle);
        assert!(state.current().is_none());
        assert_eq!(state.last_error(), Some("service unavailable"));

        // Eligible for a new create again, which clears the retained error
        state.begin_create(spec("retry query")).unwrap();
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_create_failure_keeps_previous_terminal_task_readable() {
        let mut state = state_with_running_task("task_1");
        state.apply_update(&TaskUpdate::completed("task_1", None));
        assert_eq!(state.phase(), ResearchPhase::Completed);

        state.begin_create(spec("next query")).unwrap();
        state.create_failed("boom");

        assert_eq!(state.phase(), ResearchPhase::Completed);
        assert_eq!(state.current().map(|t| t.id.as_str()), Some("task_1"));
        assert_eq!(state.last_error(), Some("boom"));
    }

    #[test]
    fn test_out_of_order_updates_keep_max_progress() {
        let mut state = state_with_running_task("t1");

        // Push says 0.4, a late poll says 0.3: the poll is stale
        assert_eq!(
            state.apply_update(&TaskUpdate::progress("t1", 0.4)),
            MergeOutcome::Applied
        );
        assert_eq!(
            state.apply_update(&TaskUpdate::progress("t1", 0.3)),
            MergeOutcome::Stale
        );

        let task = state.current().unwrap();
        assert_eq!(task.progress, 0.4);
        assert_eq!(task.status, TaskStatus::Running);
        assert_eq!(state.phase(), ResearchPhase::Running);
    }

    #[test]
    fn test_terminal_event_overrides_lower_progress_and_freezes_task() {
        let mut state = state_with_running_task("t1");
        state.apply_update(&TaskUpdate::progress("t1", 0.4));

        let mut failure = TaskUpdate::failed("t1", "timeout");
        failure.progress = Some(0.1);
        assert_eq!(state.apply_update(&failure), MergeOutcome::Finished);

        assert_eq!(state.phase(), ResearchPhase::Failed);
        let task = state.current().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("timeout"));
        assert_eq!(task.progress, 0.4);
        assert!(task.end_time.is_some());

        // Frozen into history as well
        assert_eq!(state.history().len(), 1);
        assert_eq!(
            state.history().get("t1").map(|t| t.status),
            Some(TaskStatus::Failed)
        );

        // Later events for the same id are no-ops
        assert_eq!(
            state.apply_update(&TaskUpdate::completed("t1", None)),
            MergeOutcome::AlreadyTerminal
        );
        assert_eq!(state.current().unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn test_final_progress_is_max_seen_across_interleavings() {
        // Property: for interleaved updates with non-decreasing maxima,
        // the stored progress is the max seen before the terminal event.
        let sequences: &[&[f64]] = &[
            &[0.1, 0.4, 0.3, 0.2],
            &[0.5, 0.1, 0.6, 0.55],
            &[0.2, 0.2, 0.9, 0.8, 0.85],
        ];

        for updates in sequences {
            let mut state = state_with_running_task("t1");
            let mut max_seen: f64 = 0.0;
            for &progress in *updates {
                state.apply_update(&TaskUpdate::progress("t1", progress));
                max_seen = max_seen.max(progress);
            }
            state.apply_update(&TaskUpdate::completed("t1", None));
            assert_eq!(state.current().unwrap().progress, max_seen);
        }
    }

    #[test]
    fn test_cancellable_only_while_running() {
        let mut state = ResearchState::new(10);
        assert!(matches!(state.cancellable(), Err(Error::TaskNotRunning)));

        state.begin_create(spec("q")).unwrap();
        assert!(matches!(state.cancellable(), Err(Error::TaskNotRunning)));

        state.bind_created(created_task("t1"));
        assert_eq!(state.cancellable().unwrap(), "t1");

        state.apply_update(&TaskUpdate::cancelled("t1"));
        assert!(matches!(state.cancellable(), Err(Error::TaskNotRunning)));
    }

    #[test]
    fn test_new_create_allowed_after_terminal() {
        let mut state = state_with_running_task("t1");
        state.apply_update(&TaskUpdate::completed("t1", None));
        assert!(state.can_create());

        state.begin_create(spec("follow-up")).unwrap();
        let task = state.bind_created(created_task("t2"));
        assert_eq!(task.id, "t2");
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_transient_error_is_recorded_and_retracted() {
        let mut state = state_with_running_task("t1");

        state.record_transient_error("poll failed: network unavailable");
        assert!(state.transient_error().is_some());
        // The task itself is untouched
        assert_eq!(state.current().unwrap().status, TaskStatus::Running);
        assert_eq!(state.phase(), ResearchPhase::Running);

        state.clear_transient_error();
        assert!(state.transient_error().is_none());
    }

    #[test]
    fn test_clear_drops_settled_task_but_not_active_one() {
        let mut state = state_with_running_task("t1");
        assert!(!state.clear());
        assert!(state.current().is_some());

        state.apply_update(&TaskUpdate::completed("t1", None));
        assert!(state.clear());
        assert!(state.current().is_none());
        assert_eq!(state.phase(), ResearchPhase::Idle);
        // History survives a clear
        assert_eq!(state.history().len(), 1);
    }

    #[test]
    fn test_absorb_history_filters_current_task() {
        let mut state = state_with_running_task("t2");

        state.absorb_history(vec![
            Task::new("t2", "current, reported by the service too"),
            Task::new("t1", "older"),
        ]);

        assert_eq!(state.history().len(), 1);
        assert!(state.history().get("t2").is_none());
        assert!(state.history().get("t1").is_some());
        // The tracked copy stays authoritative
        assert_eq!(state.current().unwrap().status, TaskStatus::Running);
    }

    #[test]
    fn test_bind_created_honors_terminal_response() {
        let mut state = ResearchState::new(10);
        state.begin_create(spec("q")).unwrap();

        let task = created_task("t1").with_status(TaskStatus::Failed);
        state.bind_created(task);

        assert_eq!(state.phase(), ResearchPhase::Failed);
        assert!(state.current().unwrap().end_time.is_some());
        assert_eq!(state.history().len(), 1);
        assert!(state.can_create());
    }
}
