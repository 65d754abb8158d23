//! Bounded history of past research tasks

use std::collections::VecDeque;

use super::model::Task;

/// Default number of past tasks kept in memory
pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Most-recent-first list of past tasks, bounded at a fixed capacity
#[derive(Debug, Clone)]
pub struct TaskHistory {
    entries: VecDeque<Task>,
    cap: usize,
}

impl Default for TaskHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl TaskHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(DEFAULT_HISTORY_CAP)),
            cap: cap.max(1),
        }
    }

    /// Record a task, updating in place when the id is already present.
    /// New entries land at the front; the oldest entry is evicted once
    /// the capacity is exceeded.
    pub fn record(&mut self, task: Task) {
        if let Some(existing) = self.entries.iter_mut().find(|entry| entry.id == task.id) {
            *existing = task;
            return;
        }
        self.entries.push_front(task);
        while self.entries.len() > self.cap {
            self.entries.pop_back();
        }
    }

    /// Replace the whole history with a server-provided list,
    /// assumed most-recent-first, truncated to capacity
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.entries = tasks.into_iter().take(self.cap).collect();
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.entries.iter().find(|entry| entry.id == task_id)
    }

    pub fn latest(&self) -> Option<&Task> {
        self.entries.front()
    }

    /// Iterate most-recent-first
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Task> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
