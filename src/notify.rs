use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// A successor whose predecessors all carry a completion date now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblockedTask {
    pub task_id: TaskId,
    pub task_name: String,
    pub assignee: Option<String>,
    /// Task whose completion released this one.
    pub unblocked_by: TaskId,
}

/// Delivery of unblock events (mail, chat, queue). Called after the change
/// that produced the events has been committed.
pub trait Notifier: Send + Sync {
    fn task_unblocked(&self, event: &UnblockedTask);
}

/// Writes each event to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn task_unblocked(&self, event: &UnblockedTask) {
        info!(
            task_id = event.task_id,
            task = %event.task_name,
            assignee = event.assignee.as_deref().unwrap_or("-"),
            unblocked_by = event.unblocked_by,
            "task ready to start"
        );
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<UnblockedTask>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UnblockedTask> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn task_unblocked(&self, event: &UnblockedTask) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
