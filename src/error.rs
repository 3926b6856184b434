use crate::organization::ProjectId;
use crate::task::TaskId;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by scheduling requests. Any of them aborts the request
/// without writing computed fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid dependency {predecessor} -> {successor}: {reason}")]
    InvalidDependency {
        predecessor: TaskId,
        successor: TaskId,
        reason: String,
    },

    #[error("task {task_id} {field} {date} is not a business day in the active calendar")]
    CalendarViolation {
        task_id: TaskId,
        field: &'static str,
        date: NaiveDate,
    },

    /// The dependency ordering stalled before placing every task, which
    /// only happens when the graph state is corrupted.
    #[error("dependency ordering stalled with {unresolved} task(s) left unplaced")]
    NonConvergence { unresolved: usize },

    #[error("no business day exists beyond {0} in the active calendar")]
    DateOutOfRange(NaiveDate),

    #[error("task {0} not found")]
    UnknownTask(TaskId),

    #[error("project {0} not found")]
    UnknownProject(ProjectId),

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ScheduleError {
    pub(crate) fn dependency(
        predecessor: TaskId,
        successor: TaskId,
        reason: impl Into<String>,
    ) -> Self {
        ScheduleError::InvalidDependency {
            predecessor,
            successor,
            reason: reason.into(),
        }
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
