pub mod calculations;
pub mod calendar;
pub mod config;
pub mod error;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod metadata;
pub mod notify;
pub mod organization;
pub mod persistence;
pub mod report;
pub mod schedule;
pub mod task;
pub(crate) mod task_validation;

pub use calendar::{HolidayInterval, WorkCalendar, WorkCalendarConfig};
pub use config::{MissingCalendarPolicy, SchedulerConfig};
pub use error::{ScheduleError, ScheduleResult};
pub use graph::ScheduleDag;
pub use metadata::ScheduleMetadata;
pub use notify::{LogNotifier, Notifier, RecordingNotifier, UnblockedTask};
pub use organization::{CalendarId, Organization, ProjectId};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteScheduleStore;
pub use persistence::{
    PersistenceError, PersistenceResult, ScheduleSnapshot, ScheduleStore, load_snapshot_from_csv,
    load_snapshot_from_json, save_snapshot_to_csv, save_snapshot_to_json, validate_tasks,
};
pub use report::{delayed_frame, render_text_table, schedule_frame};
pub use schedule::{AnchorField, ChangeSet, RolledAnchor, Schedule};
pub use task::{
    Dependency, RelationType, SchedulingMode, Task, TaskEdit, TaskId, TaskStatus,
};
