use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::error::ScheduleError;
use crate::metadata::ScheduleMetadata;
use crate::organization::{Organization, ProjectId};
use crate::schedule::Schedule;
use crate::task::Task;
use crate::task_validation;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    Schedule(ScheduleError),
    InvalidData(String),
    NotFound,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::Schedule(err) => write!(f, "schedule error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            PersistenceError::NotFound => write!(f, "no schedule stored"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<ScheduleError> for PersistenceError {
    fn from(value: ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A project with the calendar it was scheduled against, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub metadata: ScheduleMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<WorkCalendarConfig>,
    pub tasks: Vec<Task>,
}

impl ScheduleSnapshot {
    pub fn from_schedule(schedule: &Schedule, calendar: Option<&WorkCalendar>) -> PersistenceResult<Self> {
        let tasks: Vec<Task> = schedule.tasks().cloned().collect();
        validate_tasks(&tasks)?;
        Ok(Self {
            metadata: schedule.metadata().clone(),
            calendar: calendar.map(WorkCalendarConfig::from),
            tasks,
        })
    }

    /// Snapshot of one project of `org` together with its resolved calendar.
    pub fn capture(org: &Organization, project_id: ProjectId) -> PersistenceResult<Self> {
        let schedule = org.project(project_id)?;
        let calendar = org.calendar_for(project_id)?;
        Self::from_schedule(schedule, Some(&*calendar))
    }

    pub fn into_schedule(self) -> PersistenceResult<(Schedule, Option<WorkCalendar>)> {
        validate_tasks(&self.tasks)?;
        let calendar = self
            .calendar
            .map(|config| WorkCalendar::from_config(&config))
            .transpose()?;
        let schedule = Schedule::from_tasks(self.metadata, self.tasks)?;
        Ok((schedule, calendar))
    }

    /// Adds the snapshot to `org` as a new project and recomputes it. The
    /// stored calendar is registered under its recorded id unless that id
    /// already holds a different calendar, in which case it gets a fresh id.
    pub fn import_into(self, org: &mut Organization) -> PersistenceResult<ProjectId> {
        let (mut schedule, calendar) = self.into_schedule()?;
        if let Some(calendar) = calendar {
            let recorded = schedule.metadata().calendar_id;
            let same = org
                .calendar(recorded)
                .map(|existing| existing.to_config() == calendar.to_config());
            let calendar_id = match same {
                None => {
                    org.insert_calendar(recorded, calendar);
                    recorded
                }
                Some(true) => recorded,
                Some(false) => org.add_calendar(calendar),
            };
            let mut metadata = schedule.metadata().clone();
            metadata.calendar_id = calendar_id;
            schedule.set_metadata(metadata);
        }
        let project_id = org.insert_project(schedule);
        if let Err(err) = org.recompute(project_id) {
            org.remove_project(project_id)?;
            return Err(err.into());
        }
        Ok(project_id)
    }
}

pub trait ScheduleStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()>;
    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>>;
}

pub fn validate_tasks(tasks: &[Task]) -> PersistenceResult<()> {
    task_validation::validate_task_collection(tasks)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_snapshot_from_csv, load_snapshot_from_json, save_snapshot_to_csv, save_snapshot_to_json,
};
