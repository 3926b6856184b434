use super::{PersistenceError, PersistenceResult, ScheduleSnapshot};
use crate::calendar::WorkCalendarConfig;
use crate::metadata::ScheduleMetadata;
use crate::task::{Dependency, SchedulingMode, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

const METADATA_ROW: &str = "__metadata__";

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &ScheduleSnapshot,
    path: P,
) -> PersistenceResult<()> {
    super::validate_tasks(&snapshot.tasks)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleSnapshot> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    super::validate_tasks(&snapshot.tasks)?;
    Ok(snapshot)
}

/// One CSV row: a task, or the single metadata row carrying project metadata
/// and calendar as JSON.
#[derive(Default, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: i32,
    name: String,
    planned_duration: i64,
    buffer_time: i64,
    on_hold: i64,
    is_milestone: bool,
    scheduling_mode: String,
    milestone_deadline: String,
    is_first: bool,
    completion_date: String,
    predecessors: String,
    assignee: String,
    delay_due_to: String,
    date_start: String,
    date_end: String,
    latest_start: String,
    latest_end: String,
    task_delay: i64,
    accumulated_delay: i64,
    holiday_days: i64,
    #[serde(default)]
    metadata_json: String,
    #[serde(default)]
    calendar_json: String,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        TaskCsvRecord {
            id: task.id,
            name: task.name.clone(),
            planned_duration: task.planned_duration,
            buffer_time: task.buffer_time,
            on_hold: task.on_hold,
            is_milestone: task.is_milestone,
            scheduling_mode: task
                .scheduling_mode
                .map(|mode| mode.as_str().to_string())
                .unwrap_or_default(),
            milestone_deadline: format_date(task.milestone_deadline),
            is_first: task.is_first,
            completion_date: format_date(task.completion_date),
            predecessors: task
                .predecessor_ids()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
            assignee: task.assignee.clone().unwrap_or_default(),
            delay_due_to: task.delay_due_to.clone().unwrap_or_default(),
            date_start: format_date(task.date_start),
            date_end: format_date(task.date_end),
            latest_start: format_date(task.latest_start),
            latest_end: format_date(task.latest_end),
            task_delay: task.task_delay,
            accumulated_delay: task.accumulated_delay,
            holiday_days: task.holiday_days,
            metadata_json: String::new(),
            calendar_json: String::new(),
        }
    }
}

impl TaskCsvRecord {
    fn metadata_row(snapshot: &ScheduleSnapshot) -> PersistenceResult<Self> {
        let calendar_json = match &snapshot.calendar {
            Some(calendar) => serde_json::to_string(calendar)?,
            None => String::new(),
        };
        Ok(TaskCsvRecord {
            name: METADATA_ROW.to_string(),
            metadata_json: serde_json::to_string(&snapshot.metadata)?,
            calendar_json,
            ..TaskCsvRecord::default()
        })
    }

    fn is_metadata_row(&self) -> bool {
        !self.metadata_json.trim().is_empty()
    }

    fn into_task(self) -> PersistenceResult<Task> {
        let mut task = Task::new(self.id, self.name, self.planned_duration);
        task.buffer_time = self.buffer_time;
        task.on_hold = self.on_hold;
        task.is_milestone = self.is_milestone;
        task.scheduling_mode = parse_mode(&self.scheduling_mode)?;
        task.milestone_deadline = parse_date(&self.milestone_deadline)?;
        task.is_first = self.is_first;
        task.completion_date = parse_date(&self.completion_date)?;
        task.predecessors = split_ids(&self.predecessors)?
            .into_iter()
            .map(Dependency::finish_to_start)
            .collect();
        task.assignee = non_empty(self.assignee);
        task.delay_due_to = non_empty(self.delay_due_to);
        task.date_start = parse_date(&self.date_start)?;
        task.date_end = parse_date(&self.date_end)?;
        task.latest_start = parse_date(&self.latest_start)?;
        task.latest_end = parse_date(&self.latest_end)?;
        task.task_delay = self.task_delay;
        task.accumulated_delay = self.accumulated_delay;
        task.holiday_days = self.holiday_days;
        Ok(task)
    }
}

pub fn save_snapshot_to_csv<P: AsRef<Path>>(
    snapshot: &ScheduleSnapshot,
    path: P,
) -> PersistenceResult<()> {
    super::validate_tasks(&snapshot.tasks)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TaskCsvRecord::metadata_row(snapshot)?)?;
    for task in &snapshot.tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_snapshot_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleSnapshot> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut tasks = Vec::new();
    let mut metadata: Option<ScheduleMetadata> = None;
    let mut calendar: Option<WorkCalendarConfig> = None;
    for record in reader.deserialize::<TaskCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if metadata.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            metadata = Some(serde_json::from_str(&record.metadata_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid metadata json: {err}"))
            })?);
            if !record.calendar_json.trim().is_empty() {
                calendar = Some(serde_json::from_str(&record.calendar_json).map_err(|err| {
                    PersistenceError::InvalidData(format!("invalid calendar json: {err}"))
                })?);
            }
            continue;
        }
        tasks.push(record.into_task()?);
    }

    super::validate_tasks(&tasks)?;
    Ok(ScheduleSnapshot {
        metadata: metadata.unwrap_or_default(),
        calendar,
        tasks,
    })
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_mode(input: &str) -> PersistenceResult<Option<SchedulingMode>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .parse::<SchedulingMode>()
        .map(Some)
        .map_err(PersistenceError::InvalidData)
}

fn split_ids(input: &str) -> PersistenceResult<Vec<i32>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|part| {
            part.trim().parse::<i32>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid task id '{part}': {e}"))
            })
        })
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
