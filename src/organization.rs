use crate::calendar::WorkCalendar;
use crate::config::{MissingCalendarPolicy, SchedulerConfig};
use crate::error::{ScheduleError, ScheduleResult};
use crate::metadata::ScheduleMetadata;
use crate::notify::Notifier;
use crate::schedule::{ChangeSet, Schedule};
use crate::task::{Task, TaskEdit, TaskId};
use chrono::NaiveDate;
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::info;

pub type ProjectId = u32;
pub type CalendarId = u32;

/// Owns the calendars and the projects they govern. Every request resolves
/// the project's calendar here and hands it to the schedule explicitly.
#[derive(Debug, Clone, Default)]
pub struct Organization {
    name: String,
    config: SchedulerConfig,
    calendars: BTreeMap<CalendarId, WorkCalendar>,
    projects: BTreeMap<ProjectId, Schedule>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn add_calendar(&mut self, calendar: WorkCalendar) -> CalendarId {
        let id = self.calendars.keys().next_back().map_or(1, |id| id + 1);
        self.calendars.insert(id, calendar);
        id
    }

    /// Registers a calendar under a fixed id without touching any project.
    pub fn insert_calendar(&mut self, calendar_id: CalendarId, calendar: WorkCalendar) {
        self.calendars.insert(calendar_id, calendar);
    }

    pub fn calendar(&self, calendar_id: CalendarId) -> Option<&WorkCalendar> {
        self.calendars.get(&calendar_id)
    }

    /// The calendar a project runs on, after the missing-calendar policy.
    pub fn calendar_for(&self, project_id: ProjectId) -> ScheduleResult<Cow<'_, WorkCalendar>> {
        let schedule = self.project(project_id)?;
        resolve_calendar(
            &self.calendars,
            self.config.missing_calendar,
            schedule.metadata().calendar_id,
        )
    }

    pub fn create_project(&mut self, metadata: ScheduleMetadata) -> ProjectId {
        let mut metadata = metadata;
        if metadata.organization.is_empty() {
            metadata.organization = self.name.clone();
        }
        self.insert_project(Schedule::with_metadata(metadata))
    }

    pub fn insert_project(&mut self, schedule: Schedule) -> ProjectId {
        let id = self.projects.keys().next_back().map_or(1, |id| id + 1);
        self.projects.insert(id, schedule);
        id
    }

    pub fn remove_project(&mut self, project_id: ProjectId) -> ScheduleResult<Schedule> {
        self.projects
            .remove(&project_id)
            .ok_or(ScheduleError::UnknownProject(project_id))
    }

    pub fn project(&self, project_id: ProjectId) -> ScheduleResult<&Schedule> {
        self.projects
            .get(&project_id)
            .ok_or(ScheduleError::UnknownProject(project_id))
    }

    pub fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.keys().copied().collect()
    }

    /// Projects governed by `calendar_id`.
    pub fn projects_on(&self, calendar_id: CalendarId) -> Vec<ProjectId> {
        self.projects
            .iter()
            .filter(|(_, schedule)| schedule.metadata().calendar_id == calendar_id)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn add_task(&mut self, project_id: ProjectId, task: Task) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.add_task(calendar, task)
        })
    }

    pub fn remove_task(&mut self, project_id: ProjectId, task_id: TaskId) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.remove_task(calendar, task_id)
        })
    }

    pub fn add_dependency(
        &mut self,
        project_id: ProjectId,
        predecessor: TaskId,
        successor: TaskId,
    ) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.add_dependency(calendar, predecessor, successor)
        })
    }

    pub fn remove_dependency(
        &mut self,
        project_id: ProjectId,
        predecessor: TaskId,
        successor: TaskId,
    ) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.remove_dependency(calendar, predecessor, successor)
        })
    }

    pub fn recompute(&mut self, project_id: ProjectId) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| schedule.recompute(calendar))
    }

    pub fn on_completion_date_set(
        &mut self,
        project_id: ProjectId,
        task_id: TaskId,
        date: NaiveDate,
        notifier: &dyn Notifier,
    ) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.on_completion_date_set(calendar, task_id, date, notifier)
        })
    }

    pub fn on_task_edited(
        &mut self,
        project_id: ProjectId,
        task_id: TaskId,
        edit: &TaskEdit,
    ) -> ScheduleResult<ChangeSet> {
        self.with_project(project_id, |calendar, schedule| {
            schedule.on_task_edited(calendar, task_id, edit)
        })
    }

    /// Replaces a calendar and recomputes every project it governs. Either
    /// every project accepts the new calendar or nothing changes.
    pub fn on_calendar_changed(
        &mut self,
        calendar_id: CalendarId,
        calendar: WorkCalendar,
    ) -> ScheduleResult<BTreeMap<ProjectId, ChangeSet>> {
        let mut updated = BTreeMap::new();
        let mut results = BTreeMap::new();
        for project_id in self.projects_on(calendar_id) {
            let mut schedule = self.project(project_id)?.clone();
            let changes = schedule.on_calendar_changed(&calendar)?;
            updated.insert(project_id, schedule);
            results.insert(project_id, changes);
        }

        self.calendars.insert(calendar_id, calendar);
        self.projects.extend(updated);
        info!(calendar_id, projects = results.len(), "calendar updated");
        Ok(results)
    }

    /// Copies a project's tasks, dependencies and completion dates into a new
    /// project on the same calendar.
    pub fn duplicate_project(
        &mut self,
        project_id: ProjectId,
        project_name: impl Into<String>,
    ) -> ScheduleResult<ProjectId> {
        let source = self.project(project_id)?;
        let mut metadata = source.metadata().clone();
        metadata.project_name = project_name.into();
        let tasks = source.tasks().cloned().collect();

        let mut copy = Schedule::from_tasks(metadata, tasks)?;
        let calendar = resolve_calendar(
            &self.calendars,
            self.config.missing_calendar,
            copy.metadata().calendar_id,
        )?;
        copy.recompute(&calendar)?;

        let new_id = self.insert_project(copy);
        info!(from = project_id, to = new_id, "project duplicated");
        Ok(new_id)
    }

    fn with_project<T, F>(&mut self, project_id: ProjectId, f: F) -> ScheduleResult<T>
    where
        F: FnOnce(&WorkCalendar, &mut Schedule) -> ScheduleResult<T>,
    {
        let schedule = self
            .projects
            .get_mut(&project_id)
            .ok_or(ScheduleError::UnknownProject(project_id))?;
        let calendar = resolve_calendar(
            &self.calendars,
            self.config.missing_calendar,
            schedule.metadata().calendar_id,
        )?;
        f(&calendar, schedule)
    }
}

fn resolve_calendar(
    calendars: &BTreeMap<CalendarId, WorkCalendar>,
    policy: MissingCalendarPolicy,
    calendar_id: CalendarId,
) -> ScheduleResult<Cow<'_, WorkCalendar>> {
    match (calendars.get(&calendar_id), policy) {
        (Some(calendar), _) => Ok(Cow::Borrowed(calendar)),
        (None, MissingCalendarPolicy::EveryDayWorking) => Ok(Cow::Owned(WorkCalendar::every_day())),
        (None, MissingCalendarPolicy::Reject) => Err(ScheduleError::Configuration(format!(
            "calendar {calendar_id} is not configured"
        ))),
    }
}
