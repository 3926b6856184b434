use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TaskId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    FinishToStart,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::FinishToStart => "finish_to_start",
        }
    }
}

/// Which latest date of a milestone is fixed by the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    MustStartOn,
    MustFinishOn,
}

impl SchedulingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingMode::MustStartOn => "must_start_on",
            SchedulingMode::MustFinishOn => "must_finish_on",
        }
    }
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "must_start_on" | "start" | "0" => Ok(SchedulingMode::MustStartOn),
            "must_finish_on" | "finish" | "1" => Ok(SchedulingMode::MustFinishOn),
            other => Err(format!("unknown scheduling mode '{other}'")),
        }
    }
}

/// Predecessor edge stored on the successor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor: TaskId,
    #[serde(default)]
    pub relation: RelationType,
}

impl Dependency {
    pub fn finish_to_start(predecessor: TaskId) -> Self {
        Self {
            predecessor,
            relation: RelationType::FinishToStart,
        }
    }
}

/// Derived flags, refreshed on every recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskStatus {
    pub is_completed: bool,
    pub is_delayed: bool,
    pub is_ahead_of_schedule: bool,
    pub is_on_hold: bool,
    pub is_overdue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_finish: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub planned_duration: i64,
    #[serde(default)]
    pub buffer_time: i64,
    #[serde(default)]
    pub on_hold: i64,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_mode: Option<SchedulingMode>,
    /// Latest start (`MustStartOn`) or latest end (`MustFinishOn`) of a milestone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_deadline: Option<NaiveDate>,
    #[serde(default)]
    pub is_first: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub predecessors: Vec<Dependency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_due_to: Option<String>,

    // Computed. For a root task `date_start` is the externally supplied anchor.
    #[serde(default)]
    pub date_start: Option<NaiveDate>,
    #[serde(default)]
    pub date_end: Option<NaiveDate>,
    #[serde(default)]
    pub latest_start: Option<NaiveDate>,
    #[serde(default)]
    pub latest_end: Option<NaiveDate>,
    #[serde(default)]
    pub task_delay: i64,
    #[serde(default)]
    pub accumulated_delay: i64,
    #[serde(default)]
    pub holiday_days: i64,
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, planned_duration: i64) -> Self {
        Self {
            id,
            name: name.into(),
            planned_duration,
            buffer_time: 0,
            on_hold: 0,
            is_milestone: false,
            scheduling_mode: None,
            milestone_deadline: None,
            is_first: false,
            completion_date: None,
            predecessors: Vec::new(),
            assignee: None,
            delay_due_to: None,
            date_start: None,
            date_end: None,
            latest_start: None,
            latest_end: None,
            task_delay: 0,
            accumulated_delay: 0,
            holiday_days: 0,
            status: TaskStatus::default(),
        }
    }

    /// Root task anchored at `start`.
    pub fn first(id: TaskId, name: impl Into<String>, planned_duration: i64, start: NaiveDate) -> Self {
        let mut task = Self::new(id, name, planned_duration);
        task.is_first = true;
        task.date_start = Some(start);
        task
    }

    pub fn milestone(
        id: TaskId,
        name: impl Into<String>,
        planned_duration: i64,
        mode: SchedulingMode,
        deadline: NaiveDate,
    ) -> Self {
        let mut task = Self::new(id, name, planned_duration);
        task.is_milestone = true;
        task.scheduling_mode = Some(mode);
        task.milestone_deadline = Some(deadline);
        task
    }

    pub fn with_buffer(mut self, buffer_time: i64) -> Self {
        self.buffer_time = buffer_time;
        self
    }

    pub fn with_hold(mut self, on_hold: i64) -> Self {
        self.on_hold = on_hold;
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn depends_on<I>(mut self, predecessors: I) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        self.predecessors
            .extend(predecessors.into_iter().map(Dependency::finish_to_start));
        self
    }

    pub fn predecessor_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.predecessors.iter().map(|dep| dep.predecessor)
    }

    pub fn has_predecessor(&self, id: TaskId) -> bool {
        self.predecessors.iter().any(|dep| dep.predecessor == id)
    }

    /// A graph root: flagged first, or simply nothing to wait on.
    pub fn is_root(&self) -> bool {
        self.is_first || self.predecessors.is_empty()
    }

    /// `planned_duration + buffer_time + on_hold`.
    pub fn effective_duration(&self) -> i64 {
        self.planned_duration + self.buffer_time + self.on_hold
    }

    /// Completion date when set, planned end otherwise.
    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.completion_date.or(self.date_end)
    }

    pub(crate) fn clear_computed(&mut self) {
        if !self.is_root() {
            self.date_start = None;
        }
        self.date_end = None;
        self.latest_start = None;
        self.latest_end = None;
        self.task_delay = 0;
        self.accumulated_delay = 0;
        self.holiday_days = 0;
        self.status = TaskStatus::default();
    }

    pub(crate) fn computed_differs(&self, other: &Task) -> bool {
        self.date_start != other.date_start
            || self.date_end != other.date_end
            || self.latest_start != other.latest_start
            || self.latest_end != other.latest_end
            || self.task_delay != other.task_delay
            || self.accumulated_delay != other.accumulated_delay
            || self.holiday_days != other.holiday_days
            || self.status != other.status
    }
}

/// Field-level edit applied through `Schedule::on_task_edited`. `None` leaves
/// a field untouched; the nested options clear a value with `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hold: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_milestone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_mode: Option<Option<SchedulingMode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_deadline: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_anchor: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_due_to: Option<Option<String>>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self == &TaskEdit::default()
    }

    /// Names of the fields this edit touches.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.planned_duration.is_some() {
            fields.push("planned_duration");
        }
        if self.buffer_time.is_some() {
            fields.push("buffer_time");
        }
        if self.on_hold.is_some() {
            fields.push("on_hold");
        }
        if self.is_milestone.is_some() {
            fields.push("is_milestone");
        }
        if self.scheduling_mode.is_some() {
            fields.push("scheduling_mode");
        }
        if self.milestone_deadline.is_some() {
            fields.push("milestone_deadline");
        }
        if self.start_anchor.is_some() {
            fields.push("date_start");
        }
        if self.assignee.is_some() {
            fields.push("assignee");
        }
        if self.delay_due_to.is_some() {
            fields.push("delay_due_to");
        }
        fields
    }

    pub(crate) fn apply(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(duration) = self.planned_duration {
            task.planned_duration = duration;
        }
        if let Some(buffer) = self.buffer_time {
            task.buffer_time = buffer;
        }
        if let Some(hold) = self.on_hold {
            task.on_hold = hold;
        }
        if let Some(is_milestone) = self.is_milestone {
            task.is_milestone = is_milestone;
        }
        if let Some(mode) = self.scheduling_mode {
            task.scheduling_mode = mode;
        }
        if let Some(deadline) = self.milestone_deadline {
            task.milestone_deadline = deadline;
        }
        if let Some(start) = self.start_anchor {
            task.date_start = Some(start);
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = assignee.clone();
        }
        if let Some(reason) = &self.delay_due_to {
            task.delay_due_to = reason.clone();
        }
    }
}
