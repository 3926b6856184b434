use crate::calculations::{BackwardPass, DelayPass, ForwardPass};
use crate::calendar::WorkCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::graph::ScheduleDag;
use crate::metadata::ScheduleMetadata;
use crate::notify::{Notifier, UnblockedTask};
use crate::task::{Dependency, RelationType, SchedulingMode, Task, TaskEdit, TaskId};
use crate::task_validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorField {
    DateStart,
    MilestoneDeadline,
}

/// An anchor moved to the next business day after a calendar edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolledAnchor {
    pub task_id: TaskId,
    pub field: AnchorField,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Outcome of one committed request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Tasks whose computed fields differ from before the request, ascending.
    pub changed: Vec<TaskId>,
    /// Successors released by a completion date, ascending.
    #[serde(default)]
    pub unblocked: Vec<TaskId>,
    #[serde(default)]
    pub rolled_anchors: Vec<RolledAnchor>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.unblocked.is_empty() && self.rolled_anchors.is_empty()
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![format!("changed={}", self.changed.len())];
        if !self.changed.is_empty() {
            let ids = self
                .changed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("ids={ids}"));
        }
        if !self.unblocked.is_empty() {
            parts.push(format!("unblocked={}", self.unblocked.len()));
        }
        for roll in &self.rolled_anchors {
            parts.push(format!("rolled {}: {} -> {}", roll.task_id, roll.from, roll.to));
        }
        parts.join(", ")
    }
}

/// One project's task graph. Computed task fields are only ever written by a
/// full recompute that runs on a copy and is committed when it succeeds.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    metadata: ScheduleMetadata,
    tasks: BTreeMap<TaskId, Task>,
    dag: ScheduleDag,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(metadata: ScheduleMetadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    /// Rebuilds a schedule from stored tasks. Computed fields are kept as
    /// stored until the next recompute.
    pub fn from_tasks(metadata: ScheduleMetadata, tasks: Vec<Task>) -> ScheduleResult<Self> {
        task_validation::validate_task_collection(&tasks)?;
        let tasks: BTreeMap<TaskId, Task> = tasks.into_iter().map(|task| (task.id, task)).collect();
        let dag = ScheduleDag::build(&tasks)?;
        Ok(Self {
            metadata,
            tasks,
            dag,
        })
    }

    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: ScheduleMetadata) {
        self.metadata = metadata;
    }

    pub fn project_name(&self) -> &str {
        &self.metadata.project_name
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in ascending id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn task(&self, task_id: TaskId) -> ScheduleResult<&Task> {
        self.tasks
            .get(&task_id)
            .ok_or(ScheduleError::UnknownTask(task_id))
    }

    pub fn dag(&self) -> &ScheduleDag {
        &self.dag
    }

    pub fn next_task_id(&self) -> TaskId {
        self.tasks.keys().next_back().map_or(1, |id| id + 1)
    }

    pub fn add_task(&mut self, calendar: &WorkCalendar, task: Task) -> ScheduleResult<ChangeSet> {
        task_validation::validate_task(&task)?;
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::InvalidTask(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        if let Some(date) = task.completion_date {
            require_business_day(calendar, task.id, "completion_date", date)?;
        }

        let task_id = task.id;
        let mut task = task;
        task.clear_computed();
        let changes = self.transact(calendar, move |tasks, dag, _| {
            dag.add_task(task_id);
            for dep in &task.predecessors {
                if !tasks.contains_key(&dep.predecessor) {
                    return Err(ScheduleError::dependency(
                        dep.predecessor,
                        task_id,
                        "unknown predecessor",
                    ));
                }
                dag.add_dependency(dep.predecessor, task_id, dep.relation)?;
            }
            tasks.insert(task_id, task);
            Ok(())
        })?;
        info!(task_id, changed = changes.changed.len(), "task added");
        Ok(changes)
    }

    /// Removes the task and every dependency touching it.
    pub fn remove_task(&mut self, calendar: &WorkCalendar, task_id: TaskId) -> ScheduleResult<ChangeSet> {
        self.task(task_id)?;
        let changes = self.transact(calendar, |tasks, dag, _| {
            tasks.remove(&task_id);
            dag.remove_task(task_id);
            for task in tasks.values_mut() {
                task.predecessors.retain(|dep| dep.predecessor != task_id);
            }
            Ok(())
        })?;
        info!(task_id, changed = changes.changed.len(), "task removed");
        Ok(changes)
    }

    /// Adds a finish-to-start edge. Cycles are rejected before anything is
    /// recomputed.
    pub fn add_dependency(
        &mut self,
        calendar: &WorkCalendar,
        predecessor: TaskId,
        successor: TaskId,
    ) -> ScheduleResult<ChangeSet> {
        if self.tasks.get(&successor).is_some_and(|task| task.is_first) {
            return Err(ScheduleError::dependency(
                predecessor,
                successor,
                "first task cannot have predecessors",
            ));
        }
        let changes = self.transact(calendar, |tasks, dag, _| {
            dag.add_dependency(predecessor, successor, RelationType::FinishToStart)?;
            if let Some(task) = tasks.get_mut(&successor) {
                if !task.has_predecessor(predecessor) {
                    task.predecessors.push(Dependency::finish_to_start(predecessor));
                }
            }
            Ok(())
        })?;
        info!(predecessor, successor, changed = changes.changed.len(), "dependency added");
        Ok(changes)
    }

    pub fn remove_dependency(
        &mut self,
        calendar: &WorkCalendar,
        predecessor: TaskId,
        successor: TaskId,
    ) -> ScheduleResult<ChangeSet> {
        let changes = self.transact(calendar, |tasks, dag, _| {
            if !dag.remove_dependency(predecessor, successor) {
                return Err(ScheduleError::dependency(
                    predecessor,
                    successor,
                    "no such dependency",
                ));
            }
            if let Some(task) = tasks.get_mut(&successor) {
                task.predecessors.retain(|dep| dep.predecessor != predecessor);
            }
            Ok(())
        })?;
        info!(predecessor, successor, changed = changes.changed.len(), "dependency removed");
        Ok(changes)
    }

    /// Re-derives every computed field from the stored inputs.
    pub fn recompute(&mut self, calendar: &WorkCalendar) -> ScheduleResult<ChangeSet> {
        self.transact(calendar, |_, _, _| Ok(()))
    }

    /// Records a completion date, recomputes, and notifies the assignees of
    /// successors that have every predecessor completed as a result.
    pub fn on_completion_date_set(
        &mut self,
        calendar: &WorkCalendar,
        task_id: TaskId,
        date: NaiveDate,
        notifier: &dyn Notifier,
    ) -> ScheduleResult<ChangeSet> {
        let was_open = self.task(task_id)?.completion_date.is_none();
        if let Err(err) = require_business_day(calendar, task_id, "completion_date", date) {
            warn!(task_id, %date, "completion date rejected");
            return Err(err);
        }

        let mut changes = self.transact(calendar, |tasks, _, _| {
            if let Some(task) = tasks.get_mut(&task_id) {
                task.completion_date = Some(date);
            }
            Ok(())
        })?;

        if was_open {
            let events = self.newly_unblocked(task_id);
            for event in &events {
                notifier.task_unblocked(event);
            }
            changes.unblocked = events.iter().map(|event| event.task_id).collect();
        }
        info!(
            task_id,
            %date,
            changed = changes.changed.len(),
            unblocked = changes.unblocked.len(),
            "completion date set"
        );
        Ok(changes)
    }

    /// Full recompute against an edited calendar. Root start anchors and
    /// `MustStartOn` deadlines that stopped being business days are rolled
    /// forward first.
    pub fn on_calendar_changed(&mut self, calendar: &WorkCalendar) -> ScheduleResult<ChangeSet> {
        let changes = self.transact(calendar, |tasks, _, changes| {
            for task in tasks.values_mut() {
                roll_anchors(calendar, task, &mut changes.rolled_anchors)?;
            }
            Ok(())
        })?;
        for roll in &changes.rolled_anchors {
            warn!(
                task_id = roll.task_id,
                field = ?roll.field,
                from = %roll.from,
                to = %roll.to,
                "anchor moved off a non-business day"
            );
        }
        info!(changed = changes.changed.len(), "calendar change applied");
        Ok(changes)
    }

    pub fn on_task_edited(
        &mut self,
        calendar: &WorkCalendar,
        task_id: TaskId,
        edit: &TaskEdit,
    ) -> ScheduleResult<ChangeSet> {
        let current = self.task(task_id)?;
        if edit.start_anchor.is_some() && !current.is_root() {
            return Err(ScheduleError::InvalidTask(format!(
                "task {task_id} takes its start from its predecessors"
            )));
        }
        let mut edited = current.clone();
        edit.apply(&mut edited);
        task_validation::validate_task(&edited)?;

        let changes = self.transact(calendar, move |tasks, _, _| {
            tasks.insert(task_id, edited);
            Ok(())
        })?;
        info!(
            task_id,
            fields = ?edit.changed_fields(),
            changed = changes.changed.len(),
            "task edited"
        );
        Ok(changes)
    }

    fn newly_unblocked(&self, completed: TaskId) -> Vec<UnblockedTask> {
        self.dag
            .successors(completed)
            .into_iter()
            .filter_map(|id| self.tasks.get(&id))
            .filter(|succ| succ.completion_date.is_none())
            .filter(|succ| {
                succ.predecessor_ids().all(|pred| {
                    self.tasks
                        .get(&pred)
                        .is_some_and(|task| task.completion_date.is_some())
                })
            })
            .map(|succ| UnblockedTask {
                task_id: succ.id,
                task_name: succ.name.clone(),
                assignee: succ.assignee.clone(),
                unblocked_by: completed,
            })
            .collect()
    }

    /// Applies `mutate` to copies of the task table and graph, recomputes the
    /// copies, and swaps them in only when everything succeeded.
    fn transact<F>(&mut self, calendar: &WorkCalendar, mutate: F) -> ScheduleResult<ChangeSet>
    where
        F: FnOnce(
            &mut BTreeMap<TaskId, Task>,
            &mut ScheduleDag,
            &mut ChangeSet,
        ) -> ScheduleResult<()>,
    {
        let mut tasks = self.tasks.clone();
        let mut dag = self.dag.clone();
        let mut changes = ChangeSet::default();
        mutate(&mut tasks, &mut dag, &mut changes)?;

        recompute_all(calendar, &mut tasks, &dag)?;
        changes.changed = changed_ids(&self.tasks, &tasks);
        debug!(changed = changes.changed.len(), "recompute finished");

        self.tasks = tasks;
        self.dag = dag;
        Ok(changes)
    }
}

/// Clears and re-derives every computed field: forward in topological
/// order, backward in reverse order, then delays. Each step only reads
/// fields written earlier in the same walk, so one walk is enough.
fn recompute_all(
    calendar: &WorkCalendar,
    tasks: &mut BTreeMap<TaskId, Task>,
    dag: &ScheduleDag,
) -> ScheduleResult<()> {
    let order = dag.topological_order()?;
    let reverse = dag.reverse_topological_order()?;

    for task in tasks.values_mut() {
        task.clear_computed();
    }
    ForwardPass::new(calendar).execute(tasks, &order)?;
    BackwardPass::new(calendar).execute(tasks, &reverse)?;
    DelayPass::new(calendar).execute(tasks, &order)?;
    Ok(())
}

fn changed_ids(before: &BTreeMap<TaskId, Task>, after: &BTreeMap<TaskId, Task>) -> Vec<TaskId> {
    after
        .values()
        .filter(|task| {
            before
                .get(&task.id)
                .is_none_or(|old| old.computed_differs(task))
        })
        .map(|task| task.id)
        .collect()
}

fn roll_anchors(
    calendar: &WorkCalendar,
    task: &mut Task,
    rolled: &mut Vec<RolledAnchor>,
) -> ScheduleResult<()> {
    if task.is_root() {
        if let Some(start) = task.date_start.filter(|d| !calendar.is_business_day(*d)) {
            let to = calendar.roll_forward(start)?;
            task.date_start = Some(to);
            rolled.push(RolledAnchor {
                task_id: task.id,
                field: AnchorField::DateStart,
                from: start,
                to,
            });
        }
    }
    if task.is_milestone && task.scheduling_mode == Some(SchedulingMode::MustStartOn) {
        if let Some(deadline) = task
            .milestone_deadline
            .filter(|d| !calendar.is_business_day(*d))
        {
            let to = calendar.roll_forward(deadline)?;
            task.milestone_deadline = Some(to);
            rolled.push(RolledAnchor {
                task_id: task.id,
                field: AnchorField::MilestoneDeadline,
                from: deadline,
                to,
            });
        }
    }
    Ok(())
}

fn require_business_day(
    calendar: &WorkCalendar,
    task_id: TaskId,
    field: &'static str,
    date: NaiveDate,
) -> ScheduleResult<()> {
    if calendar.is_business_day(date) {
        Ok(())
    } else {
        Err(ScheduleError::CalendarViolation {
            task_id,
            field,
            date,
        })
    }
}
