use crate::error::{ScheduleError, ScheduleResult};
use crate::task::Task;
use std::collections::HashSet;

pub fn validate_task(task: &Task) -> ScheduleResult<()> {
    if task.planned_duration < 1 {
        return Err(ScheduleError::InvalidTask(format!(
            "task {} has planned_duration {} (must be at least 1)",
            task.id, task.planned_duration
        )));
    }
    if task.buffer_time < 0 {
        return Err(ScheduleError::InvalidTask(format!(
            "task {} has negative buffer_time {}",
            task.id, task.buffer_time
        )));
    }
    if task.on_hold < 0 {
        return Err(ScheduleError::InvalidTask(format!(
            "task {} has negative on_hold {}",
            task.id, task.on_hold
        )));
    }
    if task.is_first && !task.predecessors.is_empty() {
        return Err(ScheduleError::InvalidTask(format!(
            "task {} is marked first but has {} predecessor(s)",
            task.id,
            task.predecessors.len()
        )));
    }
    if task.is_first && task.date_start.is_none() {
        return Err(ScheduleError::InvalidTask(format!(
            "task {} is marked first but has no start date",
            task.id
        )));
    }
    if task.is_milestone && task.milestone_deadline.is_some() && task.scheduling_mode.is_none() {
        return Err(ScheduleError::InvalidTask(format!(
            "milestone task {} has a deadline but no scheduling mode",
            task.id
        )));
    }

    let mut seen = HashSet::with_capacity(task.predecessors.len());
    for pred in task.predecessor_ids() {
        if pred == task.id {
            return Err(ScheduleError::dependency(pred, task.id, "task cannot depend on itself"));
        }
        if !seen.insert(pred) {
            return Err(ScheduleError::dependency(pred, task.id, "duplicate dependency"));
        }
    }
    Ok(())
}

/// Per-task checks plus unique ids and resolvable predecessors.
pub fn validate_task_collection(tasks: &[Task]) -> ScheduleResult<()> {
    let mut seen_ids = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(ScheduleError::InvalidTask(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        validate_task(task)?;
    }
    for task in tasks {
        for pred in task.predecessor_ids() {
            if !seen_ids.contains(&pred) {
                return Err(ScheduleError::dependency(pred, task.id, "unknown predecessor"));
            }
        }
    }
    Ok(())
}
