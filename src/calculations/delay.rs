use crate::calendar::WorkCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId, TaskStatus};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Delay, accumulated delay, holiday days and status flags. Runs after the
/// forward and backward passes.
pub struct DelayPass<'a> {
    calendar: &'a WorkCalendar,
}

impl<'a> DelayPass<'a> {
    pub fn new(calendar: &'a WorkCalendar) -> Self {
        Self { calendar }
    }

    pub fn execute(
        &self,
        tasks: &mut BTreeMap<TaskId, Task>,
        order: &[TaskId],
    ) -> ScheduleResult<()> {
        // Per-task fields only read the task's own dates.
        tasks.par_iter_mut().for_each(|(_, task)| {
            task.task_delay = self.task_delay(task);
            task.holiday_days = self.holiday_days(task);
            task.status = Self::status(task);
        });

        for &task_id in order {
            let task = tasks.get(&task_id).ok_or(ScheduleError::UnknownTask(task_id))?;
            let accumulated = if task.is_root() {
                task.task_delay
            } else {
                let preds = task
                    .predecessor_ids()
                    .map(|id| tasks.get(&id).ok_or(ScheduleError::UnknownTask(id)))
                    .collect::<ScheduleResult<Vec<&Task>>>()?;
                Self::accumulate(task.task_delay, &preds)
            };
            if let Some(task) = tasks.get_mut(&task_id) {
                task.accumulated_delay = accumulated;
            }
        }
        Ok(())
    }

    /// Signed business days between planned end and completion; zero until
    /// the task is completed.
    pub fn task_delay(&self, task: &Task) -> i64 {
        match (task.completion_date, task.date_end) {
            (Some(completed), Some(planned)) => {
                self.calendar.business_days_between(planned, completed)
            }
            _ => 0,
        }
    }

    /// Held at zero while any predecessor is still open.
    pub fn accumulate(task_delay: i64, preds: &[&Task]) -> i64 {
        if preds.iter().any(|p| p.completion_date.is_none()) {
            return 0;
        }
        let upstream = preds.iter().map(|p| p.accumulated_delay).max().unwrap_or(0);
        task_delay + upstream
    }

    /// Working-weekday holidays inside the open task's planned window, capped
    /// at its latest end.
    pub fn holiday_days(&self, task: &Task) -> i64 {
        if task.completion_date.is_some() {
            return 0;
        }
        let Some(start) = task.date_start else {
            return 0;
        };
        let end = match (task.date_end, task.latest_end) {
            (Some(end), Some(latest)) => end.min(latest),
            (Some(end), None) => end,
            (None, Some(latest)) => latest,
            (None, None) => return 0,
        };
        self.calendar.count_business_days_in_holidays(start, end)
    }

    pub fn status(task: &Task) -> TaskStatus {
        let effective_finish = match (task.completion_date, task.date_end) {
            (Some(completed), Some(planned)) if completed > planned => Some(completed),
            (_, planned) => planned,
        };
        TaskStatus {
            is_completed: task.completion_date.is_some(),
            is_delayed: task.task_delay > 0,
            is_ahead_of_schedule: matches!(
                (task.completion_date, task.date_end),
                (Some(completed), Some(planned)) if completed < planned
            ),
            is_on_hold: task.on_hold > 0,
            is_overdue: matches!(
                (task.completion_date, task.latest_end),
                (Some(completed), Some(latest)) if completed > latest
            ),
            effective_finish,
        }
    }
}
