use crate::calendar::WorkCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

/// Earliest window (`date_start`/`date_end`) from predecessors toward
/// successors.
pub struct ForwardPass<'a> {
    calendar: &'a WorkCalendar,
}

impl<'a> ForwardPass<'a> {
    pub fn new(calendar: &'a WorkCalendar) -> Self {
        Self { calendar }
    }

    /// `order` must list predecessors before successors.
    pub fn execute(
        &self,
        tasks: &mut BTreeMap<TaskId, Task>,
        order: &[TaskId],
    ) -> ScheduleResult<()> {
        for &task_id in order {
            let task = tasks.get(&task_id).ok_or(ScheduleError::UnknownTask(task_id))?;

            let date_start = if task.is_root() {
                if let Some(anchor) = task.date_start {
                    if !self.calendar.is_business_day(anchor) {
                        return Err(ScheduleError::CalendarViolation {
                            task_id,
                            field: "date_start",
                            date: anchor,
                        });
                    }
                }
                task.date_start
            } else {
                let preds = task
                    .predecessor_ids()
                    .map(|id| tasks.get(&id).ok_or(ScheduleError::UnknownTask(id)))
                    .collect::<ScheduleResult<Vec<&Task>>>()?;
                self.start_from_predecessors(&preds)?
            };
            let date_end = date_start
                .map(|start| self.end_from_start(task, start))
                .transpose()?;
            trace!(task_id, ?date_start, ?date_end, "forward pass");

            if let Some(task) = tasks.get_mut(&task_id) {
                task.date_start = date_start;
                task.date_end = date_end;
            }
        }
        Ok(())
    }

    /// Earliest start allowed by `preds`, listed in dependency order.
    ///
    /// With every predecessor completed the start follows the latest
    /// completion. When only the most recently added predecessor is still
    /// open, the start follows the latest completion among the earlier ones,
    /// so the successor is not held back by a missing completion entry.
    /// Otherwise the latest known finish (completion or planned end) wins.
    pub fn start_from_predecessors(&self, preds: &[&Task]) -> ScheduleResult<Option<NaiveDate>> {
        let completed: Vec<NaiveDate> = preds.iter().filter_map(|p| p.completion_date).collect();

        let basis = if !preds.is_empty() && completed.len() == preds.len() {
            completed.into_iter().max()
        } else if !completed.is_empty() && Self::only_last_open(preds) {
            // Every date in `completed` belongs to an earlier predecessor.
            completed.into_iter().max()
        } else {
            preds.iter().filter_map(|p| p.finish_date()).max()
        };
        basis
            .map(|date| self.calendar.next_business_day(date))
            .transpose()
    }

    /// Inclusive end: `effective_duration - 1` business days after `start`.
    pub fn end_from_start(&self, task: &Task, start: NaiveDate) -> ScheduleResult<NaiveDate> {
        self.calendar
            .add_business_days(start, task.effective_duration() - 1)
    }

    fn only_last_open(preds: &[&Task]) -> bool {
        match preds.split_last() {
            Some((last, earlier)) if !earlier.is_empty() => {
                last.completion_date.is_none() && earlier.iter().all(|p| p.completion_date.is_some())
            }
            _ => false,
        }
    }
}
