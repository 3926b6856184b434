use crate::calendar::WorkCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{SchedulingMode, Task, TaskId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::trace;

pub struct BackwardPass<'a> {
    calendar: &'a WorkCalendar,
}

impl<'a> BackwardPass<'a> {
    pub fn new(calendar: &'a WorkCalendar) -> Self {
        Self { calendar }
    }

    /// Fixes milestone latest windows from their deadlines, then walks
    /// `order`, which lists successors before predecessors, handing each
    /// latest start to the predecessors.
    ///
    /// A predecessor's window is written once, by the first successor in
    /// `order` that reaches it. With [`ScheduleDag::reverse_topological_order`]
    /// that is the successor with the smallest id among those ready together,
    /// so a task feeding two milestones takes its window from the lower id.
    ///
    /// [`ScheduleDag::reverse_topological_order`]: crate::graph::ScheduleDag::reverse_topological_order
    pub fn execute(
        &self,
        tasks: &mut BTreeMap<TaskId, Task>,
        order: &[TaskId],
    ) -> ScheduleResult<()> {
        for task in tasks.values_mut() {
            if let Some((latest_start, latest_end)) = self.milestone_window(task)? {
                task.latest_start = Some(latest_start);
                task.latest_end = Some(latest_end);
            }
        }

        for &task_id in order {
            let (latest_start, preds) = match tasks.get(&task_id) {
                Some(task) => match task.latest_start {
                    Some(latest_start) => (latest_start, task.predecessor_ids().collect::<Vec<_>>()),
                    None => continue,
                },
                None => return Err(ScheduleError::UnknownTask(task_id)),
            };
            for pred_id in preds {
                let pred = tasks
                    .get_mut(&pred_id)
                    .ok_or(ScheduleError::UnknownTask(pred_id))?;
                // First writer wins; milestones keep their own window.
                if pred.is_milestone || pred.latest_start.is_some() || pred.latest_end.is_some() {
                    continue;
                }
                let (start, end) = self.predecessor_window(pred, latest_start)?;
                trace!(task_id = pred_id, from = task_id, %start, %end, "backward pass");
                pred.latest_start = Some(start);
                pred.latest_end = Some(end);
            }
        }
        Ok(())
    }

    /// `(latest_start, latest_end)` of a milestone with a deadline.
    pub fn milestone_window(&self, task: &Task) -> ScheduleResult<Option<(NaiveDate, NaiveDate)>> {
        if !task.is_milestone {
            return Ok(None);
        }
        let (Some(mode), Some(deadline)) = (task.scheduling_mode, task.milestone_deadline) else {
            return Ok(None);
        };
        let span = task.planned_duration - 1;
        match mode {
            SchedulingMode::MustFinishOn => {
                self.require_business_day(task.id, "latest_end", deadline)?;
                let start = self.calendar.subtract_business_days(deadline, span)?;
                Ok(Some((start, deadline)))
            }
            SchedulingMode::MustStartOn => {
                self.require_business_day(task.id, "latest_start", deadline)?;
                let end = self.calendar.add_business_days(deadline, span)?;
                Ok(Some((deadline, end)))
            }
        }
    }

    /// Latest window of a non-milestone predecessor of a task that must start
    /// by `successor_latest_start`. Buffer time stays with the successor and
    /// hold time is netted out of the duration.
    pub fn predecessor_window(
        &self,
        pred: &Task,
        successor_latest_start: NaiveDate,
    ) -> ScheduleResult<(NaiveDate, NaiveDate)> {
        let latest_end = self.calendar.previous_business_day(successor_latest_start)?;
        let span = pred.planned_duration - pred.on_hold - 1;
        let latest_start = self.calendar.subtract_business_days(latest_end, span)?;
        Ok((latest_start, latest_end))
    }

    fn require_business_day(
        &self,
        task_id: TaskId,
        field: &'static str,
        date: NaiveDate,
    ) -> ScheduleResult<()> {
        if self.calendar.is_business_day(date) {
            Ok(())
        } else {
            Err(ScheduleError::CalendarViolation {
                task_id,
                field,
                date,
            })
        }
    }
}
