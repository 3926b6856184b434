use chrono::{Duration, NaiveDate};
use project_scheduler::{
    HolidayInterval, RecordingNotifier, Schedule, ScheduleError, SchedulingMode, Task, TaskEdit,
    WorkCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// A(2) -> B(3) -> C(1), A anchored on Monday 2024-01-01.
fn chain() -> (Schedule, WorkCalendar) {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 2, d(2024, 1, 1)))
        .expect("add A");
    schedule
        .add_task(&cal, Task::new(2, "B", 3).depends_on([1]))
        .expect("add B");
    schedule
        .add_task(&cal, Task::new(3, "C", 1).depends_on([2]))
        .expect("add C");
    (schedule, cal)
}

#[test]
fn first_task_end_is_inclusive() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "Kickoff", 3, d(2024, 1, 1)))
        .unwrap();
    let task = schedule.task(1).unwrap();
    assert_eq!(task.date_start, Some(d(2024, 1, 1)));
    assert_eq!(task.date_end, Some(d(2024, 1, 3)));
}

#[test]
fn chain_starts_the_business_day_after_each_predecessor() {
    let (schedule, _) = chain();
    let a = schedule.task(1).unwrap();
    let b = schedule.task(2).unwrap();
    let c = schedule.task(3).unwrap();
    assert_eq!((a.date_start, a.date_end), (Some(d(2024, 1, 1)), Some(d(2024, 1, 2))));
    assert_eq!((b.date_start, b.date_end), (Some(d(2024, 1, 3)), Some(d(2024, 1, 5))));
    // B ends on a Friday, so C starts on Monday.
    assert_eq!((c.date_start, c.date_end), (Some(d(2024, 1, 8)), Some(d(2024, 1, 8))));
}

#[test]
fn buffer_and_hold_extend_the_window() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 2, d(2024, 1, 1)).with_buffer(1).with_hold(2))
        .unwrap();
    let a = schedule.task(1).unwrap();
    assert_eq!(a.date_end, Some(d(2024, 1, 5)));
    assert!(a.status.is_on_hold);
}

#[test]
fn holiday_on_end_date_pushes_end_not_start() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2024, 1, 3));
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 3, d(2024, 1, 1)))
        .unwrap();
    let a = schedule.task(1).unwrap();
    assert_eq!(a.date_start, Some(d(2024, 1, 1)));
    assert_eq!(a.date_end, Some(d(2024, 1, 4)));
    assert_eq!(a.holiday_days, 1);
}

#[test]
fn cycle_is_rejected_and_schedule_kept() {
    let (mut schedule, cal) = chain();
    let before: Vec<_> = schedule.tasks().cloned().collect();
    let err = schedule.add_dependency(&cal, 3, 2).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidDependency { .. }));
    let after: Vec<_> = schedule.tasks().cloned().collect();
    assert_eq!(before, after);
    assert_eq!(schedule.dag().predecessors(2), vec![1]);
}

#[test]
fn self_dependency_and_unknown_predecessor_are_rejected() {
    let (mut schedule, cal) = chain();
    assert!(matches!(
        schedule.add_dependency(&cal, 2, 2),
        Err(ScheduleError::InvalidDependency { .. })
    ));
    assert!(matches!(
        schedule.add_task(&cal, Task::new(4, "D", 1).depends_on([42])),
        Err(ScheduleError::InvalidDependency { .. })
    ));
    assert!(schedule.find_task(4).is_none());
}

#[test]
fn first_task_without_anchor_is_rejected() {
    let (mut schedule, cal) = chain();
    let mut orphan = Task::new(4, "Kickoff", 1);
    orphan.is_first = true;
    let err = schedule.add_task(&cal, orphan).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidTask(_)));
    assert!(schedule.find_task(4).is_none());
}

#[test]
fn end_past_the_calendar_range_is_rejected() {
    let mut cal = WorkCalendar::every_day();
    let last = NaiveDate::MAX;
    cal.add_holiday_interval(HolidayInterval::new(last - Duration::days(3), last))
        .unwrap();
    let mut schedule = Schedule::new();
    let err = schedule
        .add_task(&cal, Task::first(1, "A", 2, last - Duration::days(4)))
        .unwrap_err();
    assert_eq!(err, ScheduleError::DateOutOfRange(last));
    assert!(schedule.find_task(1).is_none());
}

#[test]
fn unit_chain_steps_one_business_day_at_a_time() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 1, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(2, "B", 1).depends_on([1]))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(3, "C", 1).depends_on([2]))
        .unwrap();
    assert_eq!(schedule.task(2).unwrap().date_start, Some(d(2024, 1, 2)));
    assert_eq!(schedule.task(3).unwrap().date_start, Some(d(2024, 1, 3)));
}

#[test]
fn accumulated_delay_adds_upstream_slip() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 1, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(2, "B", 2).depends_on([1]))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(3, "C", 1).depends_on([2]))
        .unwrap();
    let notifier = RecordingNotifier::new();

    // Nothing upstream is complete yet.
    assert_eq!(schedule.task(2).unwrap().accumulated_delay, 0);

    schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 3), &notifier)
        .unwrap();
    let a = schedule.task(1).unwrap();
    assert_eq!(a.task_delay, 2);
    assert_eq!(a.accumulated_delay, 2);
    assert!(a.status.is_delayed);
    // B waits for A's actual completion.
    let b = schedule.task(2).unwrap();
    assert_eq!((b.date_start, b.date_end), (Some(d(2024, 1, 4)), Some(d(2024, 1, 5))));
    assert_eq!(schedule.task(3).unwrap().accumulated_delay, 0);

    schedule
        .on_completion_date_set(&cal, 2, d(2024, 1, 4), &notifier)
        .unwrap();
    let b = schedule.task(2).unwrap();
    assert_eq!(b.task_delay, -1);
    assert_eq!(b.accumulated_delay, 1);
    assert_eq!(schedule.task(3).unwrap().accumulated_delay, 1);
}

#[test]
fn early_completion_is_negative_delay() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 3, d(2024, 1, 1)))
        .unwrap();
    schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 2), &RecordingNotifier::new())
        .unwrap();
    let a = schedule.task(1).unwrap();
    assert_eq!(a.task_delay, -1);
    assert!(a.status.is_ahead_of_schedule);
    assert!(!a.status.is_delayed);
}

#[test]
fn completion_unblocks_successors_once() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 1, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(2, "B", 1).depends_on([1]).with_assignee("sam@example.com"))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(3, "C", 1).depends_on([1, 2]))
        .unwrap();
    let notifier = RecordingNotifier::new();

    let changes = schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 1), &notifier)
        .unwrap();
    assert_eq!(changes.unblocked, vec![2]);
    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].assignee.as_deref(), Some("sam@example.com"));
    assert_eq!(events[0].unblocked_by, 1);

    // Moving an existing completion date does not notify again.
    let changes = schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 2), &notifier)
        .unwrap();
    assert!(changes.unblocked.is_empty());
    assert_eq!(notifier.events().len(), 1);
}

#[test]
fn completion_on_weekend_is_a_calendar_violation() {
    let (mut schedule, cal) = chain();
    let err = schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 6), &RecordingNotifier::new())
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::CalendarViolation {
            task_id: 1,
            field: "completion_date",
            ..
        }
    ));
    assert!(schedule.task(1).unwrap().completion_date.is_none());
}

#[test]
fn editing_duration_reflows_successors() {
    let (mut schedule, cal) = chain();
    let edit = TaskEdit {
        planned_duration: Some(4),
        ..TaskEdit::default()
    };
    let changes = schedule.on_task_edited(&cal, 1, &edit).unwrap();
    assert_eq!(changes.changed, vec![1, 2, 3]);
    assert_eq!(schedule.task(1).unwrap().date_end, Some(d(2024, 1, 4)));
    assert_eq!(schedule.task(2).unwrap().date_start, Some(d(2024, 1, 5)));
    assert_eq!(schedule.task(3).unwrap().date_start, Some(d(2024, 1, 10)));
}

#[test]
fn moving_the_start_anchor_of_a_dependent_task_is_rejected() {
    let (mut schedule, cal) = chain();
    let edit = TaskEdit {
        start_anchor: Some(d(2024, 1, 10)),
        ..TaskEdit::default()
    };
    assert!(matches!(
        schedule.on_task_edited(&cal, 2, &edit),
        Err(ScheduleError::InvalidTask(_))
    ));

    let edit = TaskEdit {
        start_anchor: Some(d(2024, 1, 6)),
        ..TaskEdit::default()
    };
    assert!(matches!(
        schedule.on_task_edited(&cal, 1, &edit),
        Err(ScheduleError::CalendarViolation { .. })
    ));
    assert_eq!(schedule.task(1).unwrap().date_start, Some(d(2024, 1, 1)));
}

#[test]
fn removing_a_dependency_keeps_last_start() {
    let (mut schedule, cal) = chain();
    schedule.remove_dependency(&cal, 2, 3).unwrap();
    let c = schedule.task(3).unwrap();
    assert!(c.is_root());
    assert_eq!(c.date_start, Some(d(2024, 1, 8)));

    let err = schedule.remove_dependency(&cal, 2, 3).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidDependency { .. }));
}

#[test]
fn milestone_backward_pass_sets_latest_windows() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 2, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(&cal, Task::new(2, "B", 3).depends_on([1]))
        .unwrap();
    schedule
        .add_task(
            &cal,
            Task::milestone(3, "Launch", 2, SchedulingMode::MustFinishOn, d(2024, 1, 12))
                .depends_on([2]),
        )
        .unwrap();

    let launch = schedule.task(3).unwrap();
    assert_eq!(launch.latest_start, Some(d(2024, 1, 11)));
    assert_eq!(launch.latest_end, Some(d(2024, 1, 12)));
    let b = schedule.task(2).unwrap();
    assert_eq!(b.latest_start, Some(d(2024, 1, 8)));
    assert_eq!(b.latest_end, Some(d(2024, 1, 10)));
    let a = schedule.task(1).unwrap();
    assert_eq!(a.latest_start, Some(d(2024, 1, 4)));
    assert_eq!(a.latest_end, Some(d(2024, 1, 5)));
}

/// P feeds two `MustFinishOn` milestones; `low` gets id 2 and `high` id 3,
/// with `high` added first.
fn shared_predecessor(low_deadline: NaiveDate, high_deadline: NaiveDate) -> Schedule {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "P", 1, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(
            &cal,
            Task::milestone(3, "High", 1, SchedulingMode::MustFinishOn, high_deadline)
                .depends_on([1]),
        )
        .unwrap();
    schedule
        .add_task(
            &cal,
            Task::milestone(2, "Low", 1, SchedulingMode::MustFinishOn, low_deadline)
                .depends_on([1]),
        )
        .unwrap();
    schedule
}

#[test]
fn shared_predecessor_takes_window_from_lowest_milestone_id() {
    let earlier_low = shared_predecessor(d(2024, 1, 12), d(2024, 1, 19));
    let p = earlier_low.task(1).unwrap();
    assert_eq!((p.latest_start, p.latest_end), (Some(d(2024, 1, 11)), Some(d(2024, 1, 11))));

    // Same graph with the deadlines swapped: id 2 still wins.
    let later_low = shared_predecessor(d(2024, 1, 19), d(2024, 1, 12));
    let p = later_low.task(1).unwrap();
    assert_eq!((p.latest_start, p.latest_end), (Some(d(2024, 1, 18)), Some(d(2024, 1, 18))));
    assert_eq!(later_low.task(3).unwrap().latest_end, Some(d(2024, 1, 12)));
}

#[test]
fn must_start_on_deadline_fixes_latest_start() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(&cal, Task::first(1, "A", 1, d(2024, 1, 1)))
        .unwrap();
    schedule
        .add_task(
            &cal,
            Task::milestone(2, "Review", 3, SchedulingMode::MustStartOn, d(2024, 1, 4))
                .depends_on([1]),
        )
        .unwrap();
    let review = schedule.task(2).unwrap();
    assert_eq!(review.latest_start, Some(d(2024, 1, 4)));
    assert_eq!(review.latest_end, Some(d(2024, 1, 8)));
    assert_eq!(schedule.task(1).unwrap().latest_end, Some(d(2024, 1, 3)));
}

#[test]
fn late_completion_past_latest_end_is_overdue() {
    let cal = WorkCalendar::default();
    let mut schedule = Schedule::new();
    schedule
        .add_task(
            &cal,
            Task::milestone(1, "Audit", 1, SchedulingMode::MustFinishOn, d(2024, 1, 2)),
        )
        .unwrap();
    let edit = TaskEdit {
        start_anchor: Some(d(2024, 1, 1)),
        ..TaskEdit::default()
    };
    schedule.on_task_edited(&cal, 1, &edit).unwrap();
    schedule
        .on_completion_date_set(&cal, 1, d(2024, 1, 3), &RecordingNotifier::new())
        .unwrap();
    let audit = schedule.task(1).unwrap();
    assert!(audit.status.is_overdue);
    assert_eq!(audit.status.effective_finish, Some(d(2024, 1, 3)));
}

#[test]
fn recompute_without_changes_reports_nothing() {
    let (mut schedule, cal) = chain();
    assert!(schedule.recompute(&cal).unwrap().is_empty());
}
