use chrono::NaiveDate;
use project_scheduler::{
    AnchorField, HolidayInterval, Organization, ScheduleError, ScheduleMetadata, SchedulingMode, Task, WorkCalendar,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn org_with_two_projects() -> (Organization, u32, u32, u32) {
    let mut org = Organization::new("Acme");
    let cal = org.add_calendar(WorkCalendar::default());
    let north = org.create_project(ScheduleMetadata::named("North").with_calendar(cal));
    let south = org.create_project(ScheduleMetadata::named("South").with_calendar(cal));

    org.add_task(north, Task::first(1, "Survey", 3, d(2024, 1, 1)))
        .unwrap();
    org.add_task(north, Task::new(2, "Dig", 2).depends_on([1]))
        .unwrap();
    org.add_task(south, Task::first(1, "Permit", 1, d(2024, 1, 2)))
        .unwrap();
    (org, cal, north, south)
}

#[test]
fn projects_inherit_organization_name() {
    let (org, cal, north, south) = org_with_two_projects();
    assert_eq!(org.project(north).unwrap().metadata().organization, "Acme");
    assert_eq!(org.projects_on(cal), vec![north, south]);
}

#[test]
fn calendar_change_recomputes_every_governed_project() {
    let (mut org, cal, north, south) = org_with_two_projects();
    let mut updated = org.calendar(cal).unwrap().clone();
    // Survey ends on Wednesday; a holiday there pushes its end to Thursday.
    updated.add_holiday(d(2024, 1, 3));

    let results = org.on_calendar_changed(cal, updated).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[&north].changed, vec![1, 2]);

    let survey = org.project(north).unwrap().task(1).unwrap();
    assert_eq!(survey.date_start, Some(d(2024, 1, 1)));
    assert_eq!(survey.date_end, Some(d(2024, 1, 4)));
    assert_eq!(survey.holiday_days, 1);
    let dig = org.project(north).unwrap().task(2).unwrap();
    assert_eq!(dig.date_start, Some(d(2024, 1, 5)));

    // Permit runs on Tuesday only and is untouched by a Wednesday holiday.
    assert!(results[&south].changed.is_empty());
}

#[test]
fn calendar_change_rolls_anchors_on_new_holidays() {
    let (mut org, cal, _, south) = org_with_two_projects();
    let mut updated = org.calendar(cal).unwrap().clone();
    updated.add_holiday(d(2024, 1, 2));

    let results = org.on_calendar_changed(cal, updated).unwrap();
    let rolled = &results[&south].rolled_anchors;
    assert_eq!(rolled.len(), 1);
    assert_eq!(rolled[0].field, AnchorField::DateStart);
    assert_eq!((rolled[0].from, rolled[0].to), (d(2024, 1, 2), d(2024, 1, 3)));
    assert_eq!(
        org.project(south).unwrap().task(1).unwrap().date_start,
        Some(d(2024, 1, 3))
    );
}

#[test]
fn calendar_change_is_rejected_for_all_projects_when_one_fails() {
    let (mut org, cal, north, south) = org_with_two_projects();
    org.add_task(
        south,
        Task::milestone(2, "Inspection", 1, SchedulingMode::MustFinishOn, d(2024, 1, 5))
            .depends_on([1]),
    )
    .unwrap();
    let before = org.project(north).unwrap().task(1).unwrap().clone();

    let mut updated = org.calendar(cal).unwrap().clone();
    updated.add_holiday(d(2024, 1, 3));
    updated.add_holiday(d(2024, 1, 5));
    let err = org.on_calendar_changed(cal, updated).unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::CalendarViolation { task_id: 2, .. }
    ));

    assert_eq!(org.project(north).unwrap().task(1).unwrap(), &before);
    assert!(!org.calendar(cal).unwrap().is_holiday(d(2024, 1, 3)));
}

#[test]
fn projects_on_other_calendars_are_left_alone() {
    let (mut org, _, north, _) = org_with_two_projects();
    let six_day = org.add_calendar(
        WorkCalendar::new(
            [
                chrono::Weekday::Mon,
                chrono::Weekday::Tue,
                chrono::Weekday::Wed,
                chrono::Weekday::Thu,
                chrono::Weekday::Fri,
                chrono::Weekday::Sat,
            ],
            Vec::<HolidayInterval>::new(),
        )
        .unwrap(),
    );
    let east = org.create_project(ScheduleMetadata::named("East").with_calendar(six_day));
    org.add_task(east, Task::first(1, "Pour", 2, d(2024, 1, 5)))
        .unwrap();
    assert_eq!(
        org.project(east).unwrap().task(1).unwrap().date_end,
        Some(d(2024, 1, 6))
    );

    let results = org
        .on_calendar_changed(six_day, WorkCalendar::default())
        .unwrap();
    assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![east]);
    assert_eq!(
        org.project(east).unwrap().task(1).unwrap().date_end,
        Some(d(2024, 1, 8))
    );
    assert_eq!(
        org.project(north).unwrap().task(1).unwrap().date_end,
        Some(d(2024, 1, 3))
    );
}

#[test]
fn removed_project_is_unknown() {
    let (mut org, _, north, _) = org_with_two_projects();
    let removed = org.remove_project(north).unwrap();
    assert_eq!(removed.project_name(), "North");
    assert_eq!(org.project(north).unwrap_err(), ScheduleError::UnknownProject(north));
}
