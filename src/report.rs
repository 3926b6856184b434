use crate::schedule::Schedule;
use crate::task::{Task, TaskStatus};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;

const EPOCH: Option<NaiveDate> = NaiveDate::from_ymd_opt(1970, 1, 1);

/// One row per task, ascending id: inputs first, then computed fields.
pub fn schedule_frame(schedule: &Schedule) -> PolarsResult<DataFrame> {
    let tasks: Vec<&Task> = schedule.tasks().collect();

    let ids: Vec<i32> = tasks.iter().map(|t| t.id).collect();
    let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
    let durations: Vec<i64> = tasks.iter().map(|t| t.planned_duration).collect();
    let buffers: Vec<i64> = tasks.iter().map(|t| t.buffer_time).collect();
    let holds: Vec<i64> = tasks.iter().map(|t| t.on_hold).collect();
    let milestones: Vec<bool> = tasks.iter().map(|t| t.is_milestone).collect();
    let modes: Vec<Option<&str>> = tasks
        .iter()
        .map(|t| t.scheduling_mode.map(|mode| mode.as_str()))
        .collect();
    let predecessors: Vec<String> = tasks
        .iter()
        .map(|t| {
            t.predecessor_ids()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    let assignees: Vec<Option<&str>> = tasks.iter().map(|t| t.assignee.as_deref()).collect();
    let delays: Vec<i64> = tasks.iter().map(|t| t.task_delay).collect();
    let accumulated: Vec<i64> = tasks.iter().map(|t| t.accumulated_delay).collect();
    let holidays: Vec<i64> = tasks.iter().map(|t| t.holiday_days).collect();
    let statuses: Vec<String> = tasks.iter().map(|t| status_label(&t.status)).collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("duration"), durations).into_column(),
        Series::new(PlSmallStr::from_static("buffer"), buffers).into_column(),
        Series::new(PlSmallStr::from_static("on_hold"), holds).into_column(),
        Series::new(PlSmallStr::from_static("milestone"), milestones).into_column(),
        Series::new(PlSmallStr::from_static("mode"), modes).into_column(),
        Series::new(PlSmallStr::from_static("predecessors"), predecessors).into_column(),
        Series::new(PlSmallStr::from_static("assignee"), assignees).into_column(),
        date_series("date_start", tasks.iter().map(|t| t.date_start))?.into_column(),
        date_series("date_end", tasks.iter().map(|t| t.date_end))?.into_column(),
        date_series("latest_start", tasks.iter().map(|t| t.latest_start))?.into_column(),
        date_series("latest_end", tasks.iter().map(|t| t.latest_end))?.into_column(),
        date_series("completed", tasks.iter().map(|t| t.completion_date))?.into_column(),
        Series::new(PlSmallStr::from_static("task_delay"), delays).into_column(),
        Series::new(PlSmallStr::from_static("accumulated_delay"), accumulated).into_column(),
        Series::new(PlSmallStr::from_static("holiday_days"), holidays).into_column(),
        Series::new(PlSmallStr::from_static("status"), statuses).into_column(),
    ];
    DataFrame::new(columns)
}

/// Rows of `frame` with a positive `task_delay`.
pub fn delayed_frame(frame: &DataFrame) -> PolarsResult<DataFrame> {
    frame
        .clone()
        .lazy()
        .filter(col("task_delay").gt(lit(0i64)))
        .collect()
}

pub fn render_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|col| col.get(row).map(|av| cell_text(&av)).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, &names, &widths);
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    out.push('|');
    for (cell, width) in cells.iter().zip(widths) {
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(width.saturating_sub(cell.len())));
        out.push_str(" |");
    }
    out.push('\n');
}

fn cell_text(av: &AnyValue<'_>) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Boolean(true) => "yes".to_string(),
        AnyValue::Boolean(false) => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::Date(days) => date_from_i32(*days).map(|d| d.to_string()).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn status_label(status: &TaskStatus) -> String {
    let flags = [
        (status.is_completed, "completed"),
        (status.is_delayed, "delayed"),
        (status.is_ahead_of_schedule, "ahead"),
        (status.is_on_hold, "on_hold"),
        (status.is_overdue, "overdue"),
    ];
    flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, label)| *label)
        .collect::<Vec<_>>()
        .join(",")
}

fn date_series<I>(name: &str, dates: I) -> PolarsResult<Series>
where
    I: Iterator<Item = Option<NaiveDate>>,
{
    let days: Vec<Option<i32>> = dates.map(|d| d.and_then(date_to_i32)).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

fn date_to_i32(date: NaiveDate) -> Option<i32> {
    EPOCH.map(|epoch| (date - epoch).num_days() as i32)
}

fn date_from_i32(days: i32) -> Option<NaiveDate> {
    EPOCH.map(|epoch| epoch + Duration::days(days as i64))
}
