use chrono::{NaiveDate, Weekday};
use project_scheduler::{
    ChangeSet, HolidayInterval, LogNotifier, Organization, ProjectId, ScheduleMetadata,
    ScheduleResult, ScheduleSnapshot, SchedulerConfig, SchedulingMode, Task, TaskEdit,
    WorkCalendar, delayed_frame, load_snapshot_from_csv, load_snapshot_from_json,
    render_text_table, save_snapshot_to_csv, save_snapshot_to_json, schedule_frame,
};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

struct Session {
    org: Organization,
    project: ProjectId,
}

impl Session {
    fn new(config: SchedulerConfig) -> Self {
        let mut org = Organization::new("Default").with_config(config);
        let calendar = org.add_calendar(WorkCalendar::default());
        let project = org.create_project(ScheduleMetadata::named("New Project").with_calendar(calendar));
        Self { org, project }
    }

    fn calendar(&self) -> ScheduleResult<WorkCalendar> {
        self.org
            .calendar_for(self.project)
            .map(|calendar| calendar.into_owned())
    }

    fn table(&self, delayed_only: bool) -> String {
        let schedule = match self.org.project(self.project) {
            Ok(schedule) => schedule,
            Err(e) => return format!("Error: {e}"),
        };
        let frame = schedule_frame(schedule).and_then(|df| {
            if delayed_only {
                delayed_frame(&df)
            } else {
                Ok(df)
            }
        });
        match frame {
            Ok(df) => render_text_table(&df),
            Err(e) => format!("Report error: {e}"),
        }
    }

    fn report(&self, label: &str, result: ScheduleResult<ChangeSet>) {
        match result {
            Ok(changes) => {
                println!("{label} ({})", changes.to_cli_summary());
                for id in &changes.unblocked {
                    println!("Task {id} is ready to start.");
                }
                println!("{}", self.table(false));
            }
            Err(e) => println!("Error: {e}"),
        }
    }

    fn update_calendar<F>(&mut self, edit: F)
    where
        F: FnOnce(&mut WorkCalendar) -> ScheduleResult<()>,
    {
        let result = self.calendar().and_then(|mut calendar| {
            edit(&mut calendar)?;
            let calendar_id = self.org.project(self.project)?.metadata().calendar_id;
            let mut results = self.org.on_calendar_changed(calendar_id, calendar)?;
            Ok(results.remove(&self.project).unwrap_or_default())
        });
        self.report("Calendar updated", result);
    }
}

fn parse_id_list(s: &str) -> Option<Vec<i32>> {
    s.split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<i32>().ok())
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  show [delayed]                     Show schedule (or delayed tasks only)\n  add <id> <name> <duration> [preds_csv]\n                                     Add a task (preds like 1,2,3)\n  first <id> <name> <duration> <YYYY-MM-DD>\n                                     Add a first task anchored at a start date\n  milestone <id> <name> <duration> <start|finish> <YYYY-MM-DD> [preds_csv]\n                                     Add a milestone with a deadline\n  dep <pred> <succ>                  Add a finish-to-start dependency\n  undep <pred> <succ>                Remove a dependency\n  complete <id> <YYYY-MM-DD>         Set a completion date\n  edit <id> <field> <value...>       Edit name|duration|buffer|hold|start|deadline|assignee|reason\n  delete <id>                        Delete a task and its dependencies\n  holiday <YYYY-MM-DD> [YYYY-MM-DD]  Add a holiday (single day or interval)\n  workdays <mon,tue,...>             Set the working weekdays\n  calendar show                      Display calendar configuration\n  compute                            Recompute the schedule\n  save <json|csv> <path>             Persist schedule to disk\n  load <json|csv> <path>             Load schedule from disk\n  quit|exit                          Exit"
    );
}

fn print_calendar_info(session: &Session) {
    let calendar = match session.calendar() {
        Ok(calendar) => calendar,
        Err(e) => {
            println!("Error: {e}");
            return;
        }
    };
    let config = calendar.to_config();
    let working_days = config
        .working_days()
        .iter()
        .map(|wd| wd.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let holidays = config
        .holidays()
        .iter()
        .map(|h| {
            if h.start == h.end {
                h.start.to_string()
            } else {
                format!("{}..{}", h.start, h.end)
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    println!("Working days       : {working_days}");
    println!("Holidays           : {holidays}");
}

fn edit_for(field: &str, value: &str) -> Result<TaskEdit, String> {
    let mut edit = TaskEdit::default();
    let number = || {
        value
            .parse::<i64>()
            .map_err(|_| format!("Invalid number '{value}'"))
    };
    match field {
        "name" => edit.name = Some(value.to_string()),
        "duration" => edit.planned_duration = Some(number()?),
        "buffer" => edit.buffer_time = Some(number()?),
        "hold" => edit.on_hold = Some(number()?),
        "start" => {
            edit.start_anchor = Some(parse_date(value).ok_or("Invalid date (YYYY-MM-DD)")?);
        }
        "deadline" => {
            edit.milestone_deadline =
                Some(Some(parse_date(value).ok_or("Invalid date (YYYY-MM-DD)")?));
        }
        "assignee" => edit.assignee = Some(Some(value.to_string())),
        "reason" => edit.delay_due_to = Some(Some(value.to_string())),
        other => return Err(format!("Unknown field '{other}'")),
    }
    Ok(edit)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = SchedulerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Ignoring scheduler environment: {e}");
        SchedulerConfig::default()
    });
    let mut session = Session::new(config.clone());

    println!("Project Scheduler (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let args: Vec<&str> = input.split_whitespace().collect();
        let cmd = args[0];

        match (cmd, &args[1..]) {
            ("help", _) => print_help(),
            ("quit" | "exit", _) => break,
            ("show", ["delayed"]) => println!("{}", session.table(true)),
            ("show", _) => println!("{}", session.table(false)),
            ("compute", _) => {
                let result = session.org.recompute(session.project);
                session.report("Recomputed", result);
            }
            ("add", [id, name, duration, rest @ ..]) => {
                let (Ok(id), Ok(duration)) = (id.parse::<i32>(), duration.parse::<i64>()) else {
                    println!("Invalid id or duration");
                    continue;
                };
                let Some(preds) = rest.first().map_or(Some(Vec::new()), |s| parse_id_list(s)) else {
                    println!("Invalid predecessor list");
                    continue;
                };
                let task = Task::new(id, *name, duration).depends_on(preds);
                let result = session.org.add_task(session.project, task);
                session.report("Task added", result);
            }
            ("add", _) => println!("Usage: add <id> <name> <duration> [preds_csv]"),
            ("first", [id, name, duration, start]) => {
                let (Ok(id), Ok(duration), Some(start)) =
                    (id.parse::<i32>(), duration.parse::<i64>(), parse_date(start))
                else {
                    println!("Invalid id, duration or date");
                    continue;
                };
                let result = session
                    .org
                    .add_task(session.project, Task::first(id, *name, duration, start));
                session.report("First task added", result);
            }
            ("first", _) => println!("Usage: first <id> <name> <duration> <YYYY-MM-DD>"),
            ("milestone", [id, name, duration, mode, deadline, rest @ ..]) => {
                let (Ok(id), Ok(duration), Ok(mode), Some(deadline)) = (
                    id.parse::<i32>(),
                    duration.parse::<i64>(),
                    mode.parse::<SchedulingMode>(),
                    parse_date(deadline),
                ) else {
                    println!("Invalid id, duration, mode or date");
                    continue;
                };
                let Some(preds) = rest.first().map_or(Some(Vec::new()), |s| parse_id_list(s)) else {
                    println!("Invalid predecessor list");
                    continue;
                };
                let task = Task::milestone(id, *name, duration, mode, deadline).depends_on(preds);
                let result = session.org.add_task(session.project, task);
                session.report("Milestone added", result);
            }
            ("milestone", _) => println!(
                "Usage: milestone <id> <name> <duration> <start|finish> <YYYY-MM-DD> [preds_csv]"
            ),
            ("dep" | "undep", [pred, succ]) => {
                let (Ok(pred), Ok(succ)) = (pred.parse::<i32>(), succ.parse::<i32>()) else {
                    println!("Invalid id");
                    continue;
                };
                let result = if cmd == "dep" {
                    session.org.add_dependency(session.project, pred, succ)
                } else {
                    session.org.remove_dependency(session.project, pred, succ)
                };
                session.report("Dependencies updated", result);
            }
            ("dep" | "undep", _) => println!("Usage: {cmd} <pred> <succ>"),
            ("complete", [id, date]) => {
                let (Ok(id), Some(date)) = (id.parse::<i32>(), parse_date(date)) else {
                    println!("Invalid id or date (YYYY-MM-DD)");
                    continue;
                };
                let result =
                    session
                        .org
                        .on_completion_date_set(session.project, id, date, &LogNotifier);
                session.report("Completion recorded", result);
            }
            ("complete", _) => println!("Usage: complete <id> <YYYY-MM-DD>"),
            ("edit", [id, field, value @ ..]) if !value.is_empty() => {
                let Ok(id) = id.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                match edit_for(field, &value.join(" ")) {
                    Ok(edit) => {
                        let result = session.org.on_task_edited(session.project, id, &edit);
                        session.report("Task edited", result);
                    }
                    Err(message) => println!("{message}"),
                }
            }
            ("edit", _) => println!("Usage: edit <id> <field> <value...>"),
            ("delete", [id]) => {
                let Ok(id) = id.parse::<i32>() else {
                    println!("Invalid id");
                    continue;
                };
                match session.org.remove_task(session.project, id) {
                    Ok(_) => {
                        println!("Deleted task {id}.");
                        println!("{}", session.table(false));
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            ("delete", _) => println!("Usage: delete <id>"),
            ("holiday", [start, rest @ ..]) if rest.len() <= 1 => {
                let end = rest.first().copied().unwrap_or(*start);
                let (Some(start), Some(end)) = (parse_date(start), parse_date(end)) else {
                    println!("Invalid date (YYYY-MM-DD)");
                    continue;
                };
                session.update_calendar(|calendar| {
                    calendar.add_holiday_interval(HolidayInterval::new(start, end))
                });
            }
            ("holiday", _) => println!("Usage: holiday <YYYY-MM-DD> [YYYY-MM-DD]"),
            ("workdays", [days]) => {
                let parsed: Result<Vec<Weekday>, _> =
                    days.split(',').map(|d| d.trim().parse::<Weekday>()).collect();
                match parsed {
                    Ok(days) => session.update_calendar(|calendar| calendar.set_working_days(days)),
                    Err(_) => println!("Invalid weekday list (e.g. mon,tue,wed)"),
                }
            }
            ("workdays", _) => println!("Usage: workdays <mon,tue,...>"),
            ("calendar", ["show"]) => print_calendar_info(&session),
            ("calendar", _) => println!("Usage: calendar show"),
            ("save", [format, path]) => {
                let saved = ScheduleSnapshot::capture(&session.org, session.project).and_then(
                    |snapshot| match *format {
                        "json" => save_snapshot_to_json(&snapshot, path),
                        "csv" => save_snapshot_to_csv(&snapshot, path),
                        _ => Err(project_scheduler::PersistenceError::InvalidData(format!(
                            "unknown format '{format}'"
                        ))),
                    },
                );
                match saved {
                    Ok(()) => println!("Schedule saved to {path}"),
                    Err(e) => println!("Error saving schedule: {e}"),
                }
            }
            ("save", _) => println!("Usage: save <json|csv> <path>"),
            ("load", [format, path]) => {
                let snapshot = match *format {
                    "json" => load_snapshot_from_json(path),
                    "csv" => load_snapshot_from_csv(path),
                    _ => {
                        println!("Usage: load <json|csv> <path>");
                        continue;
                    }
                };
                let mut org = Organization::new("Default").with_config(config.clone());
                match snapshot.and_then(|snapshot| snapshot.import_into(&mut org)) {
                    Ok(project) => {
                        session = Session { org, project };
                        println!("Schedule loaded from {path}");
                        println!("{}", session.table(false));
                    }
                    Err(e) => println!("Error loading schedule: {e}"),
                }
            }
            ("load", _) => println!("Usage: load <json|csv> <path>"),
            _ => println!("Unknown command '{cmd}'. Type 'help' for commands."),
        }
    }
}
