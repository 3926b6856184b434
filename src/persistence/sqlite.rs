use super::{PersistenceError, PersistenceResult, ScheduleSnapshot, ScheduleStore};
use crate::calendar::WorkCalendarConfig;
use crate::metadata::ScheduleMetadata;
use crate::task::Task;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Mutex, MutexGuard};

/// Single-snapshot store: one metadata row plus one JSON blob per task.
pub struct SqliteScheduleStore {
    connection: Mutex<Connection>,
}

impl SqliteScheduleStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS schedule_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                metadata_json TEXT NOT NULL,
                calendar_json TEXT
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                task_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".into()))
    }

    fn save_metadata(
        tx: &rusqlite::Transaction,
        metadata: &ScheduleMetadata,
        calendar: Option<&WorkCalendarConfig>,
    ) -> PersistenceResult<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        let calendar_json = calendar.map(serde_json::to_string).transpose()?;
        tx.execute("DELETE FROM schedule_metadata", [])?;
        tx.execute(
            "INSERT INTO schedule_metadata (id, metadata_json, calendar_json) VALUES (1, ?1, ?2)",
            params![metadata_json, calendar_json],
        )?;
        Ok(())
    }

    fn save_tasks(tx: &rusqlite::Transaction, tasks: &[Task]) -> PersistenceResult<()> {
        tx.execute("DELETE FROM tasks", [])?;
        let mut stmt = tx.prepare("INSERT INTO tasks (id, task_json) VALUES (?1, ?2)")?;
        for task in tasks {
            let json = serde_json::to_string(task)?;
            stmt.execute(params![task.id, json])?;
        }
        Ok(())
    }
}

impl ScheduleStore for SqliteScheduleStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()> {
        super::validate_tasks(&snapshot.tasks)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::save_metadata(&tx, &snapshot.metadata, snapshot.calendar.as_ref())?;
        Self::save_tasks(&tx, &snapshot.tasks)?;
        tx.commit()?;
        Ok(())
    }

    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT metadata_json, calendar_json FROM schedule_metadata WHERE id = 1")?;
        let row: Option<(String, Option<String>)> = stmt
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((metadata_json, calendar_json)) = row else {
            return Ok(None);
        };

        let metadata: ScheduleMetadata = serde_json::from_str(&metadata_json)?;
        let calendar: Option<WorkCalendarConfig> = calendar_json
            .map(|json| serde_json::from_str(&json))
            .transpose()?;

        let mut stmt = conn.prepare("SELECT task_json FROM tasks ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tasks = Vec::new();
        for json in rows {
            let json = json?;
            let task: Task = serde_json::from_str(&json)?;
            tasks.push(task);
        }

        super::validate_tasks(&tasks)?;
        Ok(Some(ScheduleSnapshot {
            metadata,
            calendar,
            tasks,
        }))
    }
}
