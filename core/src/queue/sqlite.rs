use crate::errors::TaskLoomErrors;
use crate::queue::{TaskQueue, empty_queue_error, unknown_id_error};
use crate::task::QueuedTask;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS queue (
    id TEXT PRIMARY KEY,
    task_name TEXT NOT NULL,
    args TEXT,
    kwargs TEXT,
    queue_name TEXT,
    enqueued_at TEXT NOT NULL,
    eta TEXT,
    exclusive_key TEXT
)
";

const SELECT_COLUMNS: &str = "id, task_name, args, kwargs, queue_name, enqueued_at, eta, exclusive_key";

/// The embedded relational [`TaskQueue`]: one `queue` table with dispatch
/// realised in SQL. Args and kwargs round-trip through their JSON text, so a
/// task restored from the table is equal to the task that was enqueued.
///
/// Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`
/// suffix) so that string order matches time order in the `eta` comparison.
pub struct SqliteQueue {
    conn: Mutex<Connection>,
}

impl SqliteQueue {
    /// Opens a queue backed by an in-memory database, private to this
    /// instance.
    pub fn in_memory() -> Result<Self, TaskLoomErrors> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Opens (creating when necessary) a queue backed by a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TaskLoomErrors> {
        Self::with_connection(Connection::open(path)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, TaskLoomErrors> {
        conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// A `limit` of -1 means no limit, per SQLite's LIMIT semantics.
    fn select_next(
        conn: &Connection,
        queue_name: &str,
        limit: i64,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors> {
        let now = format_instant(Utc::now());
        let mut statement = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM queue \
             WHERE queue_name = ?1 AND (eta IS NULL OR eta <= ?2) \
             ORDER BY (eta IS NULL) DESC, eta ASC, enqueued_at ASC, id ASC \
             LIMIT ?3"
        ))?;
        let rows = statement.query_map(params![queue_name, now, limit], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row??);
        }
        Ok(tasks)
    }
}

impl TaskQueue for SqliteQueue {
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO queue \
             (id, task_name, args, kwargs, queue_name, enqueued_at, eta, exclusive_key) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                task.id,
                task.task_name,
                serde_json::Value::Array(task.args.clone()).to_string(),
                serde_json::Value::Object(task.kwargs.clone()).to_string(),
                task.queue_name,
                format_instant(task.enqueued_at),
                task.eta.map(format_instant),
                task.exclusive_key,
            ],
        )?;
        Ok(())
    }

    fn dequeue(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        let task = Self::select_next(&conn, queue_name, 1)?
            .pop()
            .ok_or_else(|| empty_queue_error(queue_name))?;
        conn.execute("DELETE FROM queue WHERE id = ?1", params![task.id])?;
        Ok(task)
    }

    fn peek(&self, queue_name: &str) -> Result<Option<QueuedTask>, TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        Ok(Self::select_next(&conn, queue_name, 1)?.pop())
    }

    fn bulk_peek(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        Self::select_next(&conn, queue_name, limit.map_or(-1, |limit| limit as i64))
    }

    fn dequeue_any_unsafe(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM queue WHERE queue_name = ?1 \
                 ORDER BY (eta IS NULL) DESC, eta ASC, enqueued_at ASC, id ASC \
                 LIMIT 1"
            ),
            params![queue_name],
            row_to_task,
        );
        let task = match result {
            Ok(task) => task?,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(empty_queue_error(queue_name));
            }
            Err(err) => return Err(err.into()),
        };
        conn.execute("DELETE FROM queue WHERE id = ?1", params![task.id])?;
        Ok(task)
    }

    fn remove(&self, id: &str) -> Result<(), TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(unknown_id_error(id));
        }
        Ok(())
    }

    fn reschedule(&self, id: &str, eta: Option<DateTime<Utc>>) -> Result<(), TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE queue SET eta = ?1 WHERE id = ?2",
            params![eta.map(format_instant), id],
        )?;
        if updated == 0 {
            return Err(unknown_id_error(id));
        }
        Ok(())
    }

    fn move_task(&self, id: &str, queue_name: &str) -> Result<(), TaskLoomErrors> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE queue SET queue_name = ?1 WHERE id = ?2",
            params![queue_name, id],
        )?;
        if updated == 0 {
            return Err(unknown_id_error(id));
        }
        Ok(())
    }

    fn total_tasks(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get::<_, i64>(0))
            .unwrap_or(0) as usize
    }

    fn total_tasks_by_queue(&self) -> HashMap<String, usize> {
        let conn = self.conn.lock().unwrap();
        let mut counts = HashMap::new();
        let Ok(mut statement) = conn.prepare(
            "SELECT COALESCE(queue_name, 'default'), COUNT(*) FROM queue GROUP BY queue_name",
        ) else {
            return counts;
        };
        let Ok(rows) = statement.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        }) else {
            return counts;
        };
        for row in rows.flatten() {
            counts.insert(row.0, row.1 as usize);
        }
        counts
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_instant(text: &str) -> Result<DateTime<Utc>, TaskLoomErrors> {
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| {
            TaskLoomErrors::InvariantViolation(format!(
                "stored instant `{text}` failed to parse: {err}"
            ))
        })
}

/// Restores a [`QueuedTask`] from a row selected via [`SELECT_COLUMNS`].
fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Result<QueuedTask, TaskLoomErrors>> {
    let id: String = row.get(0)?;
    let task_name: String = row.get(1)?;
    let args: Option<String> = row.get(2)?;
    let kwargs: Option<String> = row.get(3)?;
    let queue_name: Option<String> = row.get(4)?;
    let enqueued_at: String = row.get(5)?;
    let eta: Option<String> = row.get(6)?;
    let exclusive_key: Option<String> = row.get(7)?;

    Ok(restore_task(
        id,
        task_name,
        args,
        kwargs,
        queue_name,
        enqueued_at,
        eta,
        exclusive_key,
    ))
}

#[allow(clippy::too_many_arguments)]
fn restore_task(
    id: String,
    task_name: String,
    args: Option<String>,
    kwargs: Option<String>,
    queue_name: Option<String>,
    enqueued_at: String,
    eta: Option<String>,
    exclusive_key: Option<String>,
) -> Result<QueuedTask, TaskLoomErrors> {
    let args = match args {
        None => Vec::new(),
        Some(text) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Array(values)) => values,
            _ => {
                return Err(TaskLoomErrors::InvariantViolation(format!(
                    "stored args for task `{id}` are not a JSON array"
                )));
            }
        },
    };
    let kwargs = match kwargs {
        None => serde_json::Map::new(),
        Some(text) => match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(values)) => values,
            _ => {
                return Err(TaskLoomErrors::InvariantViolation(format!(
                    "stored kwargs for task `{id}` are not a JSON object"
                )));
            }
        },
    };

    Ok(QueuedTask {
        id,
        task_name,
        args,
        kwargs,
        queue_name: queue_name.unwrap_or_else(|| crate::settings::DEFAULT_QUEUE_NAME.to_owned()),
        enqueued_at: parse_instant(&enqueued_at)?,
        eta: eta.as_deref().map(parse_instant).transpose()?,
        exclusive_key,
    })
}
