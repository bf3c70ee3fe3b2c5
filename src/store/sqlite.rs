use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use log::info;
use rusqlite::{Connection, params, params_from_iter};

use super::{
    AttendanceStore, COUNT_SQL, DELETE_SQL, INSERT_SQL, RecordQuery, SAMPLE_RECORDS, SEARCH_SQL,
    like_pattern, record_from_row,
};
use crate::config::Driver;
use crate::error::StoreError;
use crate::record::{AttendanceRecord, NewRecord};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS Attendance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    employeeName TEXT NOT NULL,
    employeeID TEXT NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL
)";

/// SQLite-backed store. A single connection is shared behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("Connected to SQLite database at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Private database that disappears with the store; used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        SqliteStore {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn query_records(
        conn: &Connection,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, employee_id, date, status)| {
                record_from_row(id, name, employee_id, date, status)
            })
            .collect()
    }
}

impl AttendanceStore for SqliteStore {
    fn driver(&self) -> Driver {
        Driver::Sqlite
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn()?.execute(CREATE_TABLE_SQL, [])?;
        Ok(())
    }

    fn insert(&self, record: &NewRecord) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            INSERT_SQL,
            params![
                record.employee_name,
                record.employee_id,
                record.date_string(),
                record.status.as_str()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn list(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (sql, params) = query.to_sql();
        let conn = self.conn()?;
        Self::query_records(&conn, &sql, &params)
    }

    fn search(&self, term: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let pattern = like_pattern(term);
        let conn = self.conn()?;
        Self::query_records(&conn, SEARCH_SQL, &[pattern.clone(), pattern])
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let changes = self.conn()?.execute(DELETE_SQL, params![id])?;
        Ok(changes > 0)
    }

    fn count(&self) -> Result<i64, StoreError> {
        let count = self.conn()?.query_row(COUNT_SQL, [], |row| row.get(0))?;
        Ok(count)
    }

    fn seed_if_empty(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let existing: i64 = conn.query_row(COUNT_SQL, [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let tx = conn.transaction()?;
        for (name, employee_id, date, status) in SAMPLE_RECORDS {
            tx.execute(INSERT_SQL, params![name, employee_id, date, status.as_str()])?;
        }
        tx.commit()?;

        Ok(SAMPLE_RECORDS.len())
    }
}
