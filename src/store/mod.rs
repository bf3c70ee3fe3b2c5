//! Persistence for attendance records.
//!
//! Route handlers only see [`AttendanceStore`]; the concrete driver is picked
//! at startup from [`Config::driver`]. Both drivers speak the same dialect of
//! positional `?` placeholders, so the statements built here are shared.

use std::sync::Arc;

use chrono::NaiveDate;
use log::info;

use crate::config::{Config, Driver};
use crate::error::StoreError;
use crate::record::{AttendanceRecord, DATE_FORMAT, NewRecord, Status};

#[cfg(feature = "mysql")]
pub mod mysql;
pub mod sqlite;

#[cfg(feature = "mysql")]
pub use self::mysql::MysqlStore;
pub use self::sqlite::SqliteStore;

pub(crate) const SELECT_COLUMNS: &str = "SELECT id, employeeName, employeeID, date, status FROM Attendance";

pub(crate) const INSERT_SQL: &str =
    "INSERT INTO Attendance (employeeName, employeeID, date, status) VALUES (?, ?, ?, ?)";

pub(crate) const DELETE_SQL: &str = "DELETE FROM Attendance WHERE id = ?";

pub(crate) const COUNT_SQL: &str = "SELECT COUNT(*) FROM Attendance";

pub(crate) const SEARCH_SQL: &str = "SELECT id, employeeName, employeeID, date, status FROM Attendance \
     WHERE employeeName LIKE ? OR employeeID LIKE ? ORDER BY date DESC";

/// Rows inserted into an empty table when sample data is enabled.
pub const SAMPLE_RECORDS: [(&str, &str, &str, Status); 3] = [
    ("John Smith", "EMP001", "2024-01-15", Status::Present),
    ("Sarah Johnson", "EMP002", "2024-01-15", Status::Present),
    ("Mike Wilson", "EMP003", "2024-01-15", Status::Absent),
];

/// Storage operations every driver must provide.
///
/// Implementations are blocking; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait AttendanceStore: Send + Sync {
    /// Human readable driver name, reported by the health check.
    fn driver(&self) -> Driver;

    /// Creates the `Attendance` table if it does not exist yet.
    fn init(&self) -> Result<(), StoreError>;

    /// Inserts a record and returns the id assigned by the database.
    fn insert(&self, record: &NewRecord) -> Result<i64, StoreError>;

    fn list(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Substring match on employee name or id, newest date first.
    fn search(&self, term: &str) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Returns `false` when no row had the given id.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;

    fn count(&self) -> Result<i64, StoreError>;

    /// Inserts [`SAMPLE_RECORDS`] when the table is empty. Returns how many
    /// rows were added.
    fn seed_if_empty(&self) -> Result<usize, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Name,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filters and ordering applied by [`AttendanceStore::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub search: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<Status>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl RecordQuery {
    /// Inclusive date range, as used by the report exporter.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        RecordQuery {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        }
    }

    /// Renders the statement and its positional parameters.
    pub(crate) fn to_sql(&self) -> (String, Vec<String>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            clauses.push("(employeeName LIKE ? OR employeeID LIKE ?)");
            let pattern = like_pattern(term);
            params.push(pattern.clone());
            params.push(pattern);
        }
        if let Some(date) = self.date {
            clauses.push("date = ?");
            params.push(date.format(DATE_FORMAT).to_string());
        }
        if let Some(status) = self.status {
            clauses.push("status = ?");
            params.push(status.as_str().to_string());
        }
        if let Some(from) = self.from {
            clauses.push("date >= ?");
            params.push(from.format(DATE_FORMAT).to_string());
        }
        if let Some(to) = self.to {
            clauses.push("date <= ?");
            params.push(to.format(DATE_FORMAT).to_string());
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let dir = self.direction.sql();
        let order = match self.sort {
            SortKey::Date => format!(" ORDER BY date {dir}, id {dir}"),
            SortKey::Name => format!(" ORDER BY LOWER(employeeName) {dir}, id {dir}"),
            SortKey::Status => format!(" ORDER BY status {dir}, date DESC, id DESC"),
        };
        sql.push_str(&order);

        (sql, params)
    }
}

pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

/// Converts raw column values into a record, rejecting unknown statuses.
pub(crate) fn record_from_row(
    id: i64,
    employee_name: String,
    employee_id: String,
    date: String,
    status: String,
) -> Result<AttendanceRecord, StoreError> {
    let status = status
        .parse::<Status>()
        .map_err(|e| StoreError::InvalidRow(format!("record {id}: {e}")))?;

    Ok(AttendanceRecord {
        id,
        employee_name,
        employee_id,
        date,
        status,
    })
}

/// Opens the configured driver, creates the table and seeds sample rows.
///
/// Blocking: MySQL connection attempts are retried with a sleep between them.
pub fn open_store(config: &Config) -> Result<Arc<dyn AttendanceStore>, StoreError> {
    let store: Arc<dyn AttendanceStore> = match config.driver {
        Driver::Sqlite => Arc::new(SqliteStore::open(&config.sqlite_path)?),
        #[cfg(feature = "mysql")]
        Driver::Mysql => Arc::new(MysqlStore::connect_with_retry(&config.mysql)?),
        #[cfg(not(feature = "mysql"))]
        Driver::Mysql => {
            return Err(StoreError::UnsupportedDriver(
                "mysql (rebuild with the `mysql` feature)".to_string(),
            ));
        }
    };

    store.init()?;
    info!("Attendance table ready");

    if config.seed_sample_data {
        let inserted = store.seed_if_empty()?;
        if inserted > 0 {
            info!("Inserted {inserted} sample records");
        }
    }

    Ok(store)
}
