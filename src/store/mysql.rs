use std::thread;
use std::time::Duration;

use ::mysql::prelude::Queryable;
use ::mysql::{OptsBuilder, Params, Pool, PooledConn, Value};
use log::{error, info};

use super::{
    AttendanceStore, COUNT_SQL, DELETE_SQL, INSERT_SQL, RecordQuery, SAMPLE_RECORDS, SEARCH_SQL,
    like_pattern, record_from_row,
};
use crate::config::{Driver, MysqlConfig};
use crate::error::StoreError;
use crate::record::{AttendanceRecord, NewRecord};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS Attendance (
    id INT AUTO_INCREMENT PRIMARY KEY,
    employeeName VARCHAR(255) NOT NULL,
    employeeID VARCHAR(100) NOT NULL,
    date VARCHAR(100) NOT NULL,
    status VARCHAR(50) NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const CONNECT_ATTEMPTS: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(5);

type Row = (i64, String, String, String, String);

/// MySQL-backed store over a connection pool.
pub struct MysqlStore {
    pool: Pool,
}

impl MysqlStore {
    pub fn connect(config: &MysqlConfig) -> Result<Self, StoreError> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.database.clone()));

        let pool = Pool::new(opts)?;
        // Fail fast if the server is unreachable rather than on first request.
        pool.get_conn()?;

        info!(
            "Connected to MySQL database {} on {}:{}",
            config.database, config.host, config.port
        );
        Ok(MysqlStore { pool })
    }

    /// Keeps trying to reach the server, sleeping between attempts.
    pub fn connect_with_retry(config: &MysqlConfig) -> Result<Self, StoreError> {
        let mut attempt = 1;
        loop {
            match Self::connect(config) {
                Ok(store) => return Ok(store),
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    error!(
                        "Error connecting to MySQL (attempt {attempt}/{CONNECT_ATTEMPTS}): {e}; retrying in {}s",
                        RETRY_DELAY.as_secs()
                    );
                    thread::sleep(RETRY_DELAY);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn conn(&self) -> Result<PooledConn, StoreError> {
        Ok(self.pool.get_conn()?)
    }

    fn query_records(&self, sql: &str, params: Vec<String>) -> Result<Vec<AttendanceRecord>, StoreError> {
        let params = if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.into_iter().map(Value::from).collect())
        };

        let rows: Vec<Row> = self.conn()?.exec(sql, params)?;
        rows.into_iter()
            .map(|(id, name, employee_id, date, status)| {
                record_from_row(id, name, employee_id, date, status)
            })
            .collect()
    }
}

impl AttendanceStore for MysqlStore {
    fn driver(&self) -> Driver {
        Driver::Mysql
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn()?.query_drop(CREATE_TABLE_SQL)?;
        Ok(())
    }

    fn insert(&self, record: &NewRecord) -> Result<i64, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(
            INSERT_SQL,
            (
                record.employee_name.as_str(),
                record.employee_id.as_str(),
                record.date_string(),
                record.status.as_str(),
            ),
        )?;
        Ok(conn.last_insert_id() as i64)
    }

    fn list(&self, query: &RecordQuery) -> Result<Vec<AttendanceRecord>, StoreError> {
        let (sql, params) = query.to_sql();
        self.query_records(&sql, params)
    }

    fn search(&self, term: &str) -> Result<Vec<AttendanceRecord>, StoreError> {
        let pattern = like_pattern(term);
        self.query_records(SEARCH_SQL, vec![pattern.clone(), pattern])
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        conn.exec_drop(DELETE_SQL, (id,))?;
        Ok(conn.affected_rows() > 0)
    }

    fn count(&self) -> Result<i64, StoreError> {
        let count: Option<i64> = self.conn()?.query_first(COUNT_SQL)?;
        Ok(count.unwrap_or(0))
    }

    fn seed_if_empty(&self) -> Result<usize, StoreError> {
        if self.count()? > 0 {
            return Ok(0);
        }

        self.conn()?.exec_batch(
            INSERT_SQL,
            SAMPLE_RECORDS
                .iter()
                .map(|(name, employee_id, date, status)| (*name, *employee_id, *date, status.as_str())),
        )?;
        Ok(SAMPLE_RECORDS.len())
    }
}
