use std::{env, fmt::Display, str::FromStr};

use log::{info, warn};

use crate::error::StoreError;

/// Which relational backend the store talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
    Mysql,
}

impl Driver {
    pub fn name(&self) -> &'static str {
        match self {
            Driver::Sqlite => "SQLite",
            Driver::Mysql => "MySQL",
        }
    }
}

impl FromStr for Driver {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "mysql" => Ok(Driver::Mysql),
            other => Err(StoreError::UnsupportedDriver(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MysqlConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub driver: Driver,
    pub sqlite_path: String,
    pub mysql: MysqlConfig,
    pub seed_sample_data: bool,
    pub body_limit_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid {key} value '{value}': {reason}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to
    /// the documented defaults for anything missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let driver_raw = try_load(&lookup, "DB_DRIVER", "sqlite");
        let driver = driver_raw.parse::<Driver>().map_err(|e| ConfigError {
            key: "DB_DRIVER".to_string(),
            value: driver_raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            port: parse(&lookup, "PORT", "5000")?,
            driver,
            sqlite_path: try_load(&lookup, "SQLITE_PATH", "attendance.db"),
            mysql: MysqlConfig {
                host: try_load(&lookup, "DB_HOST", "localhost"),
                user: try_load(&lookup, "DB_USER", "root"),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                database: try_load(&lookup, "DB_NAME", "attendance"),
                port: parse(&lookup, "DB_PORT", "3306")?,
            },
            seed_sample_data: parse(&lookup, "SEED_SAMPLE_DATA", "true")?,
            body_limit_bytes: parse(&lookup, "BODY_LIMIT_BYTES", "65536")?,
        })
    }
}

fn try_load<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = try_load(lookup, key, default);
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| {
        warn!("Invalid {key} value: {e}");
        ConfigError {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }
    })
}
