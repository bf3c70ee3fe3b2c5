use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Calendar dates are exchanged and stored as `YYYY-MM-DD` text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

lazy_static! {
    static ref EMPLOYEE_ID: Regex = Regex::new(r"^[A-Za-z0-9-]+$").unwrap();
}

/// Attendance status of an employee on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "Present",
            Status::Absent => "Absent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            _ => Err(format!("Status must be Present or Absent, got '{}'", s)),
        }
    }
}

/// A stored row of the `Attendance` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    #[serde(rename = "employeeName")]
    pub employee_name: String,
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    pub date: String,
    pub status: Status,
}

/// Payload posted by the attendance form.
///
/// Every field is optional on the wire so that a missing field is reported
/// as a validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRecordForm {
    #[serde(rename = "employeeName")]
    pub employee_name: Option<String>,
    #[serde(rename = "employeeID")]
    pub employee_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// A validated record ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub employee_name: String,
    pub employee_id: String,
    pub date: NaiveDate,
    pub status: Status,
}

impl NewRecord {
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

impl NewRecordForm {
    /// Checks the form against today's local date.
    pub fn validate(self) -> Result<NewRecord, AppError> {
        self.validate_on(Local::now().date_naive())
    }

    /// Checks the form, rejecting dates after `today`.
    pub fn validate_on(self, today: NaiveDate) -> Result<NewRecord, AppError> {
        let non_blank = |field: Option<String>| field.filter(|v| !v.trim().is_empty());

        let (Some(name), Some(id), Some(date), Some(status)) = (
            non_blank(self.employee_name),
            non_blank(self.employee_id),
            non_blank(self.date),
            non_blank(self.status),
        ) else {
            return Err(AppError::bad_request("All fields are required"));
        };

        let name = name.trim().to_string();
        if name.chars().count() < 2 {
            return Err(AppError::bad_request("Name must be at least 2 characters"));
        }

        let id = id.trim().to_string();
        if !EMPLOYEE_ID.is_match(&id) {
            return Err(AppError::bad_request(
                "ID can only contain letters, numbers, and hyphens",
            ));
        }

        let date = parse_date(&date)?;
        if date > today {
            return Err(AppError::bad_request("Cannot select future date"));
        }

        let status = status.parse::<Status>().map_err(AppError::BadRequest)?;

        Ok(NewRecord {
            employee_name: name,
            employee_id: id,
            date,
            status,
        })
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::bad_request(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Headline numbers shown above the dashboard table and in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    /// Percentage of present records, rounded to one decimal.
    #[serde(rename = "attendanceRate")]
    pub attendance_rate: f64,
}

impl Summary {
    pub fn of(records: &[AttendanceRecord]) -> Self {
        let total = records.len();
        let present = records
            .iter()
            .filter(|r| r.status == Status::Present)
            .count();
        let absent = records
            .iter()
            .filter(|r| r.status == Status::Absent)
            .count();

        let attendance_rate = if total > 0 {
            (present as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Summary {
            total,
            present,
            absent,
            attendance_rate,
        }
    }

    pub fn rate_label(&self) -> String {
        format!("{:.1}%", self.attendance_rate)
    }
}
