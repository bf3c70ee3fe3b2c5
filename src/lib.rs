/*!
# Attendance Tracker

A small HR attendance service built in Rust.

## Overview

Attendance records (employee name, employee ID, date, status) are posted by a
web form to a REST API and kept in a single relational table. A dashboard
lists, filters, searches and deletes records, and a report exporter renders a
date range of records as PDF, Word, CSV, JSON or XLSX.

## Architecture

### HTTP Layer
- **Technologies**: Rust, axum, tokio
- Route handlers validate input and translate errors to JSON bodies
- Store calls run on the blocking thread pool

### Persistence Layer
- One `Attendance` table created on startup
- SQLite (rusqlite) by default, MySQL behind the `mysql` cargo feature
- Both drivers share the same parameterized statements

### Reports
- PDF via printpdf, Word as an HTML document rendered with handlebars
- CSV and JSON written directly, XLSX via rust_xlsxwriter

## Modules

- **config**: Environment-driven configuration
- **error**: Error types and their HTTP mapping
- **record**: Record types, form validation and summary statistics
- **store**: Storage trait and the SQLite/MySQL drivers
- **handlers**: Route handlers
- **downloader**: Export formats (CSV, JSON, XLSX) and dispatch
- **report**: Printable PDF and Word reports
- **app**: Routing, middleware and server lifecycle

## REST API Endpoints

- `POST /api/attendance` - Record attendance
- `GET /api/attendance` - List records (`search`, `date`, `status`, `from`, `to`, `sort`, `direction`)
- `GET /api/attendance/search?query=` - Search by employee name or ID
- `GET /api/attendance/stats` - Totals and attendance rate for the same filters
- `GET /api/attendance/export?startDate=&endDate=&format=` - Download a report
- `DELETE /api/attendance/{id}` - Remove a record
- `GET /api/health` - Liveness and database check
*/

pub mod app;
pub mod config;
pub mod downloader;
pub mod error;
pub mod handlers;
pub mod record;
pub mod report;
pub mod store;

pub use error::{AppError, StoreError};
pub use record::{AttendanceRecord, NewRecord, NewRecordForm, Status, Summary};
pub use store::{AttendanceStore, RecordQuery, SqliteStore};
