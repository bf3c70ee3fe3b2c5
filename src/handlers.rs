use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{Local, NaiveDate, Utc};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::downloader::{self, ExportFormat};
use crate::error::{AppError, StoreError};
use crate::record::{AttendanceRecord, NewRecordForm, Status, Summary, parse_date};
use crate::report::ReportContext;
use crate::store::{AttendanceStore, RecordQuery, SortDirection, SortKey};

pub struct AppState {
    pub store: Arc<dyn AttendanceStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn AttendanceStore>) -> Arc<Self> {
        Arc::new(AppState { store })
    }

    /// Runs a store operation on the blocking thread pool.
    async fn with_store<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&dyn AttendanceStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        Ok(tokio::task::spawn_blocking(move || op(store.as_ref())).await??)
    }
}

/// Dashboard filters, as sent by the browser. Empty strings mean "any".
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    search: Option<String>,
    date: Option<String>,
    status: Option<String>,
    from: Option<String>,
    to: Option<String>,
    sort: Option<String>,
    direction: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_date(value: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    non_empty(value).map(|v| parse_date(&v)).transpose()
}

impl TryFrom<ListParams> for RecordQuery {
    type Error = AppError;

    fn try_from(params: ListParams) -> Result<Self, Self::Error> {
        let status = non_empty(params.status)
            .map(|s| s.parse::<Status>())
            .transpose()
            .map_err(AppError::BadRequest)?;

        let sort = match non_empty(params.sort).as_deref() {
            None | Some("date") => SortKey::Date,
            Some("name") => SortKey::Name,
            Some("status") => SortKey::Status,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "Unknown sort key '{other}', expected date, name or status"
                )));
            }
        };

        let direction = match non_empty(params.direction).as_deref() {
            None | Some("desc") => SortDirection::Desc,
            Some("asc") => SortDirection::Asc,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "Unknown sort direction '{other}', expected asc or desc"
                )));
            }
        };

        Ok(RecordQuery {
            search: non_empty(params.search),
            date: optional_date(params.date)?,
            status,
            from: optional_date(params.from)?,
            to: optional_date(params.to)?,
            sort,
            direction,
        })
    }
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(p)| p)
        .map_err(AppError::from)
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewRecordForm>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(form) = payload?;
    let record = form.validate()?;

    let id = state.with_store(move |store| store.insert(&record)).await?;
    info!("Recorded attendance #{id}");

    Ok(Json(json!({
        "message": "Attendance recorded successfully",
        "id": id,
    })))
}

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let query = RecordQuery::try_from(query_params(params)?)?;
    let records = state.with_store(move |store| store.list(&query)).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

pub async fn search_records(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let term = non_empty(query_params(params)?.query)
        .ok_or_else(|| AppError::bad_request("Search query required"))?;

    let records = state.with_store(move |store| store.search(&term)).await?;
    Ok(Json(records))
}

pub async fn record_stats(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Summary>, AppError> {
    let query = RecordQuery::try_from(query_params(params)?)?;
    let records = state.with_store(move |store| store.list(&query)).await?;
    Ok(Json(Summary::of(&records)))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    // A non-numeric id can't match any row.
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::not_found("Record not found"))?;

    let deleted = state.with_store(move |store| store.delete(id)).await?;
    if !deleted {
        return Err(AppError::not_found("Record not found"));
    }

    info!("Deleted attendance #{id}");
    Ok(Json(json!({ "message": "Record deleted successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
    format: Option<String>,
}

pub async fn export_records(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let params = query_params(params)?;

    let start = optional_date(params.start_date)?
        .ok_or_else(|| AppError::bad_request("Please select a start date"))?;
    let end = optional_date(params.end_date)?.unwrap_or_else(|| Local::now().date_naive());
    if start > end {
        return Err(AppError::bad_request("Start date must not be after end date"));
    }

    let format = params
        .format
        .as_deref()
        .unwrap_or("pdf")
        .parse::<ExportFormat>()
        .map_err(AppError::BadRequest)?;

    let records = state
        .with_store(move |store| store.list(&RecordQuery::between(start, end)))
        .await?;
    if records.is_empty() {
        return Err(AppError::not_found(
            "No records found for the selected date range",
        ));
    }

    let ctx = ReportContext::new(start, end, records);
    let filename = format.filename(&ctx.start_str(), &ctx.end_str());
    let count = ctx.records.len();

    let bytes = tokio::task::spawn_blocking(move || {
        downloader::render(format, &ctx).map_err(|e| AppError::Report(e.to_string()))
    })
    .await??;

    info!("Exported {count} records as {filename}");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let database = state.store.driver().name();
    let records = state.with_store(|store| store.count()).await?;

    Ok(Json(json!({
        "status": "OK",
        "message": format!("Server is running with {database}"),
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
        "records": records,
    })))
}
