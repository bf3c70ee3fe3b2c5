//! Integration tests for the REST API, driven through the router in-process

use std::sync::Arc;

use attendance::{AttendanceStore, SqliteStore, app::router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Local};
use serde_json::{Value, json};
use tower::ServiceExt;

fn seeded_app() -> Router {
    let store = SqliteStore::open_in_memory().unwrap();
    store.init().unwrap();
    store.seed_if_empty().unwrap();
    router(Arc::new(store), 64 * 1024)
}

fn empty_app() -> Router {
    let store = SqliteStore::open_in_memory().unwrap();
    store.init().unwrap();
    router(Arc::new(store), 64 * 1024)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec(), disposition)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::delete(uri).body(Body::empty()).unwrap();
    let (status, body, _) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn names(records: &Value) -> Vec<&str> {
    records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["employeeName"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_create_then_list() {
    let app = empty_app();

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "employeeName": "Jane Doe",
            "employeeID": "EMP-100",
            "date": "2024-02-01",
            "status": "Present"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Attendance recorded successfully");
    let id = body["id"].as_i64().unwrap();

    let (status, records) = get_json(&app, "/api/attendance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["id"], id);
    assert_eq!(records[0]["employeeID"], "EMP-100");
    assert_eq!(records[0]["date"], "2024-02-01");
    assert_eq!(records[0]["status"], "Present");
}

#[tokio::test]
async fn test_create_requires_all_fields() {
    let app = empty_app();

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({ "employeeName": "Jane Doe", "date": "2024-02-01", "status": "Present" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");
}

#[tokio::test]
async fn test_create_rejects_future_dates() {
    let app = empty_app();
    let tomorrow = (Local::now().date_naive() + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "employeeName": "Jane Doe",
            "employeeID": "EMP-100",
            "date": tomorrow,
            "status": "Present"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot select future date");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = empty_app();
    let request = Request::post("/api/attendance")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_json_body_is_a_bad_request() {
    let app = empty_app();

    let request = Request::post("/api/attendance")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("employeeName=Jane"))
        .unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "All fields are required");

    let request = Request::post("/api/attendance").body(Body::empty()).unwrap();
    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "All fields are required");
}

#[tokio::test]
async fn test_wrongly_typed_field_is_a_bad_request() {
    let app = empty_app();

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "employeeName": "Jane Doe",
            "employeeID": "EMP-100",
            "date": "2024-02-01",
            "status": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All fields are required");

    let (_, records) = get_json(&app, "/api/attendance").await;
    assert!(records.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_filters_and_sorts() {
    let app = seeded_app();

    let (_, records) = get_json(&app, "/api/attendance?status=Absent").await;
    assert_eq!(names(&records), vec!["Mike Wilson"]);

    let (_, records) = get_json(&app, "/api/attendance?sort=name&direction=asc").await;
    assert_eq!(
        names(&records),
        vec!["John Smith", "Mike Wilson", "Sarah Johnson"]
    );

    let (_, records) = get_json(&app, "/api/attendance?search=emp002&status=").await;
    assert_eq!(names(&records), vec!["Sarah Johnson"]);

    let (_, records) = get_json(&app, "/api/attendance?date=2024-01-16").await;
    assert!(records.as_array().unwrap().is_empty());

    let (status, body) = get_json(&app, "/api/attendance?status=Late").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Present or Absent"));
}

#[tokio::test]
async fn test_search() {
    let app = seeded_app();

    let (status, records) = get_json(&app, "/api/attendance/search?query=john").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&records).len(), 2);

    let (status, body) = get_json(&app, "/api/attendance/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search query required");

    let (status, _) = get_json(&app, "/api/attendance/search?query=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let app = seeded_app();

    let (status, stats) = get_json(&app, "/api/attendance/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["present"], 2);
    assert_eq!(stats["absent"], 1);
    assert_eq!(stats["attendanceRate"], 66.7);

    let (_, stats) = get_json(&app, "/api/attendance/stats?status=Absent").await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["attendanceRate"], 0.0);
}

#[tokio::test]
async fn test_delete() {
    let app = seeded_app();
    let (_, records) = get_json(&app, "/api/attendance").await;
    let id = records[0]["id"].as_i64().unwrap();

    let (status, body) = delete(&app, &format!("/api/attendance/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Record deleted successfully");

    let (status, body) = delete(&app, &format!("/api/attendance/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Record not found");

    let (status, _) = delete(&app, "/api/attendance/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, records) = get_json(&app, "/api/attendance").await;
    assert_eq!(records.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_export_csv() {
    let app = seeded_app();
    let request = Request::get("/api/attendance/export?startDate=2024-01-01&endDate=2024-01-31&format=csv")
        .body(Body::empty())
        .unwrap();

    let (status, body, disposition) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        disposition.as_deref(),
        Some("attachment; filename=\"attendance_2024-01-01_to_2024-01-31.csv\"")
    );

    let csv = String::from_utf8(body).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Employee Name,Employee ID,Date,Status"));
    assert_eq!(lines.count(), 3);
}

#[tokio::test]
async fn test_export_pdf_is_default() {
    let app = seeded_app();
    let request = Request::get("/api/attendance/export?startDate=2024-01-15&endDate=2024-01-15")
        .body(Body::empty())
        .unwrap();

    let (status, body, disposition) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"%PDF"));
    assert!(disposition.unwrap().contains("attendance_report_2024-01-15_to_2024-01-15.pdf"));
}

#[tokio::test]
async fn test_export_json_and_word() {
    let app = seeded_app();

    let (status, report) =
        get_json(&app, "/api/attendance/export?startDate=2024-01-01&endDate=2024-01-31&format=json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["reportInfo"]["totalRecords"], 3);
    assert_eq!(report["reportInfo"]["dateRange"], "2024-01-01 to 2024-01-31");

    let request = Request::get("/api/attendance/export?startDate=2024-01-01&endDate=2024-01-31&format=word")
        .body(Body::empty())
        .unwrap();
    let (status, body, disposition) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(disposition.unwrap().ends_with(".doc\""));
    assert!(String::from_utf8(body).unwrap().contains("<strong>Present:</strong> 2"));
}

#[tokio::test]
async fn test_export_errors() {
    let app = seeded_app();

    let (status, body) = get_json(&app, "/api/attendance/export?format=csv").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please select a start date");

    let (status, body) =
        get_json(&app, "/api/attendance/export?startDate=2023-01-01&endDate=2023-12-31").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No records found for the selected date range");

    let (status, _) =
        get_json(&app, "/api/attendance/export?startDate=2024-02-01&endDate=2024-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) =
        get_json(&app, "/api/attendance/export?startDate=2024-01-01&format=txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("txt"));
}

#[tokio::test]
async fn test_health() {
    let app = seeded_app();

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "SQLite");
    assert_eq!(body["records"], 3);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.init().unwrap();
    let app = router(Arc::new(store), 16);

    let payload = json!({
        "employeeName": "A very long employee name",
        "employeeID": "EMP-1",
        "date": "2024-01-01",
        "status": "Present"
    })
    .to_string();
    let request = Request::post("/api/attendance")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();

    let (status, body, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].is_string());
}
