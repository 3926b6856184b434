#![cfg(feature = "http_api")]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use chrono::NaiveDate;
use project_scheduler::{
    ChangeSet, Organization, RecordingNotifier, ScheduleMetadata, Task, WorkCalendar,
    WorkCalendarConfig, http_api,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn new_router_with(notifier: Arc<RecordingNotifier>) -> axum::Router {
    let mut org = Organization::new("Acme");
    let cal = org.add_calendar(WorkCalendar::default());
    let project = org.create_project(ScheduleMetadata::named("HTTP").with_calendar(cal));
    let state = http_api::AppState::new(org, project).with_notifier(notifier);
    http_api::router(state)
}

fn new_router() -> axum::Router {
    new_router_with(Arc::new(RecordingNotifier::new()))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seed_chain(app: &axum::Router) {
    let first = Task::first(1, "Design", 2, d(2024, 1, 1));
    let second = Task::new(2, "Build", 3).with_assignee("kim@example.com");
    for task in [first, second] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/tasks", serde_json::to_value(&task).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/dependencies",
            json!({ "predecessor": 1, "successor": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = new_router();
    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn task_lifecycle_via_http_api() {
    let app = new_router();
    seed_chain(&app).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let build: Task = read_json(response).await;
    assert_eq!(build.date_start, Some(d(2024, 1, 3)));
    assert_eq!(build.date_end, Some(d(2024, 1, 5)));

    let response = app
        .clone()
        .oneshot(json_request("PATCH", "/tasks/1", json!({ "planned_duration": 3 })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["task"]["date_end"], "2024-01-03");
    assert_eq!(body["changes"]["changed"], json!([1, 2]));

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/tasks/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/tasks/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "not_found");

    let response = app
        .oneshot(empty_request("GET", "/tasks"))
        .await
        .unwrap();
    let tasks: Vec<Task> = read_json(response).await;
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn duplicate_task_and_cycle_conflict() {
    let app = new_router();
    seed_chain(&app).await;

    let duplicate = Task::new(2, "Again", 1);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks", serde_json::to_value(&duplicate).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/tasks",
            serde_json::to_value(Task::new(3, "Test", 1).depends_on([2])).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/dependencies",
            json!({ "predecessor": 3, "successor": 2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn completion_notifies_and_rejects_weekends() {
    let notifier = Arc::new(RecordingNotifier::new());
    let app = new_router_with(notifier.clone());
    seed_chain(&app).await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/tasks/1/completion", json!({ "date": "2024-01-06" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(json_request("POST", "/tasks/1/completion", json!({ "date": "2024-01-03" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["task"]["task_delay"], 1);
    assert_eq!(body["changes"]["unblocked"], json!([2]));

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].assignee.as_deref(), Some("kim@example.com"));
}

#[tokio::test]
async fn calendar_update_recomputes_project() {
    let app = new_router();
    seed_chain(&app).await;

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/calendar"))
        .await
        .unwrap();
    let config: WorkCalendarConfig = read_json(response).await;
    assert!(config.holidays().is_empty());

    let mut calendar = WorkCalendar::from_config(&config).unwrap();
    calendar.add_holiday(d(2024, 1, 1));
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/calendar",
            serde_json::to_value(calendar.to_config()).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let changes: ChangeSet = read_json(response).await;
    assert_eq!(changes.rolled_anchors.len(), 1);
    assert_eq!(changes.rolled_anchors[0].to, d(2024, 1, 2));

    let response = app
        .oneshot(empty_request("GET", "/tasks/2"))
        .await
        .unwrap();
    let build: Task = read_json(response).await;
    assert_eq!(build.date_start, Some(d(2024, 1, 4)));
}

#[tokio::test]
async fn recompute_on_settled_project_changes_nothing() {
    let app = new_router();
    seed_chain(&app).await;
    let response = app
        .oneshot(empty_request("POST", "/recompute"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let changes: ChangeSet = read_json(response).await;
    assert!(changes.is_empty());
}
