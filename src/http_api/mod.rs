use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::error::ScheduleError;
use crate::notify::{LogNotifier, Notifier};
use crate::organization::{Organization, ProjectId};
use crate::schedule::ChangeSet;
use crate::task::{Task, TaskEdit, TaskId};

/// Router state: the organization behind one write lock, and the project
/// this server exposes. Every mutating request holds the write lock for its
/// whole recompute.
#[derive(Clone)]
pub struct AppState {
    org: Arc<RwLock<Organization>>,
    project: ProjectId,
    notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(org: Organization, project: ProjectId) -> Self {
        Self::with_shared(Arc::new(RwLock::new(org)), project)
    }

    pub fn with_shared(org: Arc<RwLock<Organization>>, project: ProjectId) -> Self {
        Self {
            org,
            project,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn org(&self) -> Arc<RwLock<Organization>> {
        self.org.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        let message = value.to_string();
        match value {
            ScheduleError::UnknownTask(_) | ScheduleError::UnknownProject(_) => {
                ApiError::NotFound(message)
            }
            ScheduleError::InvalidDependency { .. } => ApiError::Conflict(message),
            ScheduleError::CalendarViolation { .. }
            | ScheduleError::DateOutOfRange(_)
            | ScheduleError::InvalidTask(_) => ApiError::Invalid(message),
            ScheduleError::NonConvergence { .. } | ScheduleError::Configuration(_) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

/// A task after a request, with what the request changed.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskChange {
    pub task: Task,
    pub changes: ChangeSet,
}

#[derive(Debug, Deserialize)]
struct CompletionPayload {
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct DependencyPayload {
    predecessor: TaskId,
    successor: TaskId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).patch(edit_task).delete(delete_task),
        )
        .route("/tasks/:id/completion", post(set_completion))
        .route(
            "/dependencies",
            post(add_dependency).delete(remove_dependency),
        )
        .route("/calendar", get(get_calendar).put(put_calendar))
        .route("/recompute", post(recompute))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let org = state.org();
    let guard = org.read();
    let tasks = guard.project(state.project)?.tasks().cloned().collect();
    Ok(Json(tasks))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    let org = state.org();
    let guard = org.read();
    let task = guard.project(state.project)?.task(task_id)?.clone();
    Ok(Json(task))
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<TaskChange>), ApiError> {
    let task_id = task.id;
    let org = state.org();
    let mut guard = org.write();
    if guard.project(state.project)?.find_task(task_id).is_some() {
        return Err(ApiError::Conflict(format!("task {task_id} already exists")));
    }
    let changes = guard.add_task(state.project, task)?;
    let task = guard.project(state.project)?.task(task_id)?.clone();
    Ok((StatusCode::CREATED, Json(TaskChange { task, changes })))
}

async fn edit_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(edit): Json<TaskEdit>,
) -> Result<Json<TaskChange>, ApiError> {
    let org = state.org();
    let mut guard = org.write();
    let changes = guard.on_task_edited(state.project, task_id, &edit)?;
    let task = guard.project(state.project)?.task(task_id)?.clone();
    Ok(Json(TaskChange { task, changes }))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<ChangeSet>, ApiError> {
    let org = state.org();
    let mut guard = org.write();
    if guard.project(state.project)?.find_task(task_id).is_none() {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(Json(guard.remove_task(state.project, task_id)?))
}

async fn set_completion(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(payload): Json<CompletionPayload>,
) -> Result<Json<TaskChange>, ApiError> {
    let org = state.org();
    let mut guard = org.write();
    let changes = guard.on_completion_date_set(
        state.project,
        task_id,
        payload.date,
        state.notifier.as_ref(),
    )?;
    let task = guard.project(state.project)?.task(task_id)?.clone();
    Ok(Json(TaskChange { task, changes }))
}

async fn add_dependency(
    State(state): State<AppState>,
    Json(payload): Json<DependencyPayload>,
) -> Result<(StatusCode, Json<ChangeSet>), ApiError> {
    let org = state.org();
    let mut guard = org.write();
    let changes = guard.add_dependency(state.project, payload.predecessor, payload.successor)?;
    Ok((StatusCode::CREATED, Json(changes)))
}

async fn remove_dependency(
    State(state): State<AppState>,
    Json(payload): Json<DependencyPayload>,
) -> Result<Json<ChangeSet>, ApiError> {
    let org = state.org();
    let mut guard = org.write();
    let changes = guard.remove_dependency(state.project, payload.predecessor, payload.successor)?;
    Ok(Json(changes))
}

async fn get_calendar(State(state): State<AppState>) -> Result<Json<WorkCalendarConfig>, ApiError> {
    let org = state.org();
    let guard = org.read();
    let calendar = guard.calendar_for(state.project)?;
    Ok(Json(calendar.to_config()))
}

/// Replaces the project's calendar; every project sharing it is recomputed.
async fn put_calendar(
    State(state): State<AppState>,
    Json(config): Json<WorkCalendarConfig>,
) -> Result<Json<ChangeSet>, ApiError> {
    let calendar = WorkCalendar::from_config(&config)?;
    let org = state.org();
    let mut guard = org.write();
    let calendar_id = guard.project(state.project)?.metadata().calendar_id;
    let mut results = guard.on_calendar_changed(calendar_id, calendar)?;
    Ok(Json(results.remove(&state.project).unwrap_or_default()))
}

async fn recompute(State(state): State<AppState>) -> Result<Json<ChangeSet>, ApiError> {
    let org = state.org();
    let mut guard = org.write();
    Ok(Json(guard.recompute(state.project)?))
}
