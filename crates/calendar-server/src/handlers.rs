//! HTTP handlers for the event endpoints.
//!
//! Each handler validates its input, makes exactly one store call and
//! renders `{"result": ...}` on success. Failures go through [`ApiError`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use calendar_core::{Event, UserId};
use calendar_store::EventStore;
use calendar_telemetry::{PrometheusHandle, EVENTS_STORED};
use metrics::gauge;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::range::{self, RangeWidth};

/// Shared state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: EventStore,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(store: EventStore, metrics: PrometheusHandle) -> Self {
        Self { store, metrics }
    }
}

/// Body of `/create_event` and `/update_event`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub user_id: i64,
    pub date: String,
    pub title: String,
    #[serde(rename = "event")]
    pub text: String,
}

impl EventRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_user(self.user_id)?;
        require_text("date", &self.date)?;
        require_text("title", &self.title)?;
        require_text("event", &self.text)
    }
}

/// Body of `/delete_event`.
#[derive(Debug, Deserialize)]
pub struct DeleteEventRequest {
    pub user_id: i64,
    pub date: String,
}

impl DeleteEventRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_user(self.user_id)?;
        require_text("date", &self.date)
    }
}

/// Query string of the `/events_for_*` lookups.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub user_id: Option<String>,
    pub date: Option<String>,
}

fn require_user(user_id: i64) -> Result<(), ApiError> {
    if user_id == 0 {
        return Err(ApiError::InvalidRequest("field `user_id` is required".into()));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::InvalidRequest(format!("field `{field}` is required")));
    }
    Ok(())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    request.validate()?;
    let date = range::parse_day(&request.date)?;

    state
        .store
        .create(Event::new(request.user_id, date, request.title, request.text));

    Ok(Json(json!({ "result": "event created" })))
}

pub async fn update_event(
    State(state): State<AppState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    request.validate()?;
    let date = range::parse_day(&request.date)?;

    state
        .store
        .update(UserId::new(request.user_id), date, request.title, request.text)?;

    Ok(Json(json!({ "result": "event updated" })))
}

pub async fn delete_event(
    State(state): State<AppState>,
    payload: Result<Json<DeleteEventRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    request.validate()?;
    let date = range::parse_day(&request.date)?;

    state.store.delete(UserId::new(request.user_id), date)?;

    Ok(Json(json!({ "result": "event deleted" })))
}

pub async fn events_for_day(
    state: State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    events_in_range(state, query, RangeWidth::Day)
}

pub async fn events_for_week(
    state: State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    events_in_range(state, query, RangeWidth::Week)
}

pub async fn events_for_month(
    state: State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    events_in_range(state, query, RangeWidth::Month)
}

fn events_in_range(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
    width: RangeWidth,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = query.map_err(|r| ApiError::InvalidRequest(r.body_text()))?;

    let raw_user = params.user_id.unwrap_or_default();
    let user_id: UserId = raw_user
        .parse()
        .map_err(|e| ApiError::InvalidUserId(format!("{raw_user:?}: {e}")))?;
    let start = range::parse_day(params.date.as_deref().unwrap_or_default())?;
    let (start, end) = width.bounds(start)?;

    let events = state.store.query_range(user_id, start, end);
    Ok(Json(json!({ "result": events })))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let stats = state.store.stats();
    Json(json!({
        "status": "healthy",
        "users": stats.users,
        "events": stats.events,
    }))
}

/// Prometheus scrape endpoint. Refreshes the stored-events gauge first.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    gauge!(EVENTS_STORED).set(state.store.stats().events as f64);

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
