//! Endpoints that queue background tasks.
//!
//! Each one queues a `background` task carrying the posted message and echoes
//! the body back without waiting for the task to run.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::tasks::{seconds_from_now, TaskKind, TaskRequest};
use crate::AppState;

/// Expiry applied to tasks queued through `/tasks/schedule`
pub const SCHEDULED_TASK_EXPIRY_SECS: i64 = 3600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CountdownQuery {
    pub countdown: i64,
}

/// Longest accepted start delay for queued tasks (one year)
pub const MAX_TASK_DELAY_SECS: i64 = 365 * 24 * 60 * 60;

fn check_delay(field: &str, seconds: i64) -> Result<(), ApiError> {
    if !(0..=MAX_TASK_DELAY_SECS).contains(&seconds) {
        return Err(ApiError::validation_field(
            field,
            format!("Must be between 0 and {} seconds", MAX_TASK_DELAY_SECS),
        ));
    }
    Ok(())
}

fn out_of_range(field: &str) -> ApiError {
    ApiError::validation_field(field, "Start time is out of range")
}

/// POST /tasks/countdown?countdown=N
pub async fn countdown(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CountdownQuery>,
    Json(body): Json<TaskMessage>,
) -> Result<Json<TaskMessage>, ApiError> {
    check_delay("countdown", query.countdown)?;

    let request = TaskRequest::countdown(TaskKind::Background, body.message.clone(), query.countdown)
        .ok_or_else(|| out_of_range("countdown"))?;
    state.tasks.dispatch(request)?;

    Ok(Json(body))
}

/// POST /tasks/eta/:time_delta
pub async fn eta(
    State(state): State<Arc<AppState>>,
    Path(time_delta): Path<i64>,
    Json(body): Json<TaskMessage>,
) -> Result<Json<TaskMessage>, ApiError> {
    check_delay("time_delta", time_delta)?;

    let at = seconds_from_now(time_delta).ok_or_else(|| out_of_range("time_delta"))?;
    state
        .tasks
        .dispatch(TaskRequest::eta(TaskKind::Background, body.message.clone(), at))?;

    Ok(Json(body))
}

/// POST /tasks/schedule
pub async fn schedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TaskMessage>,
) -> Result<Json<TaskMessage>, ApiError> {
    let request = TaskRequest::now(TaskKind::Background, body.message.clone())
        .expires_in(SCHEDULED_TASK_EXPIRY_SECS)
        .ok_or_else(|| ApiError::internal("Task expiry is out of range"))?;
    state.tasks.dispatch(request)?;

    Ok(Json(body))
}
