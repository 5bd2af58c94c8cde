//! In-process background task queue.
//!
//! Handlers hand a [`TaskRequest`] to the [`TaskDispatcher`] and return right
//! away. The [`TaskWorker`] drains the queue, waits for each task's start time,
//! drops tasks whose expiry has passed and runs the rest. Task failures are
//! logged and never reach the request that queued them.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::metrics::TASKS_TOTAL;
use crate::config::BeatEntry;

/// Named tasks known to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Log a message on the default queue
    Background,
    HighPriority,
    LowPriority,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Background => "background",
            TaskKind::HighPriority => "high_priority",
            TaskKind::LowPriority => "low_priority",
        }
    }

    pub fn queue(&self) -> &'static str {
        match self {
            TaskKind::Background => "default",
            TaskKind::HighPriority => "high_priority",
            TaskKind::LowPriority => "low_priority",
        }
    }
}

impl FromStr for TaskKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "background" => Ok(TaskKind::Background),
            "high_priority" => Ok(TaskKind::HighPriority),
            "low_priority" => Ok(TaskKind::LowPriority),
            other => Err(DispatchError::UnknownTask(other.to_string())),
        }
    }
}

/// One unit of queued work
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub message: Option<String>,
    /// Do not start before this instant
    pub run_at: Option<DateTime<Utc>>,
    /// Discard instead of running once this instant has passed
    pub expires_at: Option<DateTime<Utc>>,
}

impl TaskRequest {
    pub fn now(kind: TaskKind, message: Option<String>) -> Self {
        Self {
            kind,
            message,
            run_at: None,
            expires_at: None,
        }
    }

    /// Start `seconds` from now. `None` if that instant is not representable.
    pub fn countdown(kind: TaskKind, message: Option<String>, seconds: i64) -> Option<Self> {
        seconds_from_now(seconds).map(|at| Self::eta(kind, message, at))
    }

    /// Start at an absolute time
    pub fn eta(kind: TaskKind, message: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            run_at: Some(at),
            ..Self::now(kind, message)
        }
    }

    /// Discard the task if it has not run `seconds` from now.
    /// `None` if that instant is not representable.
    pub fn expires_in(mut self, seconds: i64) -> Option<Self> {
        self.expires_at = Some(seconds_from_now(seconds)?);
        Some(self)
    }

    fn delay(&self, now: DateTime<Utc>) -> std::time::Duration {
        self.run_at
            .and_then(|at| (at - now).to_std().ok())
            .unwrap_or_default()
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now > at)
    }
}

/// `now + seconds`, or `None` when the offset or the result overflows.
pub fn seconds_from_now(seconds: i64) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(Duration::try_seconds(seconds)?)
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Task queue is full")]
    QueueFull,

    #[error("Task worker is not running")]
    WorkerStopped,

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

/// Sending half of the task queue; cheap to clone into handlers.
#[derive(Debug, Clone)]
pub struct TaskDispatcher {
    tx: mpsc::Sender<TaskRequest>,
}

impl TaskDispatcher {
    /// Create a dispatcher and the worker that serves it.
    pub fn channel(capacity: usize) -> (Self, TaskWorker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, TaskWorker { rx })
    }

    /// Queue `request` without waiting for it to start or finish.
    pub fn dispatch(&self, request: TaskRequest) -> Result<(), DispatchError> {
        let kind = request.kind;
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::WorkerStopped,
        })?;
        counter!(TASKS_TOTAL, "task" => kind.as_str(), "status" => "queued").increment(1);
        tracing::debug!(task = kind.as_str(), "Task queued");
        Ok(())
    }
}

pub struct TaskWorker {
    rx: mpsc::Receiver<TaskRequest>,
}

impl TaskWorker {
    pub async fn run(mut self) {
        tracing::info!("Task worker started");

        while let Some(request) = self.rx.recv().await {
            tokio::spawn(async move {
                let delay = request.delay(Utc::now());
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                if request.is_expired(Utc::now()) {
                    counter!(TASKS_TOTAL, "task" => request.kind.as_str(), "status" => "expired")
                        .increment(1);
                    tracing::warn!(task = request.kind.as_str(), "Task expired before it could run");
                    return;
                }

                execute(&request);
                counter!(TASKS_TOTAL, "task" => request.kind.as_str(), "status" => "done")
                    .increment(1);
            });
        }

        tracing::info!("Task worker stopped");
    }
}

fn execute(request: &TaskRequest) {
    let message = request.message.as_deref().unwrap_or("");
    match request.kind {
        TaskKind::Background => {
            tracing::info!(queue = request.kind.queue(), message = message, "Background task called");
        }
        TaskKind::HighPriority => {
            tracing::info!(queue = request.kind.queue(), message = message, "Running high priority task");
        }
        TaskKind::LowPriority => {
            tracing::info!(queue = request.kind.queue(), "Running low priority task");
        }
    }
}

/// Dispatch each configured periodic task on its own interval.
///
/// Entries naming an unknown task or a zero interval are skipped with a warning.
pub fn spawn_beat(dispatcher: TaskDispatcher, entries: &[BeatEntry]) {
    for entry in entries {
        let kind = match TaskKind::from_str(&entry.task) {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping periodic task");
                continue;
            }
        };
        if entry.interval_seconds == 0 {
            tracing::warn!(task = %entry.task, "Skipping periodic task with zero interval");
            continue;
        }

        let dispatcher = dispatcher.clone();
        let message = entry.message.clone();
        let period = std::time::Duration::from_secs(entry.interval_seconds);
        tracing::info!(task = kind.as_str(), every_secs = entry.interval_seconds, "Scheduling periodic task");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = dispatcher.dispatch(TaskRequest::now(kind, message.clone())) {
                    tracing::warn!(task = kind.as_str(), error = %e, "Failed to dispatch periodic task");
                }
            }
        });
    }
}
