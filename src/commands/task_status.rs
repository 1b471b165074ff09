use serde::Deserialize;

use crate::error::AppError;
use crate::models::task::{Task, TaskStatus};
use crate::services::task_status_service::TimeAccuracyReport;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskStatusPayload {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub actual_hours: Option<f64>,
}

pub async fn update_task_status(
    state: &AppState,
    payload: UpdateTaskStatusPayload,
) -> CommandResult<Task> {
    let app_state = state.clone();
    run_blocking(move || {
        let status = TaskStatus::try_from(payload.status.as_str()).map_err(AppError::validation)?;
        app_state
            .task_status()
            .update_task_status(&payload.task_id, status, payload.actual_hours)
    })
    .await
}

pub async fn get_channel_completion_rate(state: &AppState, channel_id: String) -> CommandResult<u32> {
    let app_state = state.clone();
    run_blocking(move || app_state.task_status().channel_completion_rate(&channel_id)).await
}

/// Accuracy over every completed task, or one channel's when `channel_id` is set.
pub async fn get_time_accuracy(
    state: &AppState,
    channel_id: Option<String>,
) -> CommandResult<TimeAccuracyReport> {
    let app_state = state.clone();
    run_blocking(move || match channel_id {
        Some(channel_id) => app_state.task_status().channel_time_accuracy(&channel_id),
        None => app_state.task_status().time_accuracy(),
    })
    .await
}
