use crate::models::workload::{OffHoursTask, TaskConflict, WorkloadMetrics};
use crate::services::conflict_detector::detect_outside_working_hours;
use crate::services::workload_calculator::WorkloadCalculator;

use super::{run_blocking, AppState, CommandResult};

pub async fn compute_workload_metrics(state: &AppState) -> CommandResult<WorkloadMetrics> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().compute_workload_metrics()).await
}

pub async fn workload_recommendations(state: &AppState) -> CommandResult<Vec<String>> {
    let app_state = state.clone();
    run_blocking(move || {
        let metrics = app_state.rebalancing().compute_workload_metrics()?;
        Ok(WorkloadCalculator::recommendations(&metrics))
    })
    .await
}

pub async fn detect_conflicts(state: &AppState) -> CommandResult<Vec<TaskConflict>> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().detect_conflicts()).await
}

pub async fn detect_off_hours_tasks(state: &AppState) -> CommandResult<Vec<OffHoursTask>> {
    let app_state = state.clone();
    run_blocking(move || {
        let schedule = app_state.store().schedule()?;
        let settings = app_state.settings().effective_settings()?;
        Ok(detect_outside_working_hours(&schedule.tasks, &settings))
    })
    .await
}
