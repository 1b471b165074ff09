use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::task::{Task, TaskStatus};
use crate::store::{ScheduleStore, TaskPatch};

/// Relative gap between estimated and actual totals still reported as accurate.
const ACCURATE_BIAS_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub task_id: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstimateBias {
    Accurate,
    Underestimated,
    Overestimated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeAccuracyReport {
    pub sample_count: usize,
    pub total_estimated_hours: f64,
    pub total_actual_hours: f64,
    pub accuracy: u32,
    pub bias: EstimateBias,
}

/// Status a task should hold at `now`, ignoring any caller request.
pub fn compute_status(task: &Task, now: DateTime<Utc>) -> TaskStatus {
    if task.status == TaskStatus::Completed {
        return TaskStatus::Completed;
    }
    if now > task.scheduled_end {
        return TaskStatus::Overdue;
    }
    task.status
}

/// Apply an explicit status change, folding in the implicit overdue transition.
pub fn transition(
    task: &Task,
    requested: TaskStatus,
    actual_hours: Option<f64>,
    now: DateTime<Utc>,
) -> AppResult<Task> {
    if task.status.is_terminal() && requested != TaskStatus::Completed {
        return Err(AppError::invalid_transition(task.status, requested));
    }
    if let Some(hours) = actual_hours {
        if !hours.is_finite() || hours < 0.0 {
            return Err(AppError::validation("actual hours must be a non-negative number"));
        }
    }

    let mut updated = task.clone();
    if requested == TaskStatus::Completed {
        updated.status = TaskStatus::Completed;
        updated.actual_hours = Some(actual_hours.unwrap_or(task.estimated_hours));
        if task.status != TaskStatus::Completed || updated.completed_at.is_none() {
            updated.completed_at = Some(now);
        }
        return Ok(updated);
    }

    updated.status = if now > task.scheduled_end {
        TaskStatus::Overdue
    } else {
        requested
    };
    if let Some(hours) = actual_hours {
        updated.actual_hours = Some(hours);
    }
    Ok(updated)
}

/// Tasks whose computed status differs from the stored one.
pub fn detect_status_changes(tasks: &[Task], now: DateTime<Utc>) -> Vec<StatusChange> {
    tasks
        .iter()
        .filter(|task| task.status != TaskStatus::Completed)
        .filter_map(|task| {
            let computed = compute_status(task, now);
            (computed != task.status).then(|| StatusChange {
                task_id: task.id.clone(),
                from: task.status,
                to: computed,
            })
        })
        .collect()
}

pub fn calculate_channel_completion_rate(tasks: &[Task], channel_id: &str) -> u32 {
    let (total, completed) = tasks
        .iter()
        .filter(|task| task.channel_id == channel_id)
        .fold((0usize, 0usize), |(total, completed), task| {
            let done = usize::from(task.status == TaskStatus::Completed);
            (total + 1, completed + done)
        });
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u32
}

pub fn calculate_time_accuracy(tasks: &[Task]) -> u32 {
    time_accuracy_report(tasks).accuracy
}

pub fn time_accuracy_report(tasks: &[Task]) -> TimeAccuracyReport {
    let samples: Vec<(f64, f64)> = tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Completed)
        .filter_map(|task| task.actual_hours.map(|actual| (task.estimated_hours, actual)))
        .collect();

    let total_estimated: f64 = samples.iter().map(|(estimated, _)| estimated).sum();
    let total_actual: f64 = samples.iter().map(|(_, actual)| actual).sum();
    let larger = total_estimated.max(total_actual);

    let accuracy = if samples.is_empty() || larger <= 0.0 {
        100
    } else {
        (100.0 * total_estimated.min(total_actual) / larger).round() as u32
    };

    let bias = if samples.is_empty() || larger <= 0.0 {
        EstimateBias::Accurate
    } else {
        let relative = (total_actual - total_estimated) / larger;
        if relative.abs() <= ACCURATE_BIAS_TOLERANCE {
            EstimateBias::Accurate
        } else if relative > 0.0 {
            EstimateBias::Underestimated
        } else {
            EstimateBias::Overestimated
        }
    };

    TimeAccuracyReport {
        sample_count: samples.len(),
        total_estimated_hours: total_estimated,
        total_actual_hours: total_actual,
        accuracy,
        bias,
    }
}

/// Task lifecycle operations against the schedule store.
pub struct TaskStatusService {
    store: Arc<dyn ScheduleStore>,
    sweep_running: Arc<AtomicBool>,
}

impl TaskStatusService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            sweep_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        actual_hours: Option<f64>,
    ) -> AppResult<Task> {
        self.update_task_status_at(task_id, status, actual_hours, Utc::now())
    }

    pub fn update_task_status_at(
        &self,
        task_id: &str,
        status: TaskStatus,
        actual_hours: Option<f64>,
        now: DateTime<Utc>,
    ) -> AppResult<Task> {
        let task = self
            .store
            .task(task_id)?
            .ok_or_else(|| AppError::not_found("task", task_id))?;
        let updated = transition(&task, status, actual_hours, now)?;

        let patch = TaskPatch {
            status: Some(updated.status),
            actual_hours: updated.actual_hours,
            completed_at: updated.completed_at,
            ..Default::default()
        };
        let stored = self.store.update_task(task_id, patch)?;
        info!(
            target: "app::status",
            task_id = %task_id,
            from = %task.status,
            to = %stored.status,
            requested = %status,
            "task status updated"
        );
        Ok(stored)
    }

    pub fn channel_completion_rate(&self, channel_id: &str) -> AppResult<u32> {
        let schedule = self.store.schedule()?;
        Ok(calculate_channel_completion_rate(&schedule.tasks, channel_id))
    }

    pub fn time_accuracy(&self) -> AppResult<TimeAccuracyReport> {
        let schedule = self.store.schedule()?;
        Ok(time_accuracy_report(&schedule.tasks))
    }

    pub fn channel_time_accuracy(&self, channel_id: &str) -> AppResult<TimeAccuracyReport> {
        let schedule = self.store.schedule()?;
        let tasks: Vec<Task> = schedule
            .tasks
            .into_iter()
            .filter(|task| task.channel_id == channel_id)
            .collect();
        Ok(time_accuracy_report(&tasks))
    }

    /// Write every pending overdue transition. Re-running on an unchanged schedule writes nothing.
    pub fn sweep_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<StatusChange>> {
        let schedule = self.store.schedule()?;
        let changes = detect_status_changes(&schedule.tasks, now);

        for change in &changes {
            let patch = TaskPatch {
                status: Some(change.to),
                ..Default::default()
            };
            match self.store.update_task(&change.task_id, patch) {
                Ok(_) => {}
                Err(AppError::NotFound { .. }) => {
                    debug!(target: "app::status", task_id = %change.task_id, "task vanished during sweep");
                }
                Err(err) => return Err(err),
            }
        }

        if !changes.is_empty() {
            info!(target: "app::status", changed = changes.len(), "overdue sweep applied");
        }
        Ok(changes)
    }

    /// Run the sweep now and then every `interval` on a background thread.
    pub fn start_overdue_sweep(
        self: &Arc<Self>,
        interval: StdDuration,
    ) -> AppResult<OverdueSweepHandle> {
        if interval.is_zero() {
            return Err(AppError::validation("sweep interval must be positive"));
        }
        if self
            .sweep_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::validation("overdue sweep already running"));
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let service = Arc::clone(self);
        let running = Arc::clone(&self.sweep_running);

        let spawned = thread::Builder::new()
            .name("overdue-sweep".to_string())
            .spawn(move || {
                loop {
                    if let Err(err) = service.sweep_overdue(Utc::now()) {
                        error!(target: "app::status", error = %err, "overdue sweep failed");
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
                running.store(false, Ordering::SeqCst);
                debug!(target: "app::status", "overdue sweep stopped");
            });

        match spawned {
            Ok(join) => {
                info!(
                    target: "app::status",
                    interval_secs = interval.as_secs(),
                    "overdue sweep started"
                );
                Ok(OverdueSweepHandle {
                    stop: Some(stop_tx),
                    join: Some(join),
                })
            }
            Err(err) => {
                self.sweep_running.store(false, Ordering::SeqCst);
                Err(AppError::other(format!("failed to start overdue sweep: {err}")))
            }
        }
    }

    pub fn is_sweep_running(&self) -> bool {
        self.sweep_running.load(Ordering::SeqCst)
    }
}

/// Stops the background sweep on `stop()` or drop.
pub struct OverdueSweepHandle {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl OverdueSweepHandle {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!(target: "app::status", "overdue sweep thread panicked");
            }
        }
    }
}

impl Drop for OverdueSweepHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
