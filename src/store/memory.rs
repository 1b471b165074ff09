use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::schedule::WeeklySchedule;
use crate::models::settings::UserSettings;
use crate::models::task::{Channel, Task};

use super::{ScheduleStore, TaskPatch};

#[derive(Debug)]
struct StoreState {
    schedule: WeeklySchedule,
    settings: UserSettings,
    channels: Vec<Channel>,
    read_only: bool,
}

/// Mutex-guarded store for embedding callers and tests.
#[derive(Debug)]
pub struct InMemoryScheduleStore {
    state: Mutex<StoreState>,
}

impl InMemoryScheduleStore {
    pub fn new(schedule: WeeklySchedule, settings: UserSettings, channels: Vec<Channel>) -> Self {
        info!(
            target: "app::store",
            tasks = schedule.tasks.len(),
            channels = channels.len(),
            week = %schedule.week_start_date,
            "in-memory schedule store initialized"
        );
        Self {
            state: Mutex::new(StoreState {
                schedule,
                settings,
                channels,
                read_only: false,
            }),
        }
    }

    /// A read-only store refuses every write, which callers observe as a failing sink.
    pub fn set_read_only(&self, read_only: bool) -> AppResult<()> {
        self.lock()?.read_only = read_only;
        Ok(())
    }

    pub fn insert_task(&self, task: Task) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.read_only {
            return Err(AppError::store_rejected(&task.id, "store is read-only"));
        }
        if state.schedule.task(&task.id).is_some() {
            return Err(AppError::validation(format!(
                "task {} already exists",
                task.id
            )));
        }
        state.schedule.tasks.push(task);
        state.schedule.revision += 1;
        Ok(())
    }

    pub fn revision(&self) -> AppResult<u64> {
        Ok(self.lock()?.schedule.revision)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| AppError::other("schedule store lock poisoned"))
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn schedule(&self) -> AppResult<WeeklySchedule> {
        let state = self.lock()?;
        let mut schedule = state.schedule.clone();
        schedule.user_capacity_hours = state.settings.weekly_capacity_hours;
        Ok(schedule)
    }

    fn settings(&self) -> AppResult<UserSettings> {
        Ok(self.lock()?.settings.clone())
    }

    fn save_settings(&self, settings: UserSettings) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.read_only {
            return Err(AppError::store_rejected("-", "store is read-only"));
        }
        state.schedule.user_capacity_hours = settings.weekly_capacity_hours;
        state.settings = settings;
        state.schedule.revision += 1;
        debug!(target: "app::store", revision = state.schedule.revision, "settings saved");
        Ok(())
    }

    fn channels(&self) -> AppResult<Vec<Channel>> {
        Ok(self.lock()?.channels.clone())
    }

    fn task(&self, id: &str) -> AppResult<Option<Task>> {
        Ok(self.lock()?.schedule.task(id).cloned())
    }

    fn update_task(&self, id: &str, patch: TaskPatch) -> AppResult<Task> {
        let mut state = self.lock()?;
        if state.read_only {
            return Err(AppError::store_rejected(id, "store is read-only"));
        }

        let task = state
            .schedule
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::not_found("task", id))?;

        let mut updated = task.clone();
        patch.apply_to(&mut updated);
        if !updated.has_valid_window() {
            return Err(AppError::store_rejected(
                id,
                "scheduled start must be before scheduled end",
            ));
        }
        if updated.estimated_hours <= 0.0 {
            return Err(AppError::store_rejected(
                id,
                "estimated hours must be positive",
            ));
        }

        *task = updated.clone();
        state.schedule.revision += 1;
        debug!(target: "app::store", task_id = %id, revision = state.schedule.revision, "task updated");
        Ok(updated)
    }

    fn remove_task(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.read_only {
            return Err(AppError::store_rejected(id, "store is read-only"));
        }
        let before = state.schedule.tasks.len();
        state.schedule.tasks.retain(|task| task.id != id);
        if state.schedule.tasks.len() == before {
            return Err(AppError::not_found("task", id));
        }
        state.schedule.revision += 1;
        debug!(target: "app::store", task_id = %id, revision = state.schedule.revision, "task removed");
        Ok(())
    }
}
