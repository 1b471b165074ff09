use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::schedule::WeeklySchedule;
use crate::models::settings::UserSettings;
use crate::models::task::{Channel, Task, TaskStatus};

pub mod memory;

pub use memory::InMemoryScheduleStore;

/// Partial task update accepted by the store's mutation sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub actual_hours: Option<f64>,
    pub estimated_hours: Option<f64>,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(actual) = self.actual_hours {
            task.actual_hours = Some(actual);
        }
        if let Some(estimated) = self.estimated_hours {
            task.estimated_hours = estimated;
        }
        if let Some(start) = self.scheduled_start {
            task.scheduled_start = start;
        }
        if let Some(end) = self.scheduled_end {
            task.scheduled_end = end;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
    }
}

/// Owner of the current schedule, settings and channel registry.
///
/// Reads hand out snapshots; writes go through `update_task`/`remove_task` and
/// may be refused with `AppError::StoreRejected`.
pub trait ScheduleStore: Send + Sync {
    fn schedule(&self) -> AppResult<WeeklySchedule>;

    fn settings(&self) -> AppResult<UserSettings>;

    fn save_settings(&self, settings: UserSettings) -> AppResult<()>;

    fn channels(&self) -> AppResult<Vec<Channel>>;

    fn task(&self, id: &str) -> AppResult<Option<Task>>;

    fn update_task(&self, id: &str, patch: TaskPatch) -> AppResult<Task>;

    fn remove_task(&self, id: &str) -> AppResult<()>;
}
