use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::task::Task;

/// Immutable snapshot of one week of tasks; every mutation yields a new revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySchedule {
    pub week_start_date: NaiveDate,
    pub tasks: Vec<Task>,
    pub user_capacity_hours: f64,
    #[serde(default)]
    pub revision: u64,
}

impl WeeklySchedule {
    pub fn new(week_start_date: NaiveDate, tasks: Vec<Task>, user_capacity_hours: f64) -> Self {
        Self {
            week_start_date,
            tasks,
            user_capacity_hours,
            revision: 0,
        }
    }

    pub fn total_scheduled_hours(&self) -> f64 {
        self.tasks.iter().map(|task| task.estimated_hours).sum()
    }

    pub fn is_overloaded(&self) -> bool {
        self.total_scheduled_hours() > self.user_capacity_hours
    }

    pub fn week_days(&self) -> Vec<NaiveDate> {
        (0..7)
            .map(|offset| self.week_start_date + Duration::days(offset))
            .collect()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.week_start_date && date < self.week_start_date + Duration::days(7)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }
}
