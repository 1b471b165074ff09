use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::task::Task;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadRiskLevel {
    Ok,
    Warning,
    Critical,
}

impl WorkloadRiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadRiskLevel::Ok => "ok",
            WorkloadRiskLevel::Warning => "warning",
            WorkloadRiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for WorkloadRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkloadRiskLevel {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ok" => Ok(WorkloadRiskLevel::Ok),
            "warning" => Ok(WorkloadRiskLevel::Warning),
            "critical" => Ok(WorkloadRiskLevel::Critical),
            other => Err(format!("unsupported risk level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyWorkload {
    pub date: NaiveDate,
    pub day_name: String,
    pub is_working_day: bool,
    pub scheduled_hours: f64,
    /// Threshold the day is measured against; zero on non-working days.
    pub capacity_hours: f64,
    pub utilization: f64,
    pub tasks: Vec<Task>,
    pub is_overloaded: bool,
}

impl DailyWorkload {
    pub fn spare_hours(&self) -> f64 {
        (self.capacity_hours - self.scheduled_hours).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelWorkload {
    pub channel_id: String,
    pub channel_name: String,
    pub scheduled_hours: f64,
    pub task_count: usize,
    pub completion_rate: u32,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadMetrics {
    pub total_scheduled_hours: f64,
    pub capacity_hours: f64,
    pub utilization_percentage: f64,
    pub overload_hours: f64,
    pub is_overloaded: bool,
    pub daily_threshold_hours: f64,
    pub daily_breakdown: Vec<DailyWorkload>,
    pub channel_breakdown: Vec<ChannelWorkload>,
    /// 0-100, 100 means hours are spread evenly over the working days.
    pub distribution_efficiency: f64,
    pub variance: f64,
    pub risk_level: WorkloadRiskLevel,
}

impl WorkloadMetrics {
    pub fn overloaded_days(&self) -> impl Iterator<Item = &DailyWorkload> {
        self.daily_breakdown.iter().filter(|day| day.is_overloaded)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DailyWorkload> {
        self.daily_breakdown.iter().find(|day| day.date == date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskConflict {
    pub first_task_id: String,
    pub second_task_id: String,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
    pub overlap_minutes: i64,
    pub same_channel: bool,
}

impl TaskConflict {
    pub fn involves(&self, task_id: &str) -> bool {
        self.first_task_id == task_id || self.second_task_id == task_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WorkingTimeViolation {
    NonWorkingDay,
    OutsideWorkingHours,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OffHoursTask {
    pub task_id: String,
    pub violation: WorkingTimeViolation,
}
