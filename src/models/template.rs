use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::task::PriorityLevel;

/// When a channel publishes: the weekdays and the local time work on a post starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostingCadence {
    pub days: Vec<Weekday>,
    pub start_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentTemplate {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub estimated_hours: f64,
    #[serde(default = "default_priority")]
    pub priority: PriorityLevel,
    pub cadence: PostingCadence,
}

fn default_priority() -> PriorityLevel {
    PriorityLevel::Medium
}
