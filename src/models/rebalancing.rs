use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::PriorityLevel;
use crate::models::workload::{TaskConflict, WorkloadMetrics};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    RedistributeDaily,
    RedistributeChannel,
    ReduceScope,
}

impl SuggestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionType::RedistributeDaily => "redistribute_daily",
            SuggestionType::RedistributeChannel => "redistribute_channel",
            SuggestionType::ReduceScope => "reduce_scope",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MoveTask,
    ReduceScope,
    RemoveTask,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub task_id: String,
    pub task_title: String,
    pub channel_id: String,
    pub current_schedule: ScheduleSlot,
    #[serde(default)]
    pub proposed_schedule: Option<ScheduleSlot>,
    pub reason: String,
}

impl RebalancingAction {
    /// Hours this action takes off the slot it currently occupies.
    pub fn hours_relieved(&self) -> f64 {
        match self.action_type {
            ActionType::MoveTask | ActionType::RemoveTask => self.current_schedule.hours,
            ActionType::ReduceScope => {
                let proposed = self
                    .proposed_schedule
                    .map(|slot| slot.hours)
                    .unwrap_or(0.0);
                (self.current_schedule.hours - proposed).max(0.0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionImpact {
    pub hours_reduced: f64,
    pub utilization_improvement: f64,
    pub affected_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingSuggestion {
    pub id: String,
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub priority: PriorityLevel,
    pub title: String,
    pub description: String,
    pub impact: SuggestionImpact,
    pub actions: Vec<RebalancingAction>,
    pub estimated_effort: PriorityLevel,
}

/// Caller-supplied rebalancing policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RebalancingOptions {
    pub max_daily_hours: Option<f64>,
    pub allow_cross_channel_rebalancing: bool,
    pub preserve_deadlines: bool,
}

impl Default for RebalancingOptions {
    fn default() -> Self {
        Self {
            max_daily_hours: None,
            allow_cross_channel_rebalancing: true,
            preserve_deadlines: true,
        }
    }
}

/// Sum of impact fields over alternative suggestions.
///
/// Suggestions are alternatives, not a combined plan: two of them may touch the
/// same task, so this is an upper bound on what applying several can achieve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TotalImpact {
    pub hours_reduced: f64,
    pub utilization_improvement: f64,
    pub affected_tasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RebalancingAnalysis {
    pub needs_rebalancing: bool,
    pub generated_at: DateTime<Utc>,
    pub schedule_revision: u64,
    pub metrics: WorkloadMetrics,
    pub conflicts: Vec<TaskConflict>,
    pub suggestions: Vec<RebalancingSuggestion>,
    pub quick_wins: Vec<RebalancingSuggestion>,
    pub total_potential_impact: TotalImpact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    /// True whenever the store accepted every write it was asked for, even if
    /// every action was skipped as stale.
    pub success: bool,
    pub summary: String,
    pub applied: usize,
    pub total: usize,
    pub skipped_task_ids: Vec<String>,
}

impl ApplyResult {
    pub fn is_noop(&self) -> bool {
        self.applied == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionOutcome {
    pub suggestion_id: String,
    pub applied: usize,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MultiApplyResult {
    pub success: bool,
    pub applied_count: usize,
    pub outcomes: Vec<SuggestionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
