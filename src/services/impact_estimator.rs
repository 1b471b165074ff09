use std::collections::HashSet;

use chrono_tz::Tz;
use tracing::debug;

use crate::models::rebalancing::{
    RebalancingAction, RebalancingSuggestion, SuggestionImpact, SuggestionType, TotalImpact,
};
use crate::models::task::PriorityLevel;
use crate::models::workload::WorkloadMetrics;
use crate::services::schedule_utils::{local_date, round1, round2, HOURS_EPSILON};
use crate::services::suggestion_generator::SuggestionDraft;

pub const DEFAULT_QUICK_WIN_MIN_IMPROVEMENT: f64 = 5.0;

const HIGH_PRIORITY_SCORE: f64 = 60.0;
const MEDIUM_PRIORITY_SCORE: f64 = 30.0;
const EXTRA_ACTION_PENALTY: f64 = 10.0;
const EXTRA_DAY_PENALTY: f64 = 5.0;
const LOW_EFFORT_MAX_ACTIONS: usize = 2;
const HIGH_EFFORT_MIN_ACTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEstimator {
    pub quick_win_min_improvement: f64,
}

impl Default for ImpactEstimator {
    fn default() -> Self {
        Self {
            quick_win_min_improvement: DEFAULT_QUICK_WIN_MIN_IMPROVEMENT,
        }
    }
}

impl ImpactEstimator {
    pub fn new(quick_win_min_improvement: f64) -> Self {
        Self {
            quick_win_min_improvement,
        }
    }

    /// Impact of applying `actions` alone against a week of `capacity_hours`.
    pub fn impact(&self, actions: &[RebalancingAction], capacity_hours: f64) -> SuggestionImpact {
        let hours: f64 = actions.iter().map(RebalancingAction::hours_relieved).sum();
        let utilization_improvement = if capacity_hours > HOURS_EPSILON {
            round1(hours / capacity_hours * 100.0)
        } else {
            0.0
        };
        SuggestionImpact {
            hours_reduced: round2(hours),
            utilization_improvement,
            affected_tasks: actions.len(),
        }
    }

    /// Attach impact, priority and effort, then rank. Days touched are counted
    /// in `tz`, the zone the schedule is bucketed in.
    pub fn estimate(
        &self,
        drafts: Vec<SuggestionDraft>,
        metrics: &WorkloadMetrics,
        tz: Tz,
    ) -> Vec<RebalancingSuggestion> {
        let suggestions: Vec<RebalancingSuggestion> = drafts
            .into_iter()
            .map(|draft| {
                let impact = self.impact(&draft.actions, metrics.capacity_hours);
                let priority = classify_priority(&draft, impact.hours_reduced, tz);
                let estimated_effort = classify_effort(&draft.actions);
                debug!(
                    target: "app::rebalancing",
                    suggestion_id = %draft.id,
                    hours_reduced = impact.hours_reduced,
                    %priority,
                    effort = %estimated_effort,
                    "suggestion estimated"
                );
                RebalancingSuggestion {
                    id: draft.id,
                    suggestion_type: draft.suggestion_type,
                    priority,
                    title: draft.title,
                    description: draft.description,
                    impact,
                    actions: draft.actions,
                    estimated_effort,
                }
            })
            .collect();
        rank(suggestions)
    }

    pub fn is_quick_win(&self, suggestion: &RebalancingSuggestion) -> bool {
        suggestion.estimated_effort == PriorityLevel::Low
            && suggestion.impact.utilization_improvement + HOURS_EPSILON
                >= self.quick_win_min_improvement
    }

    pub fn quick_wins(&self, suggestions: &[RebalancingSuggestion]) -> Vec<RebalancingSuggestion> {
        suggestions
            .iter()
            .filter(|suggestion| self.is_quick_win(suggestion))
            .cloned()
            .collect()
    }
}

/// Highest priority first, then largest utilization improvement. Stable.
pub fn rank(mut suggestions: Vec<RebalancingSuggestion>) -> Vec<RebalancingSuggestion> {
    suggestions.sort_by(|a, b| {
        b.priority.cmp(&a.priority).then_with(|| {
            b.impact
                .utilization_improvement
                .total_cmp(&a.impact.utilization_improvement)
        })
    });
    suggestions
}

/// Sum of every suggestion's impact. An upper bound: suggestions are
/// alternatives and may count the same task more than once.
pub fn total_potential_impact(suggestions: &[RebalancingSuggestion]) -> TotalImpact {
    suggestions
        .iter()
        .fold(TotalImpact::default(), |mut total, suggestion| {
            total.hours_reduced += suggestion.impact.hours_reduced;
            total.utilization_improvement += suggestion.impact.utilization_improvement;
            total.affected_tasks += suggestion.impact.affected_tasks;
            total
        })
}

pub fn by_priority(
    suggestions: &[RebalancingSuggestion],
    priority: PriorityLevel,
) -> Vec<&RebalancingSuggestion> {
    suggestions.iter().filter(|s| s.priority == priority).collect()
}

pub fn by_type(
    suggestions: &[RebalancingSuggestion],
    suggestion_type: SuggestionType,
) -> Vec<&RebalancingSuggestion> {
    suggestions
        .iter()
        .filter(|s| s.suggestion_type == suggestion_type)
        .collect()
}

pub fn by_effort(
    suggestions: &[RebalancingSuggestion],
    effort: PriorityLevel,
) -> Vec<&RebalancingSuggestion> {
    suggestions
        .iter()
        .filter(|s| s.estimated_effort == effort)
        .collect()
}

pub fn get_suggestion_by_id<'a>(
    suggestions: &'a [RebalancingSuggestion],
    id: &str,
) -> Option<&'a RebalancingSuggestion> {
    suggestions.iter().find(|s| s.id == id)
}

/// Share of the targeted overload resolved, less a penalty for every extra
/// action and every extra day touched.
fn classify_priority(draft: &SuggestionDraft, hours_reduced: f64, tz: Tz) -> PriorityLevel {
    let resolved = if draft.target_overload_hours > HOURS_EPSILON {
        (hours_reduced / draft.target_overload_hours).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let extra_actions = draft.actions.len().saturating_sub(1) as f64;
    let days: HashSet<_> = draft
        .actions
        .iter()
        .filter_map(|action| {
            action
                .proposed_schedule
                .map(|slot| local_date(slot.start, tz))
        })
        .collect();
    let extra_days = days.len().saturating_sub(1) as f64;

    let score = resolved * 100.0 - EXTRA_ACTION_PENALTY * extra_actions - EXTRA_DAY_PENALTY * extra_days;
    if score >= HIGH_PRIORITY_SCORE {
        PriorityLevel::High
    } else if score >= MEDIUM_PRIORITY_SCORE {
        PriorityLevel::Medium
    } else {
        PriorityLevel::Low
    }
}

fn classify_effort(actions: &[RebalancingAction]) -> PriorityLevel {
    let channels: HashSet<&str> = actions.iter().map(|a| a.channel_id.as_str()).collect();
    if channels.len() > 1 || actions.len() >= HIGH_EFFORT_MIN_ACTIONS {
        PriorityLevel::High
    } else if actions.len() <= LOW_EFFORT_MAX_ACTIONS {
        PriorityLevel::Low
    } else {
        PriorityLevel::Medium
    }
}
