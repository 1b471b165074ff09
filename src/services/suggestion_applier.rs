use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::rebalancing::{
    ActionType, ApplyResult, MultiApplyResult, RebalancingAction, RebalancingSuggestion,
    SuggestionOutcome,
};
use crate::services::impact_estimator::get_suggestion_by_id;
use crate::store::{ScheduleStore, TaskPatch};

enum ActionOutcome {
    Applied,
    Skipped,
}

/// Executes accepted suggestions against the store, one application at a time.
pub struct SuggestionApplier {
    store: Arc<dyn ScheduleStore>,
    in_flight: Mutex<()>,
}

impl SuggestionApplier {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            in_flight: Mutex::new(()),
        }
    }

    /// Apply every action that still refers to a live, movable task.
    ///
    /// Stale actions are skipped and listed in `skipped_task_ids`; a store
    /// rejection aborts with an error and leaves earlier actions applied.
    pub fn apply_suggestion(&self, suggestion: &RebalancingSuggestion) -> AppResult<ApplyResult> {
        let _guard = self
            .in_flight
            .lock()
            .map_err(|_| AppError::other("suggestion applier lock poisoned"))?;

        let total = suggestion.actions.len();
        let mut applied = 0;
        let mut skipped_task_ids = Vec::new();

        for action in &suggestion.actions {
            match self.apply_action(action)? {
                ActionOutcome::Applied => applied += 1,
                ActionOutcome::Skipped => skipped_task_ids.push(action.task_id.clone()),
            }
        }

        let summary = format!("Applied {applied} of {total} suggested changes");
        info!(
            target: "app::apply",
            suggestion_id = %suggestion.id,
            applied,
            total,
            skipped = skipped_task_ids.len(),
            "suggestion applied"
        );
        Ok(ApplyResult {
            success: true,
            summary,
            applied,
            total,
            skipped_task_ids,
        })
    }

    /// Apply suggestions in id order. Not transactional: a fatal error stops
    /// the batch but keeps what was already written.
    pub fn apply_multiple(
        &self,
        ids: &[String],
        suggestions: &[RebalancingSuggestion],
    ) -> MultiApplyResult {
        let mut outcomes = Vec::with_capacity(ids.len());
        let mut applied_count = 0;

        for id in ids {
            let Some(suggestion) = get_suggestion_by_id(suggestions, id) else {
                warn!(target: "app::apply", suggestion_id = %id, "unknown suggestion id");
                outcomes.push(SuggestionOutcome {
                    suggestion_id: id.clone(),
                    applied: 0,
                    summary: format!("Suggestion {id} not found"),
                });
                continue;
            };

            match self.apply_suggestion(suggestion) {
                Ok(result) => {
                    applied_count += result.applied;
                    outcomes.push(SuggestionOutcome {
                        suggestion_id: id.clone(),
                        applied: result.applied,
                        summary: result.summary,
                    });
                }
                Err(err) => {
                    error!(
                        target: "app::apply",
                        suggestion_id = %id,
                        error = %err,
                        "batch stopped"
                    );
                    return MultiApplyResult {
                        success: false,
                        applied_count,
                        outcomes,
                        error: Some(err.to_string()),
                    };
                }
            }
        }

        MultiApplyResult {
            success: true,
            applied_count,
            outcomes,
            error: None,
        }
    }

    fn apply_action(&self, action: &RebalancingAction) -> AppResult<ActionOutcome> {
        let Some(task) = self.store.task(&action.task_id)? else {
            debug!(target: "app::apply", task_id = %action.task_id, "task gone; skipping action");
            return Ok(ActionOutcome::Skipped);
        };
        if !task.is_movable() {
            debug!(
                target: "app::apply",
                task_id = %task.id,
                status = %task.status,
                "task no longer movable; skipping action"
            );
            return Ok(ActionOutcome::Skipped);
        }

        let result = match (action.action_type, action.proposed_schedule) {
            (ActionType::MoveTask, Some(slot)) => self
                .store
                .update_task(
                    &task.id,
                    TaskPatch {
                        scheduled_start: Some(slot.start),
                        scheduled_end: Some(slot.end),
                        ..Default::default()
                    },
                )
                .map(|_| ()),
            (ActionType::MoveTask, None) => {
                warn!(target: "app::apply", task_id = %task.id, "move without a proposed slot");
                return Ok(ActionOutcome::Skipped);
            }
            (ActionType::ReduceScope, Some(slot)) => self
                .store
                .update_task(
                    &task.id,
                    TaskPatch {
                        estimated_hours: Some(slot.hours),
                        scheduled_start: Some(slot.start),
                        scheduled_end: Some(slot.end),
                        ..Default::default()
                    },
                )
                .map(|_| ()),
            (ActionType::ReduceScope, None) | (ActionType::RemoveTask, _) => {
                self.store.remove_task(&task.id)
            }
        };

        match result {
            Ok(()) => Ok(ActionOutcome::Applied),
            Err(AppError::NotFound { .. }) => Ok(ActionOutcome::Skipped),
            Err(err) => Err(err),
        }
    }
}
