use serde::Deserialize;

use crate::models::rebalancing::{
    ApplyResult, MultiApplyResult, RebalancingAnalysis, RebalancingOptions, RebalancingSuggestion,
};

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyMultiplePayload {
    #[serde(default)]
    pub suggestion_ids: Vec<String>,
}

pub async fn analyze_schedule(
    state: &AppState,
    options: Option<RebalancingOptions>,
) -> CommandResult<RebalancingAnalysis> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().analyze(options)).await
}

pub async fn generate_suggestions(
    state: &AppState,
    options: Option<RebalancingOptions>,
) -> CommandResult<Vec<RebalancingSuggestion>> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().generate_suggestions(options)).await
}

pub async fn get_quick_wins(state: &AppState) -> CommandResult<Vec<RebalancingSuggestion>> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().quick_wins()).await
}

pub async fn apply_suggestion(state: &AppState, suggestion_id: String) -> CommandResult<ApplyResult> {
    let app_state = state.clone();
    run_blocking(move || app_state.rebalancing().apply_suggestion(&suggestion_id)).await
}

pub async fn apply_multiple_suggestions(
    state: &AppState,
    payload: ApplyMultiplePayload,
) -> CommandResult<MultiApplyResult> {
    let app_state = state.clone();
    run_blocking(move || {
        app_state
            .rebalancing()
            .apply_multiple_suggestions(&payload.suggestion_ids)
    })
    .await
}
