use chrono::Weekday;
use serde::Deserialize;

use crate::models::settings::{UserSettings, WorkingHours};
use crate::services::settings_service::SettingsUpdateInput;

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(state: &AppState) -> CommandResult<UserSettings> {
    let app_state = state.clone();
    run_blocking(move || app_state.settings().get()).await
}

pub async fn settings_update(
    state: &AppState,
    payload: SettingsUpdatePayload,
) -> CommandResult<UserSettings> {
    let app_state = state.clone();
    let input = payload.into_input();
    run_blocking(move || app_state.settings().update(input)).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdatePayload {
    #[serde(default)]
    pub weekly_capacity_hours: Option<f64>,
    #[serde(default)]
    pub working_days: Option<Vec<Weekday>>,
    #[serde(default)]
    pub working_hours: Option<WorkingHours>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub reset_timezone: Option<bool>,
}

impl SettingsUpdatePayload {
    fn into_input(self) -> SettingsUpdateInput {
        let timezone = if self.reset_timezone == Some(true) {
            Some(None)
        } else {
            self.timezone.map(Some)
        };

        SettingsUpdateInput {
            weekly_capacity_hours: self.weekly_capacity_hours,
            working_days: self.working_days,
            working_hours: self.working_hours,
            timezone,
        }
    }
}
