use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::task::Task;
use crate::models::template::ContentTemplate;
use crate::services::template_scheduler::TemplateScheduler;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTemplateWeekPayload {
    pub templates: Vec<ContentTemplate>,
    /// Defaults to the week of the current schedule.
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
}

/// Planned tasks for one week of posting cadences, in the user's timezone.
/// Nothing is written to the schedule.
pub async fn generate_template_week(
    state: &AppState,
    payload: GenerateTemplateWeekPayload,
) -> CommandResult<Vec<Task>> {
    let app_state = state.clone();
    run_blocking(move || {
        let week_start = match payload.week_start {
            Some(date) => date,
            None => app_state.store().schedule()?.week_start_date,
        };
        let channels = app_state.store().channels()?;
        let settings = app_state.settings().effective_settings()?;
        TemplateScheduler::generate_week(&payload.templates, &channels, week_start, settings.tz())
    })
    .await
}
