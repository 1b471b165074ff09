use std::sync::{Arc, RwLock};

use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::settings::{UserSettings, WorkingHours};
use crate::store::ScheduleStore;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdateInput {
    pub weekly_capacity_hours: Option<f64>,
    pub working_days: Option<Vec<Weekday>>,
    pub working_hours: Option<WorkingHours>,
    /// `Some(None)` clears the zone back to UTC.
    pub timezone: Option<Option<String>>,
}

pub struct SettingsService {
    store: Arc<dyn ScheduleStore>,
    cache: RwLock<Option<UserSettings>>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    pub fn get(&self) -> AppResult<UserSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.store.settings()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    pub fn update(&self, input: SettingsUpdateInput) -> AppResult<UserSettings> {
        let mut current = self.get()?;

        if let Some(capacity) = input.weekly_capacity_hours {
            if !capacity.is_finite() || capacity <= 0.0 {
                return Err(AppError::validation(
                    "weekly capacity must be a positive number of hours",
                ));
            }
            current.weekly_capacity_hours = capacity;
        }

        if let Some(days) = input.working_days {
            if days.is_empty() {
                return Err(AppError::validation("at least one working day is required"));
            }
            current.working_days = dedupe_days(days);
        }

        if let Some(hours) = input.working_hours {
            if !hours.is_valid() {
                return Err(AppError::validation_with_details(
                    "working hours must start before they end",
                    serde_json::json!({ "start": hours.start, "end": hours.end }),
                ));
            }
            current.working_hours = hours;
        }

        if let Some(timezone) = input.timezone {
            if let Some(name) = timezone.as_deref() {
                if name.parse::<Tz>().is_err() {
                    return Err(AppError::validation(format!("unknown timezone: {name}")));
                }
            }
            current.timezone = timezone;
        }

        self.store.save_settings(current.clone())?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(current.clone());
        }
        info!(
            target: "app::settings",
            capacity = current.weekly_capacity_hours,
            working_days = current.working_days.len(),
            "settings updated"
        );
        Ok(current)
    }

    /// Settings as analysis should see them: malformed values are replaced
    /// rather than rejected so analysis always produces a result.
    pub fn effective_settings(&self) -> AppResult<UserSettings> {
        Ok(sanitize(self.get()?))
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
    }
}

pub fn sanitize(mut settings: UserSettings) -> UserSettings {
    if !settings.weekly_capacity_hours.is_finite() || settings.weekly_capacity_hours < 0.0 {
        warn!(
            target: "app::settings",
            capacity = settings.weekly_capacity_hours,
            "invalid weekly capacity; treating as zero"
        );
        settings.weekly_capacity_hours = 0.0;
    }
    if !settings.working_hours.is_valid() {
        warn!(target: "app::settings", "invalid working hours; using defaults");
        settings.working_hours = WorkingHours::default();
    }
    if let Some(name) = settings.timezone.as_deref() {
        if name.parse::<Tz>().is_err() {
            warn!(target: "app::settings", timezone = %name, "unknown timezone; using UTC");
            settings.timezone = None;
        }
    }
    if settings.working_days.is_empty() {
        warn!(target: "app::settings", "no working days configured; every day has zero slack");
    }
    settings.working_days = dedupe_days(settings.working_days);
    settings
}

fn dedupe_days(days: Vec<Weekday>) -> Vec<Weekday> {
    let mut unique: Vec<Weekday> = Vec::with_capacity(days.len());
    for day in days {
        if !unique.contains(&day) {
            unique.push(day);
        }
    }
    unique.sort_by_key(|day| day.num_days_from_monday());
    unique
}
