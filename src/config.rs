use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::rebalancing::RebalancingOptions;
use crate::services::impact_estimator::{ImpactEstimator, DEFAULT_QUICK_WIN_MIN_IMPROVEMENT};
use crate::services::suggestion_generator::{
    SuggestionGenerator, DEFAULT_CHANNEL_DISPROPORTION_RATIO, DEFAULT_MIN_TRIMMED_TASK_HOURS,
};

const DEFAULT_OVERDUE_SWEEP_INTERVAL_SECS: u64 = 300;

/// Engine tuning loaded from YAML. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Percentage points a low-effort suggestion must gain to count as a quick win.
    pub quick_win_min_improvement: f64,
    pub overdue_sweep_interval_secs: u64,
    /// A channel above `fair share * ratio` of the week's hours is disproportionate.
    pub channel_disproportion_ratio: f64,
    /// Trims that would leave less than this are turned into removals.
    pub min_trimmed_task_hours: f64,
    pub default_options: RebalancingOptions,
    pub log_directives: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quick_win_min_improvement: DEFAULT_QUICK_WIN_MIN_IMPROVEMENT,
            overdue_sweep_interval_secs: DEFAULT_OVERDUE_SWEEP_INTERVAL_SECS,
            channel_disproportion_ratio: DEFAULT_CHANNEL_DISPROPORTION_RATIO,
            min_trimmed_task_hours: DEFAULT_MIN_TRIMMED_TASK_HOURS,
            default_options: RebalancingOptions::default(),
            log_directives: None,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let config: EngineConfig = if raw.trim().is_empty() {
            EngineConfig::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&raw)?;
        info!(target: "app::config", path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn to_yaml(&self) -> AppResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> AppResult<()> {
        if !self.quick_win_min_improvement.is_finite() || self.quick_win_min_improvement < 0.0 {
            return Err(AppError::config(
                "quickWinMinImprovement must be a non-negative number",
            ));
        }
        if self.overdue_sweep_interval_secs == 0 {
            return Err(AppError::config("overdueSweepIntervalSecs must be positive"));
        }
        if !self.channel_disproportion_ratio.is_finite() || self.channel_disproportion_ratio <= 1.0 {
            return Err(AppError::config(
                "channelDisproportionRatio must be greater than 1",
            ));
        }
        if !self.min_trimmed_task_hours.is_finite() || self.min_trimmed_task_hours < 0.0 {
            return Err(AppError::config(
                "minTrimmedTaskHours must be a non-negative number",
            ));
        }
        if let Some(hours) = self.default_options.max_daily_hours {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(AppError::config("defaultOptions.maxDailyHours must be positive"));
            }
        }
        Ok(())
    }

    pub fn overdue_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.overdue_sweep_interval_secs)
    }

    pub fn generator(&self) -> SuggestionGenerator {
        SuggestionGenerator::new(self.channel_disproportion_ratio, self.min_trimmed_task_hours)
    }

    pub fn estimator(&self) -> ImpactEstimator {
        ImpactEstimator::new(self.quick_win_min_improvement)
    }
}
