use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{AppError, AppResult};
use crate::models::rebalancing::{
    ApplyResult, MultiApplyResult, RebalancingAnalysis, RebalancingOptions, RebalancingSuggestion,
};
use crate::models::schedule::WeeklySchedule;
use crate::models::settings::UserSettings;
use crate::models::task::Channel;
use crate::models::workload::{TaskConflict, WorkloadMetrics};
use crate::services::conflict_detector::detect_conflicts;
use crate::services::impact_estimator::{
    get_suggestion_by_id, total_potential_impact, ImpactEstimator,
};
use crate::services::settings_service::SettingsService;
use crate::services::suggestion_applier::SuggestionApplier;
use crate::services::suggestion_generator::SuggestionGenerator;
use crate::services::workload_calculator::WorkloadCalculator;
use crate::store::ScheduleStore;

/// Full analysis of one snapshot without touching any store.
pub fn analyze_schedule(
    schedule: &WeeklySchedule,
    settings: &UserSettings,
    channels: &[Channel],
    options: &RebalancingOptions,
    generator: &SuggestionGenerator,
    estimator: &ImpactEstimator,
) -> RebalancingAnalysis {
    let metrics = WorkloadCalculator::calculate(schedule, settings, channels);
    let conflicts = detect_conflicts(&schedule.tasks);
    let drafts = generator.generate(schedule, settings, options, &metrics);
    let suggestions = estimator.estimate(drafts, &metrics, settings.tz());
    let quick_wins = estimator.quick_wins(&suggestions);
    let total_potential_impact = total_potential_impact(&suggestions);

    RebalancingAnalysis {
        needs_rebalancing: metrics.is_overloaded,
        generated_at: Utc::now(),
        schedule_revision: schedule.revision,
        metrics,
        conflicts,
        suggestions,
        quick_wins,
        total_potential_impact,
    }
}

/// Last analysis together with the options it was built with. The options
/// outlive the analysis so a rebuild keeps the caller's policy.
struct AnalysisCache {
    analysis: Option<RebalancingAnalysis>,
    options: RebalancingOptions,
}

/// Ties the engine to the store and keeps the latest analysis until the
/// schedule changes.
pub struct RebalancingService {
    store: Arc<dyn ScheduleStore>,
    settings: Arc<SettingsService>,
    generator: SuggestionGenerator,
    estimator: ImpactEstimator,
    applier: SuggestionApplier,
    default_options: RebalancingOptions,
    cache: RwLock<AnalysisCache>,
}

impl RebalancingService {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        settings: Arc<SettingsService>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            applier: SuggestionApplier::new(Arc::clone(&store)),
            store,
            settings,
            generator: config.generator(),
            estimator: config.estimator(),
            default_options: config.default_options,
            cache: RwLock::new(AnalysisCache {
                analysis: None,
                options: config.default_options,
            }),
        }
    }

    pub fn compute_workload_metrics(&self) -> AppResult<WorkloadMetrics> {
        let schedule = self.store.schedule()?;
        let settings = self.settings.effective_settings()?;
        let channels = self.store.channels()?;
        Ok(WorkloadCalculator::calculate(&schedule, &settings, &channels))
    }

    pub fn detect_conflicts(&self) -> AppResult<Vec<TaskConflict>> {
        let schedule = self.store.schedule()?;
        Ok(detect_conflicts(&schedule.tasks))
    }

    /// Analyse the current snapshot and replace the cached analysis.
    pub fn analyze(&self, options: Option<RebalancingOptions>) -> AppResult<RebalancingAnalysis> {
        let options = options.unwrap_or(self.default_options);
        let schedule = self.store.schedule()?;
        let settings = self.settings.effective_settings()?;
        let channels = self.store.channels()?;

        let analysis = analyze_schedule(
            &schedule,
            &settings,
            &channels,
            &options,
            &self.generator,
            &self.estimator,
        );
        info!(
            target: "app::rebalancing",
            revision = analysis.schedule_revision,
            needs_rebalancing = analysis.needs_rebalancing,
            suggestions = analysis.suggestions.len(),
            quick_wins = analysis.quick_wins.len(),
            conflicts = analysis.conflicts.len(),
            "schedule analysed"
        );

        if let Ok(mut guard) = self.cache.write() {
            guard.analysis = Some(analysis.clone());
            guard.options = options;
        }
        Ok(analysis)
    }

    pub fn generate_suggestions(
        &self,
        options: Option<RebalancingOptions>,
    ) -> AppResult<Vec<RebalancingSuggestion>> {
        Ok(self.analyze(options)?.suggestions)
    }

    /// Quick wins of the cached analysis if it still matches the schedule,
    /// otherwise of a fresh one built with the last options used.
    pub fn quick_wins(&self) -> AppResult<Vec<RebalancingSuggestion>> {
        Ok(self.current_analysis()?.quick_wins)
    }

    pub fn cached_analysis(&self) -> Option<RebalancingAnalysis> {
        self.cache
            .read()
            .ok()
            .and_then(|guard| guard.analysis.clone())
    }

    /// Options of the most recent analysis, or the configured defaults.
    pub fn last_options(&self) -> RebalancingOptions {
        self.cache
            .read()
            .map(|guard| guard.options)
            .unwrap_or(self.default_options)
    }

    /// Looks `id` up in the suggestions the caller was last shown, even if the
    /// schedule has changed since. The applier skips actions whose task is gone.
    pub fn suggestion(&self, id: &str) -> AppResult<RebalancingSuggestion> {
        let analysis = self.shown_analysis()?;
        get_suggestion_by_id(&analysis.suggestions, id)
            .cloned()
            .ok_or_else(|| AppError::not_found("suggestion", id))
    }

    pub fn apply_suggestion(&self, id: &str) -> AppResult<ApplyResult> {
        let suggestion = self.suggestion(id)?;
        let result = self.applier.apply_suggestion(&suggestion);
        self.invalidate();
        result
    }

    pub fn apply_multiple_suggestions(&self, ids: &[String]) -> AppResult<MultiApplyResult> {
        let analysis = self.shown_analysis()?;
        let result = self.applier.apply_multiple(ids, &analysis.suggestions);
        self.invalidate();
        Ok(result)
    }

    /// Drops the cached analysis. The options it was built with are kept.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cache.write() {
            if guard.analysis.take().is_some() {
                debug!(target: "app::rebalancing", "analysis cache cleared");
            }
        }
    }

    fn current_analysis(&self) -> AppResult<RebalancingAnalysis> {
        let revision = self.store.schedule()?.revision;
        match self.cached_analysis() {
            Some(analysis) if analysis.schedule_revision == revision => Ok(analysis),
            _ => self.analyze(Some(self.last_options())),
        }
    }

    fn shown_analysis(&self) -> AppResult<RebalancingAnalysis> {
        match self.cached_analysis() {
            Some(analysis) => Ok(analysis),
            None => self.analyze(Some(self.last_options())),
        }
    }
}
