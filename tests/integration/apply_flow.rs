use std::sync::Arc;

use cadence_planner_lib::config::EngineConfig;
use cadence_planner_lib::error::AppError;
use cadence_planner_lib::models::rebalancing::{ActionType, RebalancingOptions, SuggestionType};
use cadence_planner_lib::models::schedule::WeeklySchedule;
use cadence_planner_lib::models::settings::UserSettings;
use cadence_planner_lib::models::task::{Channel, PriorityLevel, Task};
use cadence_planner_lib::services::rebalancing_service::RebalancingService;
use cadence_planner_lib::services::settings_service::SettingsService;
use cadence_planner_lib::services::suggestion_applier::SuggestionApplier;
use cadence_planner_lib::store::{InMemoryScheduleStore, ScheduleStore, TaskPatch};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

fn at(day_offset: i64, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap() + Duration::days(day_offset)
}

fn setup(tasks: Vec<Task>, capacity: f64) -> (Arc<InMemoryScheduleStore>, RebalancingService) {
    let store = Arc::new(InMemoryScheduleStore::new(
        WeeklySchedule::new(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), tasks, capacity),
        UserSettings::default().with_capacity(capacity),
        vec![
            Channel::new("gaming", "Gaming"),
            Channel::new("edu", "Educational"),
        ],
    ));
    let settings = Arc::new(SettingsService::new(store.clone()));
    let service = RebalancingService::new(store.clone(), settings, &EngineConfig::default());
    (store, service)
}

/// Friday holds 6h against a 4h daily limit while Monday has room.
fn friday_heavy_week() -> Vec<Task> {
    vec![
        Task::new("mon", "edu", "Outline", 1.0, at(0, 9)),
        Task::new("tue", "edu", "Research", 4.0, at(1, 9)),
        Task::new("wed", "gaming", "Record", 4.0, at(2, 9)),
        Task::new("thu", "gaming", "Edit", 4.0, at(3, 9)),
        Task::new("fri-a", "gaming", "Thumbnail", 2.0, at(4, 9)),
        Task::new("fri-b", "gaming", "Stream", 2.0, at(4, 11))
            .with_priority(PriorityLevel::High),
        Task::new("fri-c", "edu", "Upload", 2.0, at(4, 13)),
        Task::new("sat", "edu", "Community post", 2.0, at(5, 10)),
    ]
}

#[test]
fn test_quick_wins_are_low_effort_subset() {
    let (_, service) = setup(friday_heavy_week(), 20.0);
    let analysis = service.analyze(None).unwrap();

    assert!(analysis.needs_rebalancing);
    assert!(!analysis.quick_wins.is_empty());
    for win in &analysis.quick_wins {
        assert!(analysis.suggestions.contains(win));
        assert_eq!(win.estimated_effort, PriorityLevel::Low);
        assert!(win.impact.utilization_improvement >= 5.0);
    }

    let daily = analysis
        .suggestions
        .iter()
        .find(|s| s.suggestion_type == SuggestionType::RedistributeDaily)
        .expect("friday suggestion");
    assert_eq!(daily.id, "redistribute_daily-2025-03-07");
    assert_eq!(daily.actions.len(), 1);
    assert_eq!(daily.actions[0].task_id, "fri-a");
    assert_eq!(daily.impact.hours_reduced, 2.0);
    assert_eq!(daily.impact.utilization_improvement, 10.0);
    assert!(analysis.quick_wins.iter().any(|w| w.id == daily.id));
}

#[test]
fn test_applying_a_move_updates_the_store() {
    let (store, service) = setup(friday_heavy_week(), 20.0);
    service.analyze(None).unwrap();

    let result = service
        .apply_suggestion("redistribute_daily-2025-03-07")
        .unwrap();
    assert!(result.success);
    assert_eq!(result.summary, "Applied 1 of 1 suggested changes");

    let moved = store.task("fri-a").unwrap().unwrap();
    assert_eq!(moved.scheduled_start, at(0, 10));
    assert_eq!(moved.scheduled_end, at(0, 12));

    let metrics = service.compute_workload_metrics().unwrap();
    let friday = metrics
        .day(NaiveDate::from_ymd_opt(2025, 3, 7).unwrap())
        .unwrap();
    assert!(!friday.is_overloaded);
}

#[test]
fn test_deleted_tasks_are_skipped() {
    let (store, service) = setup(friday_heavy_week(), 20.0);
    let analysis = service.analyze(None).unwrap();
    let scope = analysis
        .suggestions
        .iter()
        .find(|s| s.suggestion_type == SuggestionType::ReduceScope)
        .expect("scope suggestion")
        .clone();

    for action in &scope.actions {
        store.remove_task(&action.task_id).unwrap();
    }

    let applier = SuggestionApplier::new(store.clone());
    let result = applier.apply_suggestion(&scope).unwrap();
    assert!(result.success);
    assert_eq!(result.applied, 0);
    assert_eq!(
        result.summary,
        format!("Applied 0 of {} suggested changes", scope.actions.len())
    );
}

#[test]
fn test_read_only_store_fails_the_apply() {
    let (store, service) = setup(friday_heavy_week(), 20.0);
    let analysis = service.analyze(None).unwrap();
    let id = analysis.suggestions[0].id.clone();

    store.set_read_only(true).unwrap();
    let err = service.apply_suggestion(&id).unwrap_err();
    assert!(matches!(err, AppError::StoreRejected { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_batch_skips_unknown_ids_and_reports_store_failures() {
    let (_store, service) = setup(friday_heavy_week(), 20.0);
    let analysis = service.analyze(None).unwrap();
    let scope = analysis
        .suggestions
        .iter()
        .find(|s| s.suggestion_type == SuggestionType::ReduceScope)
        .unwrap();
    assert!(scope
        .actions
        .iter()
        .all(|a| matches!(a.action_type, ActionType::RemoveTask | ActionType::ReduceScope)));

    let ids = vec![
        "redistribute_daily-2025-03-07".to_string(),
        "no-such-suggestion".to_string(),
        scope.id.clone(),
    ];
    let result = service.apply_multiple_suggestions(&ids).unwrap();
    assert!(result.success);
    assert_eq!(result.outcomes.len(), 3);
    assert_eq!(result.outcomes[1].applied, 0);
    assert!(result.applied_count >= 2);

    // A second batch against a read-only store reports the failure
    let (store_b, service_b) = setup(friday_heavy_week(), 20.0);
    let analysis_b = service_b.analyze(None).unwrap();
    store_b.set_read_only(true).unwrap();
    let ids_b: Vec<String> = analysis_b.suggestions.iter().map(|s| s.id.clone()).collect();
    let failed = service_b.apply_multiple_suggestions(&ids_b).unwrap();
    assert!(!failed.success);
    assert_eq!(failed.applied_count, 0);
    assert!(failed.error.is_some());
}

#[test]
fn test_shown_suggestion_survives_unrelated_writes() {
    // Gaming piles 8h onto Friday; cross-channel moves are turned off
    let tasks = vec![
        Task::new("g-mon", "gaming", "Clip review", 2.0, at(0, 9)),
        Task::new("g-fri-1", "gaming", "Stream prep", 2.0, at(4, 9)),
        Task::new("g-fri-2", "gaming", "Stream", 2.0, at(4, 11)),
        Task::new("g-fri-3", "gaming", "VOD edit", 2.0, at(4, 13)),
        Task::new("g-fri-4", "gaming", "Upload", 2.0, at(4, 15)),
        Task::new("e-tue", "edu", "Outline", 1.0, at(1, 9)),
        Task::new("e-wed", "edu", "Slides", 1.0, at(2, 9)),
    ];
    let (store, service) = setup(tasks, 10.0);
    let options = RebalancingOptions {
        max_daily_hours: Some(2.0),
        allow_cross_channel_rebalancing: false,
        preserve_deadlines: false,
    };
    let analysis = service.analyze(Some(options)).unwrap();
    let shown = analysis
        .suggestions
        .iter()
        .find(|s| s.id == "redistribute_daily-2025-03-07")
        .expect("friday suggestion")
        .clone();

    store
        .update_task(
            "e-wed",
            TaskPatch {
                actual_hours: Some(1.5),
                ..Default::default()
            },
        )
        .unwrap();
    store
        .insert_task(Task::new("e-sun", "edu", "Newsletter", 0.5, at(6, 10)))
        .unwrap();

    assert_eq!(service.suggestion(&shown.id).unwrap(), shown);
    let result = service.apply_suggestion(&shown.id).unwrap();
    assert!(result.success);
    assert_eq!(result.total, shown.actions.len());
    assert_eq!(result.applied, shown.actions.len());

    let moved = store.task(&shown.actions[0].task_id).unwrap().unwrap();
    let proposed = shown.actions[0].proposed_schedule.unwrap();
    assert_eq!(moved.scheduled_start, proposed.start);
    assert_eq!(service.last_options(), options);
}
