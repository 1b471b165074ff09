use std::io::Write;
use std::sync::Arc;

use cadence_planner_lib::commands::rebalancing::{
    analyze_schedule, apply_multiple_suggestions, generate_suggestions, get_quick_wins,
    ApplyMultiplePayload,
};
use cadence_planner_lib::commands::settings::{settings_get, settings_update, SettingsUpdatePayload};
use cadence_planner_lib::commands::task_status::{
    get_channel_completion_rate, get_time_accuracy, update_task_status, UpdateTaskStatusPayload,
};
use cadence_planner_lib::commands::templates::{
    generate_template_week, GenerateTemplateWeekPayload,
};
use cadence_planner_lib::commands::workload::{
    compute_workload_metrics, detect_conflicts, workload_recommendations,
};
use cadence_planner_lib::commands::AppState;
use cadence_planner_lib::config::EngineConfig;
use cadence_planner_lib::models::schedule::WeeklySchedule;
use cadence_planner_lib::models::settings::UserSettings;
use cadence_planner_lib::models::task::{Channel, PriorityLevel, Task, TaskStatus};
use cadence_planner_lib::models::template::{ContentTemplate, PostingCadence};
use cadence_planner_lib::models::workload::WorkloadRiskLevel;
use cadence_planner_lib::store::{InMemoryScheduleStore, ScheduleStore};
use cadence_planner_lib::{bootstrap, bootstrap_from_file};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

fn at(day_offset: i64, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap() + Duration::days(day_offset)
}

fn store(capacity: f64) -> Arc<InMemoryScheduleStore> {
    let tasks = vec![
        Task::new("mon", "edu", "Outline", 1.0, at(0, 9)),
        Task::new("tue", "edu", "Research", 4.0, at(1, 9)),
        Task::new("wed", "gaming", "Record", 4.0, at(2, 9)),
        Task::new("thu", "gaming", "Edit", 4.0, at(3, 9)),
        Task::new("fri-a", "gaming", "Thumbnail", 2.0, at(4, 9)),
        Task::new("fri-b", "gaming", "Stream", 2.0, at(4, 11))
            .with_priority(PriorityLevel::High),
        Task::new("fri-c", "edu", "Upload", 2.0, at(4, 13)),
        Task::new("sat", "edu", "Community post", 2.0, at(5, 10)),
    ];
    Arc::new(InMemoryScheduleStore::new(
        WeeklySchedule::new(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), tasks, capacity),
        UserSettings::default().with_capacity(capacity),
        vec![
            Channel::new("gaming", "Gaming"),
            Channel::new("edu", "Educational"),
        ],
    ))
}

fn state(capacity: f64) -> (Arc<InMemoryScheduleStore>, AppState) {
    let store = store(capacity);
    let state = bootstrap(store.clone(), EngineConfig::default(), None).unwrap();
    (store, state)
}

#[tokio::test]
async fn test_workload_commands() {
    let (_, state) = state(20.0);

    let metrics = compute_workload_metrics(&state).await.unwrap();
    assert!(metrics.is_overloaded);
    assert_eq!(metrics.utilization_percentage, 105.0);
    assert_eq!(metrics.risk_level, WorkloadRiskLevel::Critical);
    assert_eq!(metrics.channel_breakdown.len(), 2);

    let recommendations = workload_recommendations(&state).await.unwrap();
    assert!(!recommendations.is_empty());

    assert!(detect_conflicts(&state).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_suggestion_commands_and_batch_apply() {
    let (store, state) = state(20.0);

    let analysis = analyze_schedule(&state, None).await.unwrap();
    assert!(analysis.needs_rebalancing);

    let suggestions = generate_suggestions(&state, None).await.unwrap();
    assert_eq!(suggestions.len(), analysis.suggestions.len());

    let quick_wins = get_quick_wins(&state).await.unwrap();
    assert!(quick_wins
        .iter()
        .all(|win| suggestions.iter().any(|s| s.id == win.id)));

    let result = apply_multiple_suggestions(
        &state,
        ApplyMultiplePayload {
            suggestion_ids: vec![
                "redistribute_daily-2025-03-07".to_string(),
                "bogus".to_string(),
            ],
        },
    )
    .await
    .unwrap();
    assert!(result.success);
    assert_eq!(result.applied_count, 1);
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.outcomes[1].suggestion_id, "bogus");
    assert_eq!(result.outcomes[1].applied, 0);

    let moved = store.task("fri-a").unwrap().unwrap();
    assert_eq!(moved.scheduled_start, at(0, 10));
}

#[tokio::test]
async fn test_status_commands() {
    let (_, state) = state(20.0);

    let invalid = update_task_status(
        &state,
        UpdateTaskStatusPayload {
            task_id: "mon".into(),
            status: "finished".into(),
            actual_hours: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(invalid.code, "VALIDATION_ERROR");

    let missing = update_task_status(
        &state,
        UpdateTaskStatusPayload {
            task_id: "ghost".into(),
            status: "completed".into(),
            actual_hours: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(missing.code, "NOT_FOUND");

    let done = update_task_status(
        &state,
        UpdateTaskStatusPayload {
            task_id: "mon".into(),
            status: "completed".into(),
            actual_hours: Some(2.0),
        },
    )
    .await
    .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);

    let reopened = update_task_status(
        &state,
        UpdateTaskStatusPayload {
            task_id: "mon".into(),
            status: "planned".into(),
            actual_hours: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(reopened.code, "INVALID_TRANSITION");

    assert_eq!(
        get_channel_completion_rate(&state, "edu".into()).await.unwrap(),
        25
    );
    let accuracy = get_time_accuracy(&state, Some("edu".into())).await.unwrap();
    assert_eq!(accuracy.sample_count, 1);
    assert_eq!(accuracy.accuracy, 50);
    assert_eq!(get_time_accuracy(&state, None).await.unwrap().accuracy, 50);
}

#[tokio::test]
async fn test_settings_commands_refresh_analysis() {
    let (_, state) = state(20.0);
    assert!(analyze_schedule(&state, None).await.unwrap().needs_rebalancing);

    let rejected = settings_update(
        &state,
        SettingsUpdatePayload {
            weekly_capacity_hours: Some(-1.0),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(rejected.code, "VALIDATION_ERROR");

    let updated = settings_update(
        &state,
        SettingsUpdatePayload {
            weekly_capacity_hours: Some(40.0),
            timezone: Some("Europe/Berlin".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.weekly_capacity_hours, 40.0);
    assert_eq!(settings_get(&state).await.unwrap().timezone.as_deref(), Some("Europe/Berlin"));

    let analysis = analyze_schedule(&state, None).await.unwrap();
    assert!(!analysis.needs_rebalancing);
    assert!(analysis.suggestions.is_empty());

    let reset = settings_update(
        &state,
        SettingsUpdatePayload {
            reset_timezone: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(reset.timezone, None);
}

#[test]
fn test_bootstrap_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "quickWinMinImprovement: 15.0").unwrap();
    writeln!(file, "overdueSweepIntervalSecs: 60").unwrap();
    writeln!(file, "defaultOptions:").unwrap();
    writeln!(file, "  allowCrossChannelRebalancing: false").unwrap();

    let state = bootstrap_from_file(store(20.0), &path, None).unwrap();
    assert_eq!(state.config().quick_win_min_improvement, 15.0);
    assert_eq!(state.config().overdue_sweep_interval_secs, 60);
    assert!(!state.config().default_options.allow_cross_channel_rebalancing);

    // The 10% daily move no longer clears the raised bar
    let analysis = state.rebalancing().analyze(None).unwrap();
    assert!(analysis.quick_wins.is_empty());

    let bad = dir.path().join("bad.yaml");
    std::fs::write(&bad, "channelDisproportionRatio: 0.5\n").unwrap();
    assert!(bootstrap_from_file(store(20.0), &bad, None).is_err());
}

#[tokio::test]
async fn test_template_week_command() {
    let (store, state) = state(20.0);
    let template = ContentTemplate {
        id: "weekly-stream".into(),
        channel_id: "gaming".into(),
        title: "Stream".into(),
        estimated_hours: 2.0,
        priority: PriorityLevel::High,
        cadence: PostingCadence {
            days: vec![Weekday::Wed, Weekday::Mon],
            start_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        },
    };

    let tasks = generate_template_week(
        &state,
        GenerateTemplateWeekPayload {
            templates: vec![template.clone()],
            week_start: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].scheduled_start, at(0, 14));
    assert_eq!(tasks[1].scheduled_start, at(2, 14));
    assert!(tasks
        .iter()
        .all(|t| t.template_id.as_deref() == Some("weekly-stream")));
    // Generation is a preview
    assert_eq!(store.schedule().unwrap().tasks.len(), 8);

    let not_monday = generate_template_week(
        &state,
        GenerateTemplateWeekPayload {
            templates: vec![template],
            week_start: NaiveDate::from_ymd_opt(2025, 3, 4),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(not_monday.code, "VALIDATION_ERROR");
}
