use cadence_planner_lib::models::rebalancing::{
    RebalancingAnalysis, RebalancingOptions, SuggestionType,
};
use cadence_planner_lib::models::schedule::WeeklySchedule;
use cadence_planner_lib::models::settings::UserSettings;
use cadence_planner_lib::models::task::{Channel, PriorityLevel, Task};
use cadence_planner_lib::services::conflict_detector::detect_conflicts;
use cadence_planner_lib::services::impact_estimator::{by_priority, by_type, ImpactEstimator};
use cadence_planner_lib::services::rebalancing_service::analyze_schedule;
use cadence_planner_lib::services::suggestion_generator::SuggestionGenerator;
use cadence_planner_lib::services::workload_calculator::WorkloadCalculator;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

fn week_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn at(day_offset: i64, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap() + Duration::days(day_offset)
}

fn channels() -> Vec<Channel> {
    vec![
        Channel::new("gaming", "Gaming"),
        Channel::new("edu", "Educational"),
    ]
}

/// 22 hours across both channels, heaviest at the end of the week.
fn overloaded_tasks() -> Vec<Task> {
    vec![
        Task::new("g-mon", "gaming", "Stream highlights", 4.0, at(0, 9)),
        Task::new("g-wed", "gaming", "Record let's play", 3.0, at(2, 9)),
        Task::new("g-thu", "gaming", "Edit let's play", 4.0, at(3, 9)),
        Task::new("g-fri", "gaming", "Live stream", 3.0, at(4, 9))
            .with_priority(PriorityLevel::High),
        Task::new("e-tue", "edu", "Research lesson", 2.0, at(1, 9)),
        Task::new("e-thu", "edu", "Write script", 2.0, at(3, 14)),
        Task::new("e-fri", "edu", "Record lesson", 2.0, at(4, 13))
            .with_priority(PriorityLevel::Low),
        Task::new("e-sat", "edu", "Thumbnail batch", 2.0, at(5, 10)),
    ]
}

fn analyse(tasks: Vec<Task>, capacity: f64, options: RebalancingOptions) -> RebalancingAnalysis {
    let settings = UserSettings::default().with_capacity(capacity);
    let schedule = WeeklySchedule::new(week_start(), tasks, capacity);
    analyze_schedule(
        &schedule,
        &settings,
        &channels(),
        &options,
        &SuggestionGenerator::default(),
        &ImpactEstimator::default(),
    )
}

#[test]
fn test_balanced_week_needs_no_rebalancing() {
    let analysis = analyse(
        vec![Task::new("only", "gaming", "Stream", 4.0, at(1, 10))],
        40.0,
        RebalancingOptions::default(),
    );

    assert!(!analysis.needs_rebalancing);
    assert!(analysis.suggestions.is_empty());
    assert!(analysis.quick_wins.is_empty());
    assert_eq!(analysis.metrics.utilization_percentage, 10.0);
}

#[test]
fn test_overloaded_week_produces_partitioned_suggestions() {
    let analysis = analyse(overloaded_tasks(), 15.0, RebalancingOptions::default());

    assert!(analysis.metrics.is_overloaded);
    assert!((analysis.metrics.total_scheduled_hours - 22.0).abs() < 1e-9);
    assert!((analysis.metrics.overload_hours - 7.0).abs() < 1e-9);
    assert!(!analysis.suggestions.is_empty());

    let high = by_priority(&analysis.suggestions, PriorityLevel::High).len();
    let medium = by_priority(&analysis.suggestions, PriorityLevel::Medium).len();
    let low = by_priority(&analysis.suggestions, PriorityLevel::Low).len();
    assert_eq!(high + medium + low, analysis.suggestions.len());

    // Ranked: priority never increases down the list
    for pair in analysis.suggestions.windows(2) {
        assert!(pair[0].priority >= pair[1].priority);
    }

    // High priority work is never proposed for removal
    let scope = by_type(&analysis.suggestions, SuggestionType::ReduceScope);
    assert_eq!(scope.len(), 1);
    assert!(scope[0].actions.iter().all(|a| a.task_id != "g-fri"));
    assert_eq!(scope[0].actions[0].task_id, "e-fri");
}

#[test]
fn test_total_impact_is_sum_of_suggestions() {
    let analysis = analyse(overloaded_tasks(), 15.0, RebalancingOptions::default());

    let hours: f64 = analysis
        .suggestions
        .iter()
        .map(|s| s.impact.hours_reduced)
        .sum();
    let tasks: usize = analysis
        .suggestions
        .iter()
        .map(|s| s.impact.affected_tasks)
        .sum();
    assert!((analysis.total_potential_impact.hours_reduced - hours).abs() < 1e-9);
    assert_eq!(analysis.total_potential_impact.affected_tasks, tasks);
    for suggestion in &analysis.suggestions {
        assert_eq!(suggestion.impact.affected_tasks, suggestion.actions.len());
    }
}

#[test]
fn test_cross_channel_toggle() {
    // Gaming carries 10 of 12 hours, mostly on Friday
    let tasks = vec![
        Task::new("g-mon", "gaming", "Clip review", 2.0, at(0, 9)),
        Task::new("g-fri-1", "gaming", "Stream prep", 2.0, at(4, 9)),
        Task::new("g-fri-2", "gaming", "Stream", 2.0, at(4, 11)),
        Task::new("g-fri-3", "gaming", "VOD edit", 2.0, at(4, 13)),
        Task::new("g-fri-4", "gaming", "Upload", 2.0, at(4, 15)),
        Task::new("e-tue", "edu", "Outline", 1.0, at(1, 9)),
        Task::new("e-wed", "edu", "Slides", 1.0, at(2, 9)),
    ];

    let enabled = analyse(tasks.clone(), 10.0, RebalancingOptions::default());
    let channel = by_type(&enabled.suggestions, SuggestionType::RedistributeChannel);
    assert_eq!(channel.len(), 1);
    assert_eq!(channel[0].id, "redistribute_channel-gaming");
    for action in &channel[0].actions {
        assert_eq!(action.channel_id, "gaming");
        let proposed = action.proposed_schedule.expect("re-timed slot");
        assert!(proposed.start < action.current_schedule.start);
    }

    let disabled = analyse(
        tasks,
        10.0,
        RebalancingOptions {
            allow_cross_channel_rebalancing: false,
            ..RebalancingOptions::default()
        },
    );
    assert!(by_type(&disabled.suggestions, SuggestionType::RedistributeChannel).is_empty());
    assert!(!by_type(&disabled.suggestions, SuggestionType::RedistributeDaily).is_empty());
    assert!(!by_type(&disabled.suggestions, SuggestionType::ReduceScope).is_empty());
}

#[test]
fn test_generation_is_deterministic() {
    let first = analyse(overloaded_tasks(), 15.0, RebalancingOptions::default());
    let mut reversed = overloaded_tasks();
    reversed.reverse();
    let second = analyse(reversed, 15.0, RebalancingOptions::default());

    let ids = |a: &RebalancingAnalysis| {
        a.suggestions
            .iter()
            .map(|s| (s.id.clone(), s.actions.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn test_overlapping_tasks_reported_once() {
    let tasks = vec![
        Task::new("morning", "gaming", "Record", 4.0, at(2, 9)),
        Task::new("midday", "edu", "Script", 4.0, at(2, 11)),
        Task::new("evening", "edu", "Upload", 1.0, at(2, 18)),
    ];
    let conflicts = detect_conflicts(&tasks);

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].first_task_id, "morning");
    assert_eq!(conflicts[0].second_task_id, "midday");
    assert_eq!(conflicts[0].overlap_minutes, 120);
    assert!(!conflicts[0].same_channel);
}

#[test]
fn test_totals_hold_for_many_capacities() {
    let tasks = overloaded_tasks();
    let expected: f64 = tasks.iter().map(|t| t.estimated_hours).sum();

    for capacity in [0.0, 10.0, 21.9, 22.0, 22.1, 40.0] {
        let schedule = WeeklySchedule::new(week_start(), tasks.clone(), capacity);
        let settings = UserSettings::default().with_capacity(capacity);
        let metrics = WorkloadCalculator::calculate(&schedule, &settings, &channels());
        assert!((metrics.total_scheduled_hours - expected).abs() < 1e-9);
        assert_eq!(metrics.is_overloaded, expected > capacity, "capacity {capacity}");
        assert_eq!(schedule.is_overloaded(), expected > capacity);
    }
}
