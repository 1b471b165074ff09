use std::sync::Arc;
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use cadence_planner_lib::error::AppError;
use cadence_planner_lib::models::schedule::WeeklySchedule;
use cadence_planner_lib::models::settings::UserSettings;
use cadence_planner_lib::models::task::{Channel, Task, TaskStatus};
use cadence_planner_lib::services::task_status_service::{EstimateBias, TaskStatusService};
use cadence_planner_lib::store::{InMemoryScheduleStore, ScheduleStore};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

fn at(day_offset: i64, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap() + Duration::days(day_offset)
}

fn setup() -> (Arc<InMemoryScheduleStore>, Arc<TaskStatusService>) {
    let tasks = vec![
        Task::new("g1", "gaming", "Record", 2.0, at(0, 9)),
        Task::new("g2", "gaming", "Edit", 3.0, at(1, 9)),
        Task::new("g3", "gaming", "Upload", 1.0, at(2, 9)),
        Task::new("e1", "edu", "Script", 4.0, at(3, 9)),
    ];
    let store = Arc::new(InMemoryScheduleStore::new(
        WeeklySchedule::new(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), tasks, 40.0),
        UserSettings::default(),
        vec![
            Channel::new("gaming", "Gaming"),
            Channel::new("edu", "Educational"),
        ],
    ));
    let service = Arc::new(TaskStatusService::new(store.clone()));
    (store, service)
}

#[test]
fn test_completion_rate_tracks_completed_tasks() {
    let (_, service) = setup();
    assert_eq!(service.channel_completion_rate("gaming").unwrap(), 0);

    let done = service
        .update_task_status_at("g1", TaskStatus::Completed, Some(2.5), at(0, 10))
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.completed_at, Some(at(0, 10)));

    assert_eq!(service.channel_completion_rate("gaming").unwrap(), 33);
    assert_eq!(service.channel_completion_rate("edu").unwrap(), 0);
    assert_eq!(service.channel_completion_rate("unknown").unwrap(), 0);
}

#[test]
fn test_time_accuracy_report() {
    let (_, service) = setup();
    let empty = service.time_accuracy().unwrap();
    assert_eq!(empty.sample_count, 0);
    assert_eq!(empty.accuracy, 100);

    service
        .update_task_status_at("g1", TaskStatus::Completed, Some(3.0), at(0, 10))
        .unwrap();
    service
        .update_task_status_at("e1", TaskStatus::Completed, None, at(3, 12))
        .unwrap();

    // Estimated 6h, actual 7h
    let report = service.time_accuracy().unwrap();
    assert_eq!(report.sample_count, 2);
    assert_eq!(report.accuracy, 86);
    assert_eq!(report.bias, EstimateBias::Underestimated);

    let edu = service.channel_time_accuracy("edu").unwrap();
    assert_eq!(edu.accuracy, 100);
    assert_eq!(edu.bias, EstimateBias::Accurate);
}

#[test]
fn test_completed_tasks_cannot_be_reopened() {
    let (store, service) = setup();
    service
        .update_task_status_at("g2", TaskStatus::Completed, None, at(1, 10))
        .unwrap();

    let err = service
        .update_task_status_at("g2", TaskStatus::InProgress, None, at(1, 11))
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));
    assert_eq!(store.task("g2").unwrap().unwrap().status, TaskStatus::Completed);

    let missing = service.update_task_status("nope", TaskStatus::InProgress, None);
    assert!(matches!(missing, Err(AppError::NotFound { .. })));
}

#[test]
fn test_sweep_marks_overdue_once() {
    let (store, service) = setup();
    let changes = service.sweep_overdue(at(2, 18)).unwrap();
    let ids: Vec<&str> = changes.iter().map(|c| c.task_id.as_str()).collect();
    assert_eq!(ids, vec!["g1", "g2", "g3"]);
    assert_eq!(store.task("e1").unwrap().unwrap().status, TaskStatus::Planned);

    assert!(service.sweep_overdue(at(2, 18)).unwrap().is_empty());
}

#[test]
fn test_background_sweep_runs_until_stopped() {
    let (store, service) = setup();
    let handle = service
        .start_overdue_sweep(StdDuration::from_millis(20))
        .unwrap();
    assert!(service.is_sweep_running());
    assert!(service.start_overdue_sweep(StdDuration::from_millis(20)).is_err());

    // Every task ended in the past, so the first pass marks all of them
    let deadline = Instant::now() + StdDuration::from_secs(2);
    loop {
        let status = store.task("e1").unwrap().unwrap().status;
        if status == TaskStatus::Overdue || Instant::now() > deadline {
            break;
        }
        thread::sleep(StdDuration::from_millis(10));
    }
    assert_eq!(store.task("e1").unwrap().unwrap().status, TaskStatus::Overdue);

    handle.stop();
    assert!(!service.is_sweep_running());
}
