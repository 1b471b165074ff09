use chrono::Datelike;
use tracing::{debug, warn};

use crate::models::settings::UserSettings;
use crate::models::task::Task;
use crate::models::workload::{OffHoursTask, TaskConflict, WorkingTimeViolation};
use crate::services::schedule_utils::{at_local, local_date};

/// Every pair of tasks whose `[start, end)` windows overlap, regardless of channel.
///
/// Tasks are swept in `(start, id)` order, so each pair is reported once with the
/// earlier task first.
pub fn detect_conflicts(tasks: &[Task]) -> Vec<TaskConflict> {
    let mut ordered: Vec<&Task> = tasks
        .iter()
        .filter(|task| {
            if task.has_valid_window() {
                true
            } else {
                warn!(
                    target: "app::conflicts",
                    task_id = %task.id,
                    "skipping task with invalid schedule window"
                );
                false
            }
        })
        .collect();
    ordered.sort_by(|a, b| {
        a.scheduled_start
            .cmp(&b.scheduled_start)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut conflicts = Vec::new();
    for (index, first) in ordered.iter().enumerate() {
        for second in ordered[index + 1..].iter() {
            if second.scheduled_start >= first.scheduled_end {
                break;
            }
            if first.id == second.id {
                continue;
            }
            let overlap_start = second.scheduled_start;
            let overlap_end = first.scheduled_end.min(second.scheduled_end);
            conflicts.push(TaskConflict {
                first_task_id: first.id.clone(),
                second_task_id: second.id.clone(),
                overlap_start,
                overlap_end,
                overlap_minutes: (overlap_end - overlap_start).num_minutes(),
                same_channel: first.channel_id == second.channel_id,
            });
        }
    }

    if !conflicts.is_empty() {
        debug!(target: "app::conflicts", count = conflicts.len(), "schedule conflicts detected");
    }
    conflicts
}

pub fn detect_outside_working_hours(tasks: &[Task], settings: &UserSettings) -> Vec<OffHoursTask> {
    let tz = settings.tz();
    let hours = settings.working_hours;

    tasks
        .iter()
        .filter(|task| task.has_valid_window())
        .filter_map(|task| {
            let date = local_date(task.scheduled_start, tz);
            let violation = if !settings.is_working_day(date.weekday()) {
                Some(WorkingTimeViolation::NonWorkingDay)
            } else if !hours.is_valid() {
                None
            } else {
                let day_start = at_local(date, hours.start, tz);
                let day_end = at_local(date, hours.end, tz);
                (task.scheduled_start < day_start || task.scheduled_end > day_end)
                    .then_some(WorkingTimeViolation::OutsideWorkingHours)
            };
            violation.map(|violation| OffHoursTask {
                task_id: task.id.clone(),
                violation,
            })
        })
        .collect()
}
