use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::{debug, info};

use crate::models::schedule::WeeklySchedule;
use crate::models::settings::{weekday_name, UserSettings};
use crate::models::task::{Channel, Task};
use crate::models::workload::{
    ChannelWorkload, DailyWorkload, WorkloadMetrics, WorkloadRiskLevel,
};
use crate::services::schedule_utils::{local_date, round1, HOURS_EPSILON};
use crate::services::task_status_service::calculate_channel_completion_rate;

const WARNING_UTILIZATION: f64 = 80.0;
const CRITICAL_UTILIZATION: f64 = 100.0;

/// Turns one schedule snapshot into aggregate, per-day and per-channel load figures.
pub struct WorkloadCalculator;

impl WorkloadCalculator {
    pub fn calculate(
        schedule: &WeeklySchedule,
        settings: &UserSettings,
        channels: &[Channel],
    ) -> WorkloadMetrics {
        let capacity = settings.weekly_capacity_hours.max(0.0);
        let total = schedule.total_scheduled_hours();
        let daily_threshold = settings.daily_threshold_hours();

        let utilization_percentage = percentage(total, capacity);
        let overload_hours = (total - capacity).max(0.0);
        let is_overloaded = total > capacity + HOURS_EPSILON;

        let daily_breakdown = daily_breakdown(schedule, settings, daily_threshold);
        let working_hours: Vec<f64> = daily_breakdown
            .iter()
            .filter(|day| day.is_working_day)
            .map(|day| day.scheduled_hours)
            .collect();
        let variance = population_variance(&working_hours);
        let distribution_efficiency = distribution_efficiency(&working_hours, variance);

        let channel_breakdown = channel_breakdown(&schedule.tasks, channels, total);
        let risk_level = risk_level(utilization_percentage);

        if is_overloaded {
            info!(
                target: "app::workload",
                week = %schedule.week_start_date,
                total_hours = total,
                capacity_hours = capacity,
                overload_hours,
                "week is over capacity"
            );
        } else {
            debug!(
                target: "app::workload",
                week = %schedule.week_start_date,
                total_hours = total,
                capacity_hours = capacity,
                "workload computed"
            );
        }

        WorkloadMetrics {
            total_scheduled_hours: total,
            capacity_hours: capacity,
            utilization_percentage,
            overload_hours,
            is_overloaded,
            daily_threshold_hours: daily_threshold,
            daily_breakdown,
            channel_breakdown,
            distribution_efficiency,
            variance,
            risk_level,
        }
    }

    /// Short guidance lines for the computed risk level.
    pub fn recommendations(metrics: &WorkloadMetrics) -> Vec<String> {
        let mut lines = match metrics.risk_level {
            WorkloadRiskLevel::Critical => vec![
                format!(
                    "Scheduled {:.1}h against a capacity of {:.1}h ({:.1}h over).",
                    metrics.total_scheduled_hours, metrics.capacity_hours, metrics.overload_hours
                ),
                "Move or trim low priority tasks before the week starts.".to_string(),
            ],
            WorkloadRiskLevel::Warning => vec![
                format!(
                    "Scheduled {:.1}h of {:.1}h available; little room for overruns.",
                    metrics.total_scheduled_hours, metrics.capacity_hours
                ),
                "Double-check estimates on the larger tasks.".to_string(),
            ],
            WorkloadRiskLevel::Ok => vec![format!(
                "Scheduled {:.1}h of {:.1}h available.",
                metrics.total_scheduled_hours, metrics.capacity_hours
            )],
        };

        let overloaded: Vec<String> = metrics
            .overloaded_days()
            .map(|day| day.day_name.clone())
            .collect();
        if !overloaded.is_empty() {
            lines.push(format!("Overloaded days: {}.", overloaded.join(", ")));
        }
        if metrics.distribution_efficiency < 50.0 && metrics.total_scheduled_hours > 0.0 {
            lines.push("Work is bunched on a few days; spread it across the week.".to_string());
        }
        lines
    }
}

fn daily_breakdown(
    schedule: &WeeklySchedule,
    settings: &UserSettings,
    threshold: f64,
) -> Vec<DailyWorkload> {
    let tz = settings.tz();
    schedule
        .week_days()
        .into_iter()
        .map(|date| {
            let weekday = date.weekday();
            let is_working_day = settings.is_working_day(weekday);
            let tasks: Vec<Task> = schedule
                .tasks
                .iter()
                .filter(|task| local_date(task.scheduled_start, tz) == date)
                .cloned()
                .collect();
            let scheduled_hours: f64 = tasks.iter().map(|task| task.estimated_hours).sum();
            let capacity_hours = if is_working_day { threshold } else { 0.0 };

            DailyWorkload {
                date,
                day_name: weekday_name(weekday).to_string(),
                is_working_day,
                scheduled_hours,
                capacity_hours,
                utilization: percentage(scheduled_hours, capacity_hours),
                is_overloaded: scheduled_hours > capacity_hours + HOURS_EPSILON,
                tasks,
            }
        })
        .collect()
}

fn channel_breakdown(tasks: &[Task], channels: &[Channel], total: f64) -> Vec<ChannelWorkload> {
    let mut names: BTreeMap<&str, &str> = BTreeMap::new();
    let mut order: Vec<&str> = Vec::new();
    for channel in channels {
        if names.insert(&channel.id, &channel.name).is_none() {
            order.push(&channel.id);
        }
    }
    for task in tasks {
        if !names.contains_key(task.channel_id.as_str()) {
            debug!(target: "app::workload", channel_id = %task.channel_id, "task references unknown channel");
            names.insert(&task.channel_id, &task.channel_id);
            order.push(&task.channel_id);
        }
    }

    order
        .into_iter()
        .map(|channel_id| {
            let owned: Vec<&Task> = tasks
                .iter()
                .filter(|task| task.channel_id == channel_id)
                .collect();
            let scheduled_hours: f64 = owned.iter().map(|task| task.estimated_hours).sum();
            ChannelWorkload {
                channel_id: channel_id.to_string(),
                channel_name: names.get(channel_id).copied().unwrap_or(channel_id).to_string(),
                scheduled_hours,
                task_count: owned.len(),
                completion_rate: calculate_channel_completion_rate(tasks, channel_id),
                percentage_of_total: if total > 0.0 {
                    round1(scheduled_hours / total * 100.0)
                } else {
                    0.0
                },
            }
        })
        .collect()
}

/// Zero capacity reads as fully used once anything is scheduled.
fn percentage(hours: f64, capacity: f64) -> f64 {
    if capacity <= HOURS_EPSILON {
        return if hours > 0.0 { 100.0 } else { 0.0 };
    }
    round1(hours / capacity * 100.0)
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Coefficient of variation scaled by its maximum, `sqrt(n - 1)`, reached when
/// every hour sits on a single day.
fn distribution_efficiency(values: &[f64], variance: f64) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 100.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean <= HOURS_EPSILON {
        return 100.0;
    }
    let cv = variance.sqrt() / mean;
    let max_cv = ((n - 1) as f64).sqrt();
    round1((100.0 * (1.0 - cv / max_cv)).clamp(0.0, 100.0))
}

fn risk_level(utilization: f64) -> WorkloadRiskLevel {
    if utilization >= CRITICAL_UTILIZATION {
        WorkloadRiskLevel::Critical
    } else if utilization >= WARNING_UTILIZATION {
        WorkloadRiskLevel::Warning
    } else {
        WorkloadRiskLevel::Ok
    }
}
