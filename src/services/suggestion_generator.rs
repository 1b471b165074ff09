use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::models::rebalancing::{
    ActionType, RebalancingAction, RebalancingOptions, ScheduleSlot, SuggestionType,
};
use crate::models::schedule::WeeklySchedule;
use crate::models::settings::{weekday_name, UserSettings};
use crate::models::task::{PriorityLevel, Task};
use crate::models::workload::WorkloadMetrics;
use crate::services::schedule_utils::{
    at_local, duration_hours, hours_to_duration, local_date, HOURS_EPSILON,
};

pub const DEFAULT_CHANNEL_DISPROPORTION_RATIO: f64 = 1.25;
pub const DEFAULT_MIN_TRIMMED_TASK_HOURS: f64 = 0.5;

/// A suggestion before impact, priority and effort are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionDraft {
    pub id: String,
    pub suggestion_type: SuggestionType,
    pub title: String,
    pub description: String,
    pub actions: Vec<RebalancingAction>,
    /// Overload the draft was built to clear: a day's excess, a channel's share
    /// above fair, or the weekly overload.
    pub target_overload_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuggestionGenerator {
    pub channel_disproportion_ratio: f64,
    pub min_trimmed_task_hours: f64,
}

impl Default for SuggestionGenerator {
    fn default() -> Self {
        Self {
            channel_disproportion_ratio: DEFAULT_CHANNEL_DISPROPORTION_RATIO,
            min_trimmed_task_hours: DEFAULT_MIN_TRIMMED_TASK_HOURS,
        }
    }
}

impl SuggestionGenerator {
    pub fn new(channel_disproportion_ratio: f64, min_trimmed_task_hours: f64) -> Self {
        Self {
            channel_disproportion_ratio,
            min_trimmed_task_hours,
        }
    }

    /// Run the daily, cross-channel and scope strategies in that order.
    ///
    /// Returns nothing for a week within capacity. Output is deterministic for a
    /// given snapshot.
    pub fn generate(
        &self,
        schedule: &WeeklySchedule,
        settings: &UserSettings,
        options: &RebalancingOptions,
        metrics: &WorkloadMetrics,
    ) -> Vec<SuggestionDraft> {
        if !metrics.is_overloaded {
            return Vec::new();
        }

        let threshold = resolve_daily_threshold(options, metrics);
        let mut drafts = self.redistribute_daily(schedule, settings, options, metrics, threshold);
        drafts.extend(self.redistribute_channels(schedule, settings, options, metrics, threshold));
        drafts.extend(self.reduce_scope(schedule, metrics));

        info!(
            target: "app::rebalancing",
            week = %schedule.week_start_date,
            suggestions = drafts.len(),
            overload_hours = metrics.overload_hours,
            "rebalancing suggestions generated"
        );
        drafts
    }

    /// One draft per overloaded day, moving its smallest sufficient tasks to the
    /// working day with the most slack.
    pub fn redistribute_daily(
        &self,
        schedule: &WeeklySchedule,
        settings: &UserSettings,
        options: &RebalancingOptions,
        metrics: &WorkloadMetrics,
        threshold: f64,
    ) -> Vec<SuggestionDraft> {
        let mut planner = DayPlanner::new(schedule, settings, metrics, threshold);

        let mut overloaded: Vec<(NaiveDate, f64)> = schedule
            .week_days()
            .into_iter()
            .filter_map(|date| {
                let excess = planner.excess(date);
                (excess > HOURS_EPSILON).then_some((date, excess))
            })
            .collect();
        overloaded.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut drafts = Vec::new();
        for (date, excess) in overloaded {
            let mut pool: Vec<Task> = planner
                .tasks_on(schedule, date)
                .into_iter()
                .filter(|task| task.is_movable() && task.has_valid_window())
                .cloned()
                .collect();

            let mut actions = Vec::new();
            let mut remaining = planner.excess(date);
            while remaining > HOURS_EPSILON && !pool.is_empty() {
                let index = pick_smallest_sufficient(&pool, remaining);
                let task = pool.remove(index);

                let Some(target) =
                    planner.pick_target(date, task.estimated_hours, options.preserve_deadlines)
                else {
                    debug!(
                        target: "app::rebalancing",
                        task_id = %task.id,
                        %date,
                        "no day with room for task"
                    );
                    continue;
                };

                let spare = planner.spare(target);
                let proposed = planner.commit_move(&task, date, target);
                actions.push(move_action(
                    &task,
                    proposed,
                    format!(
                        "{} is {:.1}h over its {:.1}h limit; {} has {:.1}h free",
                        day_label(date),
                        remaining,
                        planner.capacity(date),
                        day_label(target),
                        spare
                    ),
                ));
                remaining -= task.estimated_hours;
            }

            if actions.is_empty() {
                continue;
            }
            let moved: f64 = actions.iter().map(|a| a.current_schedule.hours).sum();
            drafts.push(SuggestionDraft {
                id: format!("{}-{}", SuggestionType::RedistributeDaily, date),
                suggestion_type: SuggestionType::RedistributeDaily,
                title: format!("Lighten {}", weekday_name(date.weekday())),
                description: format!(
                    "Move {} task(s) totalling {:.1}h off {} to days with spare capacity.",
                    actions.len(),
                    moved,
                    day_label(date)
                ),
                actions,
                target_overload_hours: excess,
            });
        }
        drafts
    }

    /// One draft per channel carrying more than its fair share of the week,
    /// re-timing its tasks off overloaded days. Tasks keep their channel.
    pub fn redistribute_channels(
        &self,
        schedule: &WeeklySchedule,
        settings: &UserSettings,
        options: &RebalancingOptions,
        metrics: &WorkloadMetrics,
        threshold: f64,
    ) -> Vec<SuggestionDraft> {
        if !options.allow_cross_channel_rebalancing {
            debug!(target: "app::rebalancing", "cross-channel rebalancing disabled");
            return Vec::new();
        }

        let loaded: Vec<_> = metrics
            .channel_breakdown
            .iter()
            .filter(|channel| channel.scheduled_hours > HOURS_EPSILON)
            .collect();
        if loaded.len() < 2 {
            return Vec::new();
        }
        let fair_share = metrics.total_scheduled_hours / loaded.len() as f64;
        let limit = fair_share * self.channel_disproportion_ratio;

        let mut heavy: Vec<_> = loaded
            .into_iter()
            .filter(|channel| channel.scheduled_hours > limit + HOURS_EPSILON)
            .collect();
        heavy.sort_by(|a, b| {
            b.scheduled_hours
                .total_cmp(&a.scheduled_hours)
                .then_with(|| a.channel_id.cmp(&b.channel_id))
        });

        let tz = settings.tz();
        let mut planner = DayPlanner::new(schedule, settings, metrics, threshold);
        let mut drafts = Vec::new();

        for channel in heavy {
            let mut candidates: Vec<&Task> = schedule
                .tasks
                .iter()
                .filter(|task| {
                    task.channel_id == channel.channel_id
                        && task.is_movable()
                        && task.has_valid_window()
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.estimated_hours
                    .total_cmp(&a.estimated_hours)
                    .then_with(|| a.id.cmp(&b.id))
            });

            let mut actions = Vec::new();
            for task in candidates {
                let source = local_date(task.scheduled_start, tz);
                if !schedule.contains_date(source) || planner.excess(source) <= HOURS_EPSILON {
                    continue;
                }
                let Some(target) =
                    planner.pick_target(source, task.estimated_hours, options.preserve_deadlines)
                else {
                    continue;
                };
                let proposed = planner.commit_move(task, source, target);
                actions.push(move_action(
                    task,
                    proposed,
                    format!(
                        "{} carries {:.1}h against a fair share of {:.1}h; {} is over its limit",
                        channel.channel_name,
                        channel.scheduled_hours,
                        fair_share,
                        day_label(source)
                    ),
                ));
            }

            if actions.is_empty() {
                continue;
            }
            drafts.push(SuggestionDraft {
                id: format!("{}-{}", SuggestionType::RedistributeChannel, channel.channel_id),
                suggestion_type: SuggestionType::RedistributeChannel,
                title: format!("Spread out {} work", channel.channel_name),
                description: format!(
                    "{} holds {:.0}% of the week. Re-time {} of its task(s) into quieter days.",
                    channel.channel_name,
                    channel.percentage_of_total,
                    actions.len()
                ),
                actions,
                target_overload_hours: channel.scheduled_hours - fair_share,
            });
        }
        drafts
    }

    /// Re-timing never lowers the weekly total, so any weekly overload is left
    /// to this strategy: drop or trim the least important work to close the gap.
    pub fn reduce_scope(
        &self,
        schedule: &WeeklySchedule,
        metrics: &WorkloadMetrics,
    ) -> Vec<SuggestionDraft> {
        let gap = metrics.overload_hours;
        if gap <= HOURS_EPSILON {
            return Vec::new();
        }

        let completion: BTreeMap<&str, u32> = metrics
            .channel_breakdown
            .iter()
            .map(|channel| (channel.channel_id.as_str(), channel.completion_rate))
            .collect();
        let rate = |task: &Task| completion.get(task.channel_id.as_str()).copied().unwrap_or(0);

        let mut candidates: Vec<&Task> = schedule
            .tasks
            .iter()
            .filter(|task| {
                task.is_movable() && task.has_valid_window() && task.priority != PriorityLevel::High
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.scheduled_end.cmp(&a.scheduled_end))
                .then_with(|| rate(*a).cmp(&rate(*b)))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut actions = Vec::new();
        let mut remaining = gap;
        for task in candidates {
            if remaining <= HOURS_EPSILON {
                break;
            }
            let current = slot_of(task);
            if task.estimated_hours <= remaining + HOURS_EPSILON {
                actions.push(RebalancingAction {
                    action_type: ActionType::RemoveTask,
                    task_id: task.id.clone(),
                    task_title: task.title.clone(),
                    channel_id: task.channel_id.clone(),
                    current_schedule: current,
                    proposed_schedule: None,
                    reason: format!(
                        "{} priority and not due until {}",
                        task.priority,
                        task.scheduled_end.format("%a %H:%M")
                    ),
                });
                remaining -= task.estimated_hours;
                continue;
            }

            let trimmed = task.estimated_hours - remaining;
            if trimmed + HOURS_EPSILON >= self.min_trimmed_task_hours {
                let end = task.scheduled_start + hours_to_duration(trimmed);
                actions.push(RebalancingAction {
                    action_type: ActionType::ReduceScope,
                    task_id: task.id.clone(),
                    task_title: task.title.clone(),
                    channel_id: task.channel_id.clone(),
                    current_schedule: current,
                    proposed_schedule: Some(ScheduleSlot {
                        start: task.scheduled_start,
                        end,
                        hours: trimmed,
                    }),
                    reason: format!(
                        "Trim {:.1}h from this {} priority task to close the remaining gap",
                        remaining, task.priority
                    ),
                });
            } else {
                actions.push(RebalancingAction {
                    action_type: ActionType::RemoveTask,
                    task_id: task.id.clone(),
                    task_title: task.title.clone(),
                    channel_id: task.channel_id.clone(),
                    current_schedule: current,
                    proposed_schedule: None,
                    reason: format!(
                        "Only {:.1}h would remain after trimming; drop it instead",
                        trimmed
                    ),
                });
            }
            remaining = 0.0;
        }

        if actions.is_empty() {
            debug!(target: "app::rebalancing", gap, "no low or medium priority work left to trim");
            return Vec::new();
        }
        let freed: f64 = actions.iter().map(RebalancingAction::hours_relieved).sum();
        vec![SuggestionDraft {
            id: format!("{}-week", SuggestionType::ReduceScope),
            suggestion_type: SuggestionType::ReduceScope,
            title: "Reduce this week's scope".to_string(),
            description: format!(
                "The week is {:.1}h over capacity. Drop or trim {} lower priority task(s) to free {:.1}h.",
                gap,
                actions.len(),
                freed
            ),
            actions,
            target_overload_hours: gap,
        }]
    }
}

fn resolve_daily_threshold(options: &RebalancingOptions, metrics: &WorkloadMetrics) -> f64 {
    match options.max_daily_hours {
        Some(hours) if hours.is_finite() && hours > 0.0 => hours,
        Some(hours) => {
            warn!(
                target: "app::rebalancing",
                max_daily_hours = hours,
                "ignoring invalid daily limit override"
            );
            metrics.daily_threshold_hours
        }
        None => metrics.daily_threshold_hours,
    }
}

/// Smallest task that alone clears `remaining`; otherwise the largest. Ties by id.
fn pick_smallest_sufficient(pool: &[Task], remaining: f64) -> usize {
    let by_hours_then_id = |a: &&Task, b: &&Task| {
        a.estimated_hours
            .total_cmp(&b.estimated_hours)
            .then_with(|| a.id.cmp(&b.id))
    };

    let sufficient = pool
        .iter()
        .filter(|task| task.estimated_hours + HOURS_EPSILON >= remaining)
        .min_by(by_hours_then_id);
    let chosen = sufficient.or_else(|| {
        pool.iter().max_by(|a, b| {
            a.estimated_hours
                .total_cmp(&b.estimated_hours)
                .then_with(|| b.id.cmp(&a.id))
        })
    });

    chosen
        .and_then(|task| pool.iter().position(|candidate| candidate.id == task.id))
        .unwrap_or(0)
}

fn slot_of(task: &Task) -> ScheduleSlot {
    ScheduleSlot {
        start: task.scheduled_start,
        end: task.scheduled_end,
        hours: task.estimated_hours,
    }
}

fn move_action(task: &Task, proposed: ScheduleSlot, reason: String) -> RebalancingAction {
    RebalancingAction {
        action_type: ActionType::MoveTask,
        task_id: task.id.clone(),
        task_title: task.title.clone(),
        channel_id: task.channel_id.clone(),
        current_schedule: slot_of(task),
        proposed_schedule: Some(proposed),
        reason,
    }
}

fn day_label(date: NaiveDate) -> String {
    format!("{} {}", weekday_name(date.weekday()), date.format("%b %-d"))
}

/// Simulated day loads and busy windows, updated as moves are committed so
/// later moves in the same pass see earlier ones.
struct DayPlanner<'a> {
    settings: &'a UserSettings,
    tz: Tz,
    threshold: f64,
    week: Vec<NaiveDate>,
    loads: BTreeMap<NaiveDate, f64>,
    busy: BTreeMap<NaiveDate, Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    moved: HashSet<String>,
}

impl<'a> DayPlanner<'a> {
    fn new(
        schedule: &WeeklySchedule,
        settings: &'a UserSettings,
        metrics: &WorkloadMetrics,
        threshold: f64,
    ) -> Self {
        let mut loads = BTreeMap::new();
        let mut busy: BTreeMap<NaiveDate, Vec<_>> = BTreeMap::new();
        for day in &metrics.daily_breakdown {
            loads.insert(day.date, day.scheduled_hours);
            busy.insert(
                day.date,
                day.tasks
                    .iter()
                    .filter(|task| task.has_valid_window())
                    .map(|task| (task.scheduled_start, task.scheduled_end))
                    .collect(),
            );
        }
        Self {
            settings,
            tz: settings.tz(),
            threshold,
            week: schedule.week_days(),
            loads,
            busy,
            moved: HashSet::new(),
        }
    }

    fn capacity(&self, date: NaiveDate) -> f64 {
        if self.settings.is_working_day(date.weekday()) {
            self.threshold
        } else {
            0.0
        }
    }

    fn load(&self, date: NaiveDate) -> f64 {
        self.loads.get(&date).copied().unwrap_or(0.0)
    }

    fn excess(&self, date: NaiveDate) -> f64 {
        self.load(date) - self.capacity(date)
    }

    fn spare(&self, date: NaiveDate) -> f64 {
        (self.capacity(date) - self.load(date)).max(0.0)
    }

    fn tasks_on<'s>(&self, schedule: &'s WeeklySchedule, date: NaiveDate) -> Vec<&'s Task> {
        schedule
            .tasks
            .iter()
            .filter(|task| !self.moved.contains(&task.id))
            .filter(|task| local_date(task.scheduled_start, self.tz) == date)
            .collect()
    }

    /// Working day with the most slack that fits `hours`; earliest date on ties.
    /// With `preserve_deadlines` only days before `source` qualify.
    fn pick_target(&self, source: NaiveDate, hours: f64, preserve_deadlines: bool) -> Option<NaiveDate> {
        self.week
            .iter()
            .copied()
            .filter(|date| *date != source)
            .filter(|date| !preserve_deadlines || *date < source)
            .filter(|date| self.settings.is_working_day(date.weekday()))
            .filter(|date| self.spare(*date) + HOURS_EPSILON >= hours)
            .fold(None, |best: Option<NaiveDate>, date| match best {
                Some(current) => match self.spare(date).total_cmp(&self.spare(current)) {
                    Ordering::Greater => Some(date),
                    _ => Some(current),
                },
                None => Some(date),
            })
    }

    fn commit_move(&mut self, task: &Task, source: NaiveDate, target: NaiveDate) -> ScheduleSlot {
        let (start, end) = self.find_slot(target, task.window());

        *self.loads.entry(source).or_insert(0.0) -= task.estimated_hours;
        *self.loads.entry(target).or_insert(0.0) += task.estimated_hours;
        if let Some(windows) = self.busy.get_mut(&source) {
            if let Some(index) = windows
                .iter()
                .position(|window| *window == (task.scheduled_start, task.scheduled_end))
            {
                windows.remove(index);
            }
        }
        self.busy.entry(target).or_default().push((start, end));
        self.moved.insert(task.id.clone());

        ScheduleSlot {
            start,
            end,
            hours: task.estimated_hours,
        }
    }

    /// First gap inside working hours long enough for `length`; otherwise
    /// straight after the last busy window of the day.
    fn find_slot(&self, date: NaiveDate, length: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        let hours = self.settings.working_hours;
        let (open, close) = if hours.is_valid() {
            (
                at_local(date, hours.start, self.tz),
                at_local(date, hours.end, self.tz),
            )
        } else {
            let midnight = at_local(date, NaiveTime::MIN, self.tz);
            (midnight, midnight + Duration::days(1))
        };

        let mut windows = self.busy.get(&date).cloned().unwrap_or_default();
        windows.sort();

        let mut cursor = open;
        for (start, end) in windows {
            if start > cursor && start - cursor >= length && cursor + length <= close {
                return (cursor, cursor + length);
            }
            cursor = cursor.max(end);
        }
        if cursor + length > close {
            debug!(
                target: "app::rebalancing",
                %date,
                hours = duration_hours(cursor, cursor + length),
                "no gap inside working hours; placing after the last task"
            );
        }
        (cursor, cursor + length)
    }
}
