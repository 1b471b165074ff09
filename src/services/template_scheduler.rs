use chrono::{Datelike, Duration, NaiveDate, Weekday};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::task::{Channel, Task};
use crate::models::template::ContentTemplate;
use crate::services::schedule_utils::at_local;

/// Materializes posting cadences into planned tasks for one week.
pub struct TemplateScheduler;

impl TemplateScheduler {
    /// One planned task per cadence day per template. Templates of inactive or
    /// unknown channels are skipped. `week_start` must be a Monday.
    pub fn generate_week(
        templates: &[ContentTemplate],
        channels: &[Channel],
        week_start: NaiveDate,
        tz: Tz,
    ) -> AppResult<Vec<Task>> {
        if week_start.weekday() != Weekday::Mon {
            return Err(AppError::validation(format!(
                "week start {week_start} is not a Monday"
            )));
        }

        let mut tasks = Vec::new();
        for template in templates {
            if !template.estimated_hours.is_finite() || template.estimated_hours <= 0.0 {
                return Err(AppError::validation_with_details(
                    "template estimate must be positive",
                    serde_json::json!({ "templateId": template.id }),
                ));
            }

            let active = channels
                .iter()
                .any(|channel| channel.id == template.channel_id && channel.is_active);
            if !active {
                debug!(
                    target: "app::templates",
                    template_id = %template.id,
                    channel_id = %template.channel_id,
                    "skipping template for inactive or unknown channel"
                );
                continue;
            }

            let mut days = template.cadence.days.clone();
            days.sort_by_key(|day| day.num_days_from_monday());
            days.dedup();

            for day in days {
                let date = week_start + Duration::days(i64::from(day.num_days_from_monday()));
                let start = at_local(date, template.cadence.start_time, tz);
                tasks.push(
                    Task::new(
                        Uuid::new_v4().to_string(),
                        template.channel_id.clone(),
                        template.title.clone(),
                        template.estimated_hours,
                        start,
                    )
                    .with_priority(template.priority)
                    .with_template(template.id.clone()),
                );
            }
        }

        tasks.sort_by(|a, b| {
            a.scheduled_start
                .cmp(&b.scheduled_start)
                .then_with(|| a.channel_id.cmp(&b.channel_id))
        });
        info!(
            target: "app::templates",
            week = %week_start,
            tasks = tasks.len(),
            "week generated from templates"
        );
        Ok(tasks)
    }
}
