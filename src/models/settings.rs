use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WEEKLY_CAPACITY_HOURS: f64 = 40.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn span_hours(&self) -> f64 {
        (self.end - self.start).num_minutes().max(0) as f64 / 60.0
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub weekly_capacity_hours: f64,
    pub working_days: Vec<Weekday>,
    #[serde(default)]
    pub working_hours: WorkingHours,
    /// IANA zone name used to decide which calendar day a task falls on.
    #[serde(default)]
    pub timezone: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            weekly_capacity_hours: DEFAULT_WEEKLY_CAPACITY_HOURS,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            working_hours: WorkingHours::default(),
            timezone: None,
        }
    }
}

impl UserSettings {
    pub fn with_capacity(mut self, hours: f64) -> Self {
        self.weekly_capacity_hours = hours;
        self
    }

    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }

    /// Even share of the weekly capacity per working day; zero when no day is configured.
    pub fn daily_threshold_hours(&self) -> f64 {
        if self.working_days.is_empty() {
            return 0.0;
        }
        self.weekly_capacity_hours.max(0.0) / self.working_days.len() as f64
    }

    pub fn tz(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
