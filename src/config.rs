use crate::error::{ScheduleError, ScheduleResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MISSING_CALENDAR_ENV: &str = "PROJECT_SCHEDULER_MISSING_CALENDAR";

/// What to do when a project names a calendar the organization does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCalendarPolicy {
    #[default]
    Reject,
    /// Every weekday works and nothing is a holiday.
    EveryDayWorking,
}

impl FromStr for MissingCalendarPolicy {
    type Err = ScheduleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(MissingCalendarPolicy::Reject),
            "every_day" | "every_day_working" => Ok(MissingCalendarPolicy::EveryDayWorking),
            other => Err(ScheduleError::Configuration(format!(
                "unknown missing-calendar policy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub missing_calendar: MissingCalendarPolicy,
}

impl SchedulerConfig {
    pub fn from_env() -> ScheduleResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> ScheduleResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(policy) = lookup(MISSING_CALENDAR_ENV) {
            config.missing_calendar = policy.parse()?;
        }
        Ok(config)
    }
}
