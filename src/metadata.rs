use crate::organization::CalendarId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub organization: String,
    /// Calendar governing every task of the project.
    #[serde(default)]
    pub calendar_id: CalendarId,
}

impl ScheduleMetadata {
    pub fn named(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn with_calendar(mut self, calendar_id: CalendarId) -> Self {
        self.calendar_id = calendar_id;
        self
    }
}

impl Default for ScheduleMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            organization: String::new(),
            calendar_id: CalendarId::default(),
        }
    }
}
