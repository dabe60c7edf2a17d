use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::duration::{compact, format_duration};

fn default_age_threshold() -> Duration {
    Duration::from_secs(23 * 3600)
}

fn default_cron_expression() -> String {
    "*/5 * * * *".to_string()
}

/// Periodic purge of a channel: every message older than `age_threshold` is
/// deleted whenever `cron_expression` fires.
///
/// Two definitions with the same field values are the same scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanupDefinition {
    pub channel_id: u64,
    #[serde(with = "compact", default = "default_age_threshold")]
    pub age_threshold: Duration,
    #[serde(alias = "schedule", default = "default_cron_expression")]
    pub cron_expression: String,
}

impl CleanupDefinition {
    pub fn new(channel_id: u64, age_threshold: Duration, cron_expression: impl Into<String>) -> Self {
        Self {
            channel_id,
            age_threshold,
            cron_expression: cron_expression.into(),
        }
    }
}

impl fmt::Display for CleanupDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel_id: {}, age_threshold: {}, schedule: {}",
            self.channel_id,
            format_duration(self.age_threshold),
            self.cron_expression
        )
    }
}

/// A cleanup definition whose occurrence came due, as it travels through the
/// work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub definition: CleanupDefinition,
    pub due_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults_and_aliases() {
        let def: CleanupDefinition =
            serde_json::from_str(r#"{ "channel_id": 42, "schedule": "0 * * * *" }"#).unwrap();
        assert_eq!(def.channel_id, 42);
        assert_eq!(def.age_threshold, Duration::from_secs(23 * 3600));
        assert_eq!(def.cron_expression, "0 * * * *");

        let def: CleanupDefinition =
            serde_json::from_str(r#"{ "channel_id": 7, "age_threshold": "1d" }"#).unwrap();
        assert_eq!(def.age_threshold, Duration::from_secs(86_400));
        assert_eq!(def.cron_expression, "*/5 * * * *");
    }

    #[test]
    fn equal_fields_mean_equal_definitions() {
        let a = CleanupDefinition::new(1, Duration::from_secs(60), "* * * * *");
        let b = CleanupDefinition::new(1, Duration::from_secs(60), "* * * * *");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "channel_id: 1, age_threshold: 1m, schedule: * * * * *");
    }
}
