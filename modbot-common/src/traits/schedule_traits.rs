use chrono::{DateTime, Utc};

use crate::error::Error;

/// Turns a cron expression into concrete occurrences.
pub trait CronParser: Send + Sync {
    /// First occurrence strictly after `after`, or `None` if the expression
    /// never fires again.
    fn next_after(&self, expression: &str, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, Error>;
}
