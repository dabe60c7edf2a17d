//! `CronParser` backed by the `cron` crate.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use modbot_common::error::Error;
use modbot_common::traits::CronParser;

/// Accepts the usual 5-field `min hour dom month dow` form as well as the
/// crate's native 6- and 7-field forms.
#[derive(Debug, Default, Clone, Copy)]
pub struct CronCrateParser;

impl CronCrateParser {
    pub fn parse(&self, expression: &str) -> Result<Schedule, Error> {
        Schedule::from_str(&normalize_cron(expression)).map_err(|e| Error::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })
    }
}

impl CronParser for CronCrateParser {
    fn next_after(&self, expression: &str, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, Error> {
        let schedule = self.parse(expression)?;
        Ok(schedule.after(&after).find(|next| *next > after))
    }
}

/// Turns a 5-field expression into the crate's 6-field form: a zero seconds
/// field is prepended and the weekday field is renumbered from cron's
/// `0|7 = Sunday, 1 = Monday` to the crate's `1 = Sunday, 2 = Monday`.
/// 6- and 7-field expressions are passed through in the crate's numbering.
pub fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    match fields.as_slice() {
        [minute, hour, dom, month, dow] => {
            format!("0 {minute} {hour} {dom} {month} {}", remap_weekdays(dow))
        }
        _ => trimmed.to_string(),
    }
}

fn remap_weekdays(field: &str) -> String {
    let mut items: Vec<String> = Vec::new();
    for item in field.split(',').map(remap_weekday_item) {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items.join(",")
}

/// Numeric items are expanded and renumbered one day at a time, so ranges
/// ending on Sunday (`5-7`) come out right. Names and `*` steps need no
/// change; anything unparsable is left for the crate to reject.
fn remap_weekday_item(item: &str) -> String {
    let (base, step) = match item.split_once('/') {
        Some((base, step)) => (base, Some(step)),
        None => (item, None),
    };
    if !base.starts_with(|c: char| c.is_ascii_digit()) {
        return item.to_string();
    }

    let bounds = match base.split_once('-') {
        Some((lo, hi)) => lo.parse::<u32>().ok().zip(hi.parse::<u32>().ok()),
        None => base.parse::<u32>().ok().map(|day| {
            // `n/step` runs to the end of the week.
            (day, if step.is_some() { day.max(6) } else { day })
        }),
    };
    let step = match step.map(str::parse::<usize>) {
        None => Some(1),
        Some(Ok(step)) if step > 0 => Some(step),
        Some(_) => None,
    };
    let (Some((lo, hi)), Some(step)) = (bounds, step) else {
        return item.to_string();
    };
    if lo > hi || hi > 7 {
        return item.to_string();
    }

    let mut days: Vec<u32> = (lo..=hi).step_by(step).map(|day| day % 7 + 1).collect();
    days.sort_unstable();
    days.dedup();
    days.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn normalizes_five_field_expressions() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron(" 0 0 12 * * * "), "0 0 12 * * *");
        assert_eq!(normalize_cron("0 4 * * 1-5"), "0 0 4 * * 2,3,4,5,6");
        assert_eq!(normalize_cron("0 4 * * 0,7"), "0 0 4 * * 1");
        assert_eq!(normalize_cron("0 4 * * 5-7"), "0 0 4 * * 1,6,7");
        assert_eq!(normalize_cron("0 4 * * 1-5/2"), "0 0 4 * * 2,4,6");
        assert_eq!(normalize_cron("0 4 * * MON-FRI"), "0 0 4 * * MON-FRI");
        assert_eq!(normalize_cron("0 4 * * */2"), "0 0 4 * * */2");
        // Native forms keep the crate's numbering.
        assert_eq!(normalize_cron("0 0 4 * * 2"), "0 0 4 * * 2");
    }

    #[test]
    fn weekdays_use_standard_cron_numbering() {
        let parser = CronCrateParser;
        // A Thursday.
        let noon = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let monday = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let sunday = Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap();
        let friday = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();

        assert_eq!(parser.next_after("0 0 * * 1", noon).unwrap(), Some(monday));
        assert_eq!(parser.next_after("0 0 * * MON", noon).unwrap(), Some(monday));
        assert_eq!(parser.next_after("0 0 * * 0", noon).unwrap(), Some(sunday));
        assert_eq!(parser.next_after("0 0 * * 7", noon).unwrap(), Some(sunday));
        assert_eq!(parser.next_after("0 0 * * 1-5", noon).unwrap(), Some(friday));
        assert_eq!(parser.next_after("0 0 * * 6-7", noon).unwrap(), Some(Utc.with_ymd_and_hms(2026, 1, 3, 0, 0, 0).unwrap()));
        assert!(parser.next_after("0 0 * * 8", noon).is_err());
    }

    #[test]
    fn next_occurrence_is_strictly_after() {
        let parser = CronCrateParser;
        let on_the_minute = Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 0).unwrap();
        let next = parser.next_after("* * * * *", on_the_minute).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 2, 0).unwrap());

        let next = parser
            .next_after("*/5 * * * *", Utc.with_ymd_and_hms(2026, 1, 1, 0, 1, 30).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 0, 5, 0).unwrap());
    }

    #[test]
    fn rejects_garbage_and_reports_exhausted_schedules() {
        let parser = CronCrateParser;
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = parser.next_after("every tuesday", now).unwrap_err();
        assert!(matches!(err, Error::InvalidCron { .. }));
        // Seven-field form with a year in the past.
        assert_eq!(parser.next_after("0 0 0 1 1 * 1999", now).unwrap(), None);
    }
}
