//! Compact duration strings used in definition files: `"23h"`, `"1d12h"`,
//! `"90s"`, or clock notation `"23:00:00"` / `"1.12:00:00"`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Parse a compact duration string into a [`Duration`].
///
/// Components `Xd`, `Xh`, `Xm`, `Xs` can be combined ("2h30m"). A bare number is
/// read as seconds. Clock notation `[d.]hh:mm[:ss]` is accepted as well.
/// Returns `None` for empty or malformed input.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains(':') {
        return parse_clock(s);
    }

    let mut total_secs: u64 = 0;
    let mut num_buf = String::new();
    let mut found_unit = false;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
        } else {
            let n: u64 = num_buf.parse().ok()?;
            num_buf.clear();
            let unit = match ch {
                'd' => 86_400,
                'h' => 3_600,
                'm' => 60,
                's' => 1,
                _ => return None,
            };
            total_secs = total_secs.checked_add(n.checked_mul(unit)?)?;
            found_unit = true;
        }
    }

    if !num_buf.is_empty() {
        // "30m15" is ambiguous
        if found_unit {
            return None;
        }
        total_secs = num_buf.parse().ok()?;
    }

    Some(Duration::from_secs(total_secs))
}

fn parse_clock(s: &str) -> Option<Duration> {
    let (days, clock) = match s.split_once('.') {
        Some((d, rest)) => (d.parse::<u64>().ok()?, rest),
        None => (0, s),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, 0),
        [h, m, sec] => (
            h.parse::<u64>().ok()?,
            m.parse::<u64>().ok()?,
            sec.parse::<u64>().ok()?,
        ),
        _ => return None,
    };
    if m >= 60 || sec >= 60 {
        return None;
    }
    let total_secs = days
        .checked_mul(86_400)?
        .checked_add(h.checked_mul(3_600)?)?
        .checked_add(m * 60 + sec)?;
    Some(Duration::from_secs(total_secs))
}

/// Render a duration in the same compact form `parse_duration` reads.
pub fn format_duration(d: Duration) -> String {
    let mut secs = d.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    for (unit, label) in [(86_400, 'd'), (3_600, 'h'), (60, 'm'), (1, 's')] {
        let n = secs / unit;
        if n > 0 {
            out.push_str(&n.to_string());
            out.push(label);
            secs %= unit;
        }
    }
    out
}

/// `#[serde(with = "compact")]` adapter for `Duration` fields.
pub mod compact {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration `{raw}`")))
    }
}
