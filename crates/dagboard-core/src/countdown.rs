//! "Next run" countdown derivation.
//!
//! Pure functions of (next-run epoch, now). Nothing here is stored; the host
//! re-derives the text on every tick.

use chrono::{DateTime, Utc};

use crate::model::DagLeaf;

/// Above this many remaining milliseconds the seconds field is dropped.
pub const SECONDS_GRANULARITY_LIMIT_MS: i64 = 60_000;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60_000;
const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Seconds,
    Minutes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub remaining_ms: i64,
}

impl Countdown {
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        granularity_for(self.remaining_ms)
    }

    #[must_use]
    pub fn text(&self) -> String {
        format_remaining(self.remaining_ms)
    }
}

/// Countdown for a leaf, or `None` when no countdown should be shown.
#[must_use]
pub fn derive(leaf: &DagLeaf, next_epoch: Option<i64>, now: DateTime<Utc>) -> Option<Countdown> {
    if !leaf.is_scheduled() {
        return None;
    }
    let epoch = next_epoch?;
    let next_ms = epoch.checked_mul(MS_PER_SECOND)?;
    let remaining_ms = next_ms.checked_sub(now.timestamp_millis())?;
    Some(Countdown { remaining_ms })
}

/// Cell text for the next-run column: `in 5m`, or empty when hidden.
#[must_use]
pub fn cell_text(leaf: &DagLeaf, next_epoch: Option<i64>, now: DateTime<Utc>) -> String {
    derive(leaf, next_epoch, now)
        .map(|countdown| format!("in {}", countdown.text()))
        .unwrap_or_default()
}

#[must_use]
pub fn granularity_for(remaining_ms: i64) -> Granularity {
    if remaining_ms > SECONDS_GRANULARITY_LIMIT_MS {
        Granularity::Minutes
    } else {
        Granularity::Seconds
    }
}

/// Format remaining time largest unit first, dropping leading zero units. The
/// last unit shown is rounded half up.
///
/// `59_000` -> `59s`, `60_000` -> `1m0s`, `61_000` -> `1m`, `90_000` -> `2m`,
/// `3_900_000` -> `1h5m`.
#[must_use]
pub fn format_remaining(remaining_ms: i64) -> String {
    let granularity = granularity_for(remaining_ms);
    let remaining_ms = remaining_ms.max(0);
    let total_seconds = match granularity {
        Granularity::Seconds => remaining_ms.saturating_add(MS_PER_SECOND / 2) / MS_PER_SECOND,
        Granularity::Minutes => {
            remaining_ms.saturating_add(MS_PER_MINUTE / 2) / MS_PER_MINUTE * SECONDS_PER_MINUTE
        }
    };

    let days = total_seconds / SECONDS_PER_DAY;
    let hours = (total_seconds % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
    let minutes = (total_seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total_seconds % SECONDS_PER_MINUTE;

    let mut units: Vec<(i64, char)> = vec![(days, 'd'), (hours, 'h'), (minutes, 'm')];
    if granularity == Granularity::Seconds {
        units.push((seconds, 's'));
    }

    let first_non_zero = units
        .iter()
        .position(|(value, _)| *value > 0)
        .unwrap_or(units.len() - 1);

    units[first_non_zero..]
        .iter()
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{cell_text, derive, format_remaining, granularity_for, Granularity};
    use crate::model::DagLeaf;
    use chrono::{TimeZone, Utc};

    fn scheduled(name: &str) -> DagLeaf {
        DagLeaf {
            schedule_expressions: vec!["* * * * *".to_owned()],
            ..DagLeaf::new(name)
        }
    }

    #[test]
    fn unit_switch_happens_above_sixty_seconds() {
        assert_eq!(granularity_for(59_000), Granularity::Seconds);
        assert_eq!(granularity_for(60_000), Granularity::Seconds);
        assert_eq!(granularity_for(61_000), Granularity::Minutes);
        assert_eq!(format_remaining(59_000), "59s");
        assert_eq!(format_remaining(60_000), "1m0s");
        assert_eq!(format_remaining(61_000), "1m");
    }

    #[test]
    fn larger_durations_trim_leading_zero_units() {
        assert_eq!(format_remaining(3_900_000), "1h5m");
        assert_eq!(format_remaining(2 * 86_400_000 + 3 * 3_600_000), "2d3h0m");
        assert_eq!(format_remaining(0), "0s");
        assert_eq!(format_remaining(-5_000), "0s");
    }

    #[test]
    fn last_unit_rounds_half_up() {
        assert_eq!(format_remaining(89_999), "1m");
        assert_eq!(format_remaining(90_000), "2m");
        assert_eq!(format_remaining(3_570_000), "1h0m");
        assert_eq!(format_remaining(1_499), "1s");
        assert_eq!(format_remaining(59_500), "1m0s");
        assert!(!format_remaining(i64::MAX).is_empty());
    }

    #[test]
    fn derive_hides_suspended_and_unscheduled() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let next = now.timestamp() + 90;

        let leaf = scheduled("a");
        let countdown = derive(&leaf, Some(next), now).unwrap();
        assert_eq!(countdown.remaining_ms, 90_000);
        assert_eq!(cell_text(&leaf, Some(next), now), "in 2m");

        let mut suspended = scheduled("b");
        suspended.suspended = true;
        assert!(derive(&suspended, Some(next), now).is_none());

        assert!(derive(&DagLeaf::new("c"), Some(next), now).is_none());
        assert_eq!(cell_text(&leaf, None, now), "");
    }

    #[test]
    fn overflowing_epoch_is_suppressed() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        assert!(derive(&scheduled("a"), Some(i64::MAX), now).is_none());
    }
}
