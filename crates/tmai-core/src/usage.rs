//! Fixed-window usage accounting.
//!
//! A window is identified by its deterministic start instant: minute
//! windows truncate wall-clock time to the UTC minute boundary, month
//! windows to the first instant of the UTC calendar month. Counter rows
//! carry an expiry roughly two windows past their start so garbage
//! collection can never race an in-flight increment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Kind of fixed usage window tracked per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Resets at the top of each UTC minute.
    Minute,
    /// Resets at the first instant of each UTC calendar month.
    Month,
}

impl WindowKind {
    /// Returns the canonical lowercase string stored in SQLite.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Month => "month",
        }
    }

    /// Computes the window's start instant for the given wall-clock time.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Minute => {
                let secs = now.timestamp();
                let floored = secs - secs.rem_euclid(60);
                DateTime::from_timestamp(floored, 0).unwrap_or(now)
            }
            Self::Month => Utc
                .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
                .single()
                .unwrap_or(now),
        }
    }

    /// Returns the expiry to stamp on a counter row for this window.
    ///
    /// Roughly two windows past the start, so stale rows are reclaimable
    /// long after the window itself has closed.
    #[must_use]
    pub fn expires_at(&self, window_start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Minute => window_start + Duration::minutes(2),
            Self::Month => window_start + Duration::days(62),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(Self::Minute),
            "month" => Ok(Self::Month),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().expect("test timestamp")
    }

    #[test]
    fn minute_window_truncates_seconds() {
        let now = at("2026-08-07T12:34:56.789Z");
        let start = WindowKind::Minute.window_start(now);
        assert_eq!(start, at("2026-08-07T12:34:00Z"));
    }

    #[test]
    fn minute_window_is_identity_on_boundary() {
        let boundary = at("2026-08-07T12:34:00Z");
        assert_eq!(WindowKind::Minute.window_start(boundary), boundary);
    }

    #[test]
    fn month_window_truncates_to_first_instant() {
        let now = at("2026-08-31T23:59:59Z");
        let start = WindowKind::Month.window_start(now);
        assert_eq!(start, at("2026-08-01T00:00:00Z"));
    }

    #[test]
    fn adjacent_minutes_yield_distinct_windows() {
        let a = WindowKind::Minute.window_start(at("2026-08-07T12:34:59Z"));
        let b = WindowKind::Minute.window_start(at("2026-08-07T12:35:00Z"));
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_sits_beyond_the_natural_window_end() {
        let minute_start = at("2026-08-07T12:34:00Z");
        assert_eq!(
            WindowKind::Minute.expires_at(minute_start),
            at("2026-08-07T12:36:00Z")
        );

        let month_start = at("2026-02-01T00:00:00Z");
        // 62 days clears even back-to-back 31-day months.
        assert!(WindowKind::Month.expires_at(month_start) > at("2026-04-01T00:00:00Z"));
    }

    #[test]
    fn kind_round_trips_through_storage_string() {
        for kind in [WindowKind::Minute, WindowKind::Month] {
            assert_eq!(kind.as_str().parse::<WindowKind>(), Ok(kind));
        }
        assert!("week".parse::<WindowKind>().is_err());
    }
}
