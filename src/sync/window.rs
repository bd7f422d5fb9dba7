//! Windowing policy for metadata fetching.
//!
//! Decides which time windows of remote metadata still need listing, based
//! on the creation-time extremes already recorded in the store.

use chrono::{DateTime, Utc};

use crate::remote::TimeRange;

/// Computes the metadata windows to fetch, evaluated in order:
///
/// 1. An explicit range wins outright: exactly that single window.
/// 2. With the heuristic enabled, an empty store (newest still at the
///    epoch sentinel) gets one full window; otherwise two windows are
///    produced, everything older than the known oldest and everything
///    newer than the known newest. Items backfilled strictly between the
///    recorded extremes are not discovered by this pass; `--all` disables
///    the heuristic for those cases.
/// 3. Otherwise, one full window from the epoch to now.
#[must_use]
pub fn plan_windows(
    explicit: Option<TimeRange>,
    heuristic: bool,
    extremes: (DateTime<Utc>, DateTime<Utc>),
) -> Vec<TimeRange> {
    if let Some(range) = explicit {
        return vec![range];
    }

    if heuristic {
        let (oldest, newest) = extremes;
        if newest == DateTime::UNIX_EPOCH {
            // Empty-store sentinel: nothing known, fetch everything.
            return vec![TimeRange::full()];
        }
        return vec![
            TimeRange::new(DateTime::UNIX_EPOCH, oldest),
            TimeRange::new(newest, Utc::now()),
        ];
    }

    vec![TimeRange::full()]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .unwrap()
            .with_timezone(&Utc)
    }

    /// Sentinel extremes as the store reports them when empty.
    fn empty_extremes() -> (DateTime<Utc>, DateTime<Utc>) {
        (Utc::now(), DateTime::UNIX_EPOCH)
    }

    #[test]
    fn test_explicit_range_used_verbatim() {
        let range = TimeRange::new(ts("2018-01-01T00:00:00Z"), ts("2018-12-31T00:00:00Z"));
        let windows = plan_windows(Some(range), true, empty_extremes());
        assert_eq!(windows, vec![range]);
    }

    #[test]
    fn test_heuristic_empty_store_yields_one_full_window() {
        let windows = plan_windows(None, true, empty_extremes());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, DateTime::UNIX_EPOCH);
        assert!(windows[0].end > windows[0].start);
    }

    #[test]
    fn test_heuristic_populated_store_yields_two_windows() {
        let oldest = ts("2015-03-01T00:00:00Z");
        let newest = ts("2019-06-08T00:00:00Z");
        let windows = plan_windows(None, true, (oldest, newest));

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, DateTime::UNIX_EPOCH);
        assert_eq!(windows[0].end, oldest);
        assert_eq!(windows[1].start, newest);
        assert!(windows[1].end >= newest);
    }

    #[test]
    fn test_no_heuristic_no_range_yields_full_window() {
        let windows = plan_windows(
            None,
            false,
            (ts("2015-03-01T00:00:00Z"), ts("2019-06-08T00:00:00Z")),
        );
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_heuristic_windows_exclude_interior() {
        // The gap between oldest and newest is intentionally not covered.
        let oldest = ts("2015-03-01T00:00:00Z");
        let newest = ts("2019-06-08T00:00:00Z");
        let windows = plan_windows(None, true, (oldest, newest));
        let interior = ts("2017-01-01T00:00:00Z");

        assert!(
            windows
                .iter()
                .all(|w| interior < w.start || interior > w.end),
            "backfilled interior timestamps fall outside both windows"
        );
    }
}
