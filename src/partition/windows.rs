//! Day window generation
//!
//! Windows are `[start, start + 1 day)` in UTC, produced lazily in ascending
//! order while `start < end`. The end bound is exclusive: with an end of
//! `2016-06-06T00:00:00Z` the last window starts on 2016-06-05.

use crate::error::{Error, Result};
use crate::types::{format_bookmark, API_DATE_FORMAT};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use tracing::warn;

/// A single-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateWindow {
    /// Inclusive start, always midnight UTC
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Window covering the day starting at `start`
    pub fn day(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Last day inside the window
    pub fn last_day(&self) -> NaiveDate {
        (self.end - Duration::days(1)).date_naive()
    }

    /// `start_date` request parameter
    pub fn start_param(&self) -> String {
        self.start.format(API_DATE_FORMAT).to_string()
    }

    /// `end_date` request parameter (inclusive last day)
    pub fn end_param(&self) -> String {
        self.last_day().format(API_DATE_FORMAT).to_string()
    }

    /// Window start as stamped on records and stored as bookmark
    pub fn stamp(&self) -> String {
        format_bookmark(self.start)
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.end.format(API_DATE_FORMAT))
    }
}

/// Lazy ascending sequence of day windows
#[derive(Debug, Clone)]
pub struct DayWindows {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindows {
    /// Windows from `start` (truncated to midnight) up to the exclusive `end`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            next: midnight(start),
            end,
        }
    }

    /// First window start
    pub fn start(&self) -> DateTime<Utc> {
        self.next
    }

    /// Exclusive end bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

impl Iterator for DayWindows {
    type Item = DateWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let window = DateWindow::day(self.next);
        self.next = window.end;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next >= self.end {
            return (0, Some(0));
        }
        let span = self.end - self.next;
        let mut days = span.num_days() as usize;
        if span > Duration::days(span.num_days()) {
            days += 1;
        }
        (days, Some(days))
    }
}

impl ExactSizeIterator for DayWindows {}

/// The earlier of `base` and `now - lookback_days`.
///
/// Taking the earlier bound re-reads the trailing lookback days on every
/// run, picking up report rows that arrive late.
pub fn effective_start(
    base: DateTime<Utc>,
    lookback_days: i64,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let floor = lookback_floor(now, lookback_days).ok_or_else(|| {
        Error::invalid_value(
            "lookback_window",
            format!("{lookback_days} days is outside the supported date range"),
        )
    })?;
    Ok(midnight(base.min(floor)))
}

/// `now - lookback_days`, or `None` when that is not a representable date
pub fn lookback_floor(now: DateTime<Utc>, lookback_days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(lookback_days).and_then(|lookback| now.checked_sub_signed(lookback))
}

/// Plan the windows of one incremental stream.
///
/// `base` is the bookmark, or the configured start date on a first run.
/// `end_date` defaults to `now`.
pub fn plan_windows(
    base: DateTime<Utc>,
    lookback_days: i64,
    now: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> Result<DayWindows> {
    let start = effective_start(base, lookback_days, now)?;
    let end = end_date.unwrap_or(now);

    if start >= end {
        warn!(
            start = %format_bookmark(start),
            end = %format_bookmark(end),
            "Effective start is not before the end date, no windows to sync"
        );
    }

    Ok(DayWindows::new(start, end))
}

fn midnight(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_time(NaiveTime::MIN).and_utc()
}
