//! Recency rule for NAV observation dates.

use chrono::{Days, Local, NaiveDate, NaiveDateTime};

use crate::models::NAV_DATE_FORMAT;

/// Source of the wall-clock time the recency rule is evaluated against.
pub trait Clock: Send + Sync {
    /// Local wall-clock time; no timezone normalization is applied.
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Decides whether a scheme's latest NAV is recent enough to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRule {
    threshold_days: u32,
}

impl DateRule {
    pub fn new(threshold_days: u32) -> Self {
        Self { threshold_days }
    }

    /// True iff `observed` falls on or after the calendar day
    /// `threshold_days` before `now`. The boundary day itself counts.
    pub fn is_recent(&self, observed: NaiveDate, now: NaiveDateTime) -> bool {
        match now.date().checked_sub_days(Days::new(u64::from(self.threshold_days))) {
            Some(cutoff) => observed >= cutoff,
            // A threshold reaching past the calendar's start accepts everything.
            None => true,
        }
    }
}

/// Parse a `DD-MM-YYYY` date. `None` means the date cannot be classified.
pub fn parse_nav_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), NAV_DATE_FORMAT).ok()
}
