use chrono::{Local, NaiveDate};

/// Source of "today" for scheduling decisions.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Fixed date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// An entity is due unless its last scan is dated after today. Same-day
/// rescans are allowed.
pub fn is_due(last_scan_at: NaiveDate, today: NaiveDate) -> bool {
    (today - last_scan_at).num_days() >= 0
}
