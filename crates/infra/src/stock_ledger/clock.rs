use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Wall clock that never hands out the same instant twice.
///
/// `recorded_at` must be strictly increasing within a ledger even when the
/// system clock is coarse or steps backwards, so ties are broken by bumping
/// one microsecond past the last value handed out.
#[derive(Debug)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { last: Mutex::new(None) }
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now();
        let Ok(mut last) = self.last.lock() else {
            return wall;
        };
        let next = match *last {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        *last = Some(next);
        next
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
