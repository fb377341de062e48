// src/period.rs
use chrono::{Datelike, Duration, NaiveDate};

/// One calendar month used as a report filter, first and last day inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(year: i32, month: u32) -> Self {
        let start = NaiveDate::from_ymd_opt(year, month, 1).expect("report month in 1..=12");
        // Last day of the month without hard-coded month lengths: jump past
        // day 28, then step back over the days that spilled into the next
        // month. Day 28 exists in every month, leap February included.
        let pivot =
            NaiveDate::from_ymd_opt(year, month, 28).expect("report month in 1..=12")
                + Duration::days(4);
        let end = pivot - Duration::days(i64::from(pivot.day()));
        Self {
            year,
            month,
            start,
            end,
        }
    }

    /// `YYYY * 100 + MM` period label carried on every output record.
    pub fn label(&self) -> i32 {
        self.year * 100 + self.month as i32
    }
}

/// The fixed report range: December of the previous year, then the twelve
/// months of `target_year`, in order.
pub fn report_periods(target_year: i32) -> impl Iterator<Item = PeriodWindow> {
    (0..13u32).map(move |i| {
        if i == 0 {
            PeriodWindow::new(target_year - 1, 12)
        } else {
            PeriodWindow::new(target_year, i)
        }
    })
}
