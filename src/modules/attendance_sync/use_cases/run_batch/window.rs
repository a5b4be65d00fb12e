use chrono::{Days, NaiveDate};

/// Inclusive date range requested from the attendance source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyncWindow {
    /// `lookback_days` full days before `today`, through `today`.
    pub fn ending_on(today: NaiveDate, lookback_days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }
}
