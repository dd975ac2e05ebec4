//! Trading calendar collaborator.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Reports whether a date is the last trading session of its period.
///
/// Injected at engine construction so week, month and year bars can close
/// on the final session of a period (for example a Friday before a weekend)
/// instead of waiting for the first tick of the next period.
pub trait TradingCalendar: std::fmt::Debug {
    /// Returns true when `date` is the last trading day of its week.
    fn is_last_weekday(&self, date: NaiveDate) -> bool;

    /// Returns true when `date` is the last trading day of its month.
    fn is_last_monthday(&self, date: NaiveDate) -> bool;

    /// Returns true when `date` is the last trading day of its year.
    fn is_last_yearday(&self, date: NaiveDate) -> bool;
}

/// Calendar-less default using pure date arithmetic.
///
/// Periods end on the last calendar day: Sunday, the final day of the
/// month, December 31st. Markets that close earlier in the period should
/// inject a real trading calendar instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoCalendar;

impl TradingCalendar for IsoCalendar {
    fn is_last_weekday(&self, date: NaiveDate) -> bool {
        date.weekday() == Weekday::Sun
    }

    fn is_last_monthday(&self, date: NaiveDate) -> bool {
        match date.checked_add_days(Days::new(1)) {
            Some(next) => next.month() != date.month(),
            None => true,
        }
    }

    fn is_last_yearday(&self, date: NaiveDate) -> bool {
        date.month() == 12 && date.day() == 31
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_weekday() {
        let cal = IsoCalendar;
        assert!(cal.is_last_weekday(date(2024, 1, 7))); // Sunday
        assert!(!cal.is_last_weekday(date(2024, 1, 5))); // Friday
    }

    #[test]
    fn test_last_monthday() {
        let cal = IsoCalendar;
        assert!(cal.is_last_monthday(date(2024, 1, 31)));
        assert!(cal.is_last_monthday(date(2024, 2, 29))); // leap year
        assert!(!cal.is_last_monthday(date(2024, 2, 28)));
    }

    #[test]
    fn test_last_yearday() {
        let cal = IsoCalendar;
        assert!(cal.is_last_yearday(date(2023, 12, 31)));
        assert!(!cal.is_last_yearday(date(2023, 12, 30)));
        assert!(!cal.is_last_yearday(date(2023, 1, 31)));
    }
}
