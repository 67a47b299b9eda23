use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Working-week rule for spreading planned quantities.
///
/// Only the weekend flag is modelled; holidays and per-resource calendars
/// are handled outside the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWeek {
    pub skip_weekends: bool,
}

impl WorkWeek {
    pub fn all_days() -> Self {
        Self {
            skip_weekends: false,
        }
    }

    pub fn weekdays_only() -> Self {
        Self {
            skip_weekends: true,
        }
    }

    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Check if a date carries planned work
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.skip_weekends || !Self::is_weekend(date)
    }

    /// Get all working days in an inclusive date range
    pub fn working_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        days_in_range(start, end)
            .filter(|date| self.is_working_day(*date))
            .collect()
    }

    /// Count working days in an inclusive date range
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        days_in_range(start, end)
            .filter(|date| self.is_working_day(*date))
            .count() as i64
    }
}

/// Number of calendar days in the inclusive range; zero when `end < start`.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}

/// Iterate every calendar day from `start` to `end` inclusive.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let mut current = Some(start);
    std::iter::from_fn(move || {
        let date = current.filter(|date| *date <= end)?;
        current = date.checked_add_signed(Duration::days(1));
        Some(date)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekdays_only_skips_saturday_and_sunday() {
        let week = WorkWeek::weekdays_only();
        // 2025-01-04 is a Saturday, 2025-01-05 is a Sunday
        assert!(!week.is_working_day(d(2025, 1, 4)));
        assert!(!week.is_working_day(d(2025, 1, 5)));
        assert!(week.is_working_day(d(2025, 1, 6)));
        assert!(WorkWeek::all_days().is_working_day(d(2025, 1, 4)));
    }

    #[test]
    fn range_helpers_are_inclusive() {
        let start = d(2025, 1, 1);
        let end = d(2025, 1, 12);
        assert_eq!(span_days(start, end), 12);
        assert_eq!(span_days(start, start), 1);
        assert_eq!(span_days(end, start), 0);
        assert_eq!(days_in_range(start, end).count(), 12);
        assert_eq!(days_in_range(end, start).count(), 0);

        let week = WorkWeek::weekdays_only();
        let days = week.working_days_in_range(start, end);
        assert_eq!(days.len() as i64, week.count_working_days(start, end));
        assert_eq!(days.len(), 8);
        assert_eq!(days.first().copied(), Some(start));
        assert_eq!(days.last().copied(), Some(d(2025, 1, 10)));
    }
}
