use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date range for a reconciliation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn len_days(self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_contains() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31));
        assert!(range.contains(date(2025, 1, 15)));
        assert!(range.contains(date(2025, 1, 1))); // inclusive start
        assert!(range.contains(date(2025, 1, 31))); // inclusive end
        assert!(!range.contains(date(2024, 12, 31)));
        assert!(!range.contains(date(2025, 2, 1)));
    }

    #[test]
    fn date_range_display() {
        let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 31));
        assert_eq!(range.to_string(), "2025-01-01 to 2025-01-31");
    }

    #[test]
    fn len_days_is_inclusive() {
        assert_eq!(DateRange::new(date(2025, 1, 1), date(2025, 1, 31)).len_days(), 31);
        assert_eq!(DateRange::new(date(2025, 3, 5), date(2025, 3, 5)).len_days(), 1);
    }
}
