//! Menu records and the date window they are collected for.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// One day's menu as produced by a parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuRecord {
    /// School day the menu is served
    pub date: NaiveDate,

    /// Short summary used in the event title (never empty)
    pub display_text: String,

    /// Longer description for the event body
    pub detail_text: Option<String>,
}

impl MenuRecord {
    /// Build a record, treating an empty detail text as absent.
    pub fn new(date: NaiveDate, display_text: impl Into<String>, detail_text: impl Into<String>) -> Self {
        let detail_text = detail_text.into();
        Self {
            date,
            display_text: display_text.into(),
            detail_text: if detail_text.is_empty() {
                None
            } else {
                Some(detail_text)
            },
        }
    }
}

/// The weekday range synced in one run: `[start_date, start_date + max_weeks * 7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start_date: NaiveDate,
    pub max_weeks: u32,
    end_date: NaiveDate,
}

impl SyncWindow {
    pub fn new(start_date: NaiveDate, max_weeks: u32) -> Result<Self> {
        if max_weeks == 0 {
            return Err(AppError::config("max_weeks must be a positive integer"));
        }
        let end_date = Duration::try_days(i64::from(max_weeks) * 7)
            .and_then(|span| start_date.checked_add_signed(span))
            .ok_or_else(|| {
                AppError::config(format!(
                    "max_weeks {max_weeks} from {start_date} runs past the last representable date"
                ))
            })?;
        Ok(Self {
            start_date,
            max_weeks,
            end_date,
        })
    }

    /// Exclusive end of the window.
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// True when `date` is a weekday inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date < self.end_date() && !is_weekend(date)
    }

    /// All weekdays of the window, in order.
    pub fn weekdays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end_date();
        self.start_date
            .iter_days()
            .take_while(move |d| *d < end)
            .filter(|d| !is_weekend(*d))
    }

    /// Sundays starting each calendar week that holds at least one window weekday.
    pub fn week_starts(&self) -> Vec<NaiveDate> {
        let mut weeks: Vec<NaiveDate> = Vec::new();
        for day in self.weekdays() {
            let sunday = sunday_on_or_before(day);
            if weeks.last() != Some(&sunday) {
                weeks.push(sunday);
            }
        }
        weeks
    }

    /// `(year, month)` pairs touched by window weekdays, in order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months: Vec<(i32, u32)> = Vec::new();
        for day in self.weekdays() {
            let key = (day.year(), day.month());
            if months.last() != Some(&key) {
                months.push(key);
            }
        }
        months
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The Sunday that starts the week containing `date`.
pub fn sunday_on_or_before(date: NaiveDate) -> NaiveDate {
    let days_since_sunday = date.weekday().num_days_from_sunday();
    date - Duration::days(i64::from(days_since_sunday))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_window_bounds() {
        let window = SyncWindow::new(date("2025-09-01"), 1).unwrap();
        assert_eq!(window.end_date(), date("2025-09-08"));

        let days: Vec<_> = window.weekdays().collect();
        assert_eq!(days.first(), Some(&date("2025-09-01")));
        assert_eq!(days.last(), Some(&date("2025-09-05")));
        assert_eq!(days.len(), 5);
        assert!(days.iter().all(|d| window.contains(*d)));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let err = SyncWindow::new(date("2025-09-01"), u32::MAX).unwrap_err();
        assert!(err.is_configuration());
        assert!(SyncWindow::new(date("2025-09-01"), 0).is_err());
    }

    #[test]
    fn test_contains_excludes_weekends_and_end() {
        let window = SyncWindow::new(date("2025-09-01"), 1).unwrap();
        assert!(!window.contains(date("2025-09-06")));
        assert!(!window.contains(date("2025-09-08")));
        assert!(!window.contains(date("2025-08-29")));
    }

    #[test]
    fn test_zero_weeks_rejected() {
        assert!(SyncWindow::new(date("2025-09-01"), 0).is_err());
    }

    #[test]
    fn test_week_starts() {
        let window = SyncWindow::new(date("2025-09-03"), 2).unwrap();
        assert_eq!(
            window.week_starts(),
            vec![date("2025-08-31"), date("2025-09-07"), date("2025-09-14")]
        );

        let monday = SyncWindow::new(date("2025-09-01"), 1).unwrap();
        assert_eq!(monday.week_starts(), vec![date("2025-08-31")]);
    }

    #[test]
    fn test_months_crossing_boundary() {
        let window = SyncWindow::new(date("2025-09-22"), 2).unwrap();
        assert_eq!(window.months(), vec![(2025, 9), (2025, 10)]);
    }

    #[test]
    fn test_sunday_on_or_before() {
        assert_eq!(sunday_on_or_before(date("2025-09-07")), date("2025-09-07"));
        assert_eq!(sunday_on_or_before(date("2025-09-06")), date("2025-08-31"));
    }

    #[test]
    fn test_empty_detail_is_none() {
        let record = MenuRecord::new(date("2025-09-01"), "Pizza", "");
        assert_eq!(record.detail_text, None);
    }
}
