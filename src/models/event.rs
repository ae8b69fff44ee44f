//! Calendar-side event types.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Reduced view of an all-day event already on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Identifier assigned by the calendar service
    pub id: String,

    /// All-day start date
    pub date: NaiveDate,

    /// Event title (summary)
    pub title: String,

    pub color_id: Option<String>,

    pub description: Option<String>,
}

/// An all-day event to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub date: NaiveDate,
    pub title: String,
    pub color_id: u8,
    pub description: Option<String>,
    /// Popup reminder; `None` disables reminders entirely
    pub reminder: Option<Reminder>,
}

/// A single popup reminder, stored as minutes before the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub minutes: u32,
}

impl FromStr for Reminder {
    type Err = AppError;

    /// Parse `15m`, `2h` or `1d`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let invalid = || {
            AppError::config(format!(
                "Invalid reminder format: '{s}'. Expected 'Xm', 'Xh', or 'Xd'"
            ))
        };

        let split = s.len().checked_sub(1).ok_or_else(invalid)?;
        if !s.is_char_boundary(split) {
            return Err(invalid());
        }
        let (amount, unit) = s.split_at(split);
        let amount: u32 = amount.parse().map_err(|_| invalid())?;
        let factor = match unit {
            "m" => 1,
            "h" => 60,
            "d" => 24 * 60,
            _ => return Err(invalid()),
        };

        amount
            .checked_mul(factor)
            .map(|minutes| Reminder { minutes })
            .ok_or_else(invalid)
    }
}
