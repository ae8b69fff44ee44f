//! Calendar service access.
//!
//! The reconciler only needs three operations on one calendar, expressed by
//! [`CalendarService`]. [`GoogleCalendar`] implements them over the Google
//! Calendar v3 REST API.

mod auth;
mod google;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{CalendarEvent, NewEvent};

pub use auth::{CALENDAR_SCOPE, CredentialSource};
pub use google::{API_BASE, GoogleCalendar};

/// Event operations on a single, already selected calendar.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// All-day events whose start date falls in `[start, end)`.
    async fn list_events(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarEvent>>;

    /// Insert an all-day event, returning it as stored.
    async fn insert_event(&self, event: &NewEvent) -> Result<CalendarEvent>;

    /// Delete an event by ID. Deleting an already deleted event succeeds.
    async fn delete_event(&self, event_id: &str) -> Result<()>;
}
