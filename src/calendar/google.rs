// src/calendar/google.rs

//! Google Calendar v3 REST client.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::calendar::CalendarService;
use crate::error::{AppError, Result};
use crate::models::{CalendarEvent, NewEvent, Reminder};
use crate::utils::http::{Fetcher, HttpRequest};

pub const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color_id: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
}

impl EventTime {
    fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date.format(DATE_FORMAT).to_string()),
            date_time: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: EventTime,
    end: EventTime,
    color_id: String,
    reminders: Reminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
    overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Serialize)]
struct ReminderOverride {
    method: &'static str,
    minutes: u32,
}

impl Reminders {
    /// A popup override, or no reminders at all.
    fn from_option(reminder: Option<Reminder>) -> Self {
        Self {
            use_default: false,
            overrides: reminder
                .map(|r| ReminderOverride {
                    method: "popup",
                    minutes: r.minutes,
                })
                .into_iter()
                .collect(),
        }
    }
}

impl GoogleEvent {
    /// Reduce to the all-day view; timed events yield `None`.
    fn into_calendar_event(self) -> Option<CalendarEvent> {
        let date = self.start.as_ref()?.date.as_deref()?;
        let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
        Some(CalendarEvent {
            id: self.id,
            date,
            title: self.summary.unwrap_or_default(),
            color_id: self.color_id,
            description: self.description,
        })
    }
}

/// One calendar, accessed with a bearer token.
pub struct GoogleCalendar {
    fetcher: Fetcher,
    api_base: String,
    calendar_id: String,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(fetcher: Fetcher, calendar_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_base: API_BASE.to_string(),
            calendar_id: calendar_id.into(),
            access_token: access_token.into(),
        }
    }

    /// Point the client at a different API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build `<api_base>/calendars/<id>/events[/<event>]` with each segment escaped.
    fn events_url(&self, event_id: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&self.api_base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AppError::config(format!("Invalid calendar API base: {}", self.api_base)))?;
            segments
                .pop_if_empty()
                .extend(["calendars", self.calendar_id.as_str(), "events"]);
            if let Some(id) = event_id {
                segments.push(id);
            }
        }
        Ok(url.to_string())
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn list_events(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CalendarEvent>> {
        let url = self.events_url(None)?;
        let time_min = format!("{}T00:00:00Z", start.format(DATE_FORMAT));
        let time_max = format!("{}T00:00:00Z", end.format(DATE_FORMAT));

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = HttpRequest::get(&url)
                .bearer(&self.access_token)
                .query("timeMin", &time_min)
                .query("timeMax", &time_max)
                .query("singleEvents", "true")
                .query("orderBy", "startTime");
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }

            let page: EventsPage = self.fetcher.fetch_json(&request).await?;
            events.extend(
                page.items
                    .into_iter()
                    .filter_map(GoogleEvent::into_calendar_event)
                    .filter(|e| e.date >= start && e.date < end),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    log::debug!("Fetching next page of events");
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        log::debug!("Fetched {} all-day events from {} to {}", events.len(), start, end);
        Ok(events)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<CalendarEvent> {
        let body = EventBody {
            summary: &event.title,
            description: event.description.as_deref().filter(|d| !d.is_empty()),
            start: EventTime::all_day(event.date),
            end: EventTime::all_day(event.date + Duration::days(1)),
            color_id: event.color_id.to_string(),
            reminders: Reminders::from_option(event.reminder),
        };
        let request = HttpRequest::post(self.events_url(None)?, serde_json::to_value(&body)?)
            .bearer(&self.access_token);

        let created: GoogleEvent = self.fetcher.fetch_json(&request).await?;
        Ok(CalendarEvent {
            id: created.id,
            date: event.date,
            title: event.title.clone(),
            color_id: Some(event.color_id.to_string()),
            description: event.description.clone(),
        })
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        let request = HttpRequest::delete(self.events_url(Some(event_id))?).bearer(&self.access_token);

        match self.fetcher.execute(&request).await {
            Ok(_) => Ok(()),
            Err(AppError::FetchClient { status: 410, .. }) => {
                log::debug!("Event {} already deleted", event_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
