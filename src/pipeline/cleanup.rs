// src/pipeline/cleanup.rs

//! Standalone removal of duplicate prefixed events.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::CalendarService;
use crate::error::Result;
use crate::models::CalendarEvent;
use crate::pipeline::sync::ExistingEvents;
use crate::utils::http::Sleeper;
use crate::utils::log::sub_item;

/// What a cleanup pass found and removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Dates holding more than one prefixed event
    pub dates: usize,
    pub found: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl CleanupReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Dates with duplicates", self.dates.to_string()),
            ("Duplicates found", self.found.to_string()),
            ("Duplicates deleted", self.deleted.to_string()),
            ("Failed", self.failed.to_string()),
        ]
    }
}

/// Keeps the first prefixed event per date and removes the rest.
///
/// Read-only unless [`DuplicateCleaner::delete`] is enabled.
pub struct DuplicateCleaner {
    calendar: Arc<dyn CalendarService>,
    sleeper: Arc<dyn Sleeper>,
    prefix: String,
    request_delay: Duration,
    delete: bool,
}

impl DuplicateCleaner {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        sleeper: Arc<dyn Sleeper>,
        prefix: impl Into<String>,
        request_delay: Duration,
    ) -> Self {
        Self {
            calendar,
            sleeper,
            prefix: prefix.into(),
            request_delay,
            delete: false,
        }
    }

    pub fn delete(mut self, enabled: bool) -> Self {
        self.delete = enabled;
        self
    }

    /// Scan `[start, end)` and report, or remove, duplicates.
    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<CleanupReport> {
        log::info!("Searching for duplicate events from {} to {}", start, end);
        let listed = self.calendar.list_events(start, end).await?;
        let total = listed.len();
        let owned: Vec<CalendarEvent> = listed
            .into_iter()
            .filter(|event| event.title.starts_with(&self.prefix))
            .collect();
        log::info!("Found {} menu events out of {} total", owned.len(), total);

        let existing = ExistingEvents::index(owned);
        let mut dates: Vec<&NaiveDate> = existing.duplicates.keys().collect();
        dates.sort();

        let mut report = CleanupReport::default();
        if dates.is_empty() {
            log::info!("No duplicate events found");
            return Ok(report);
        }

        for date in dates {
            let duplicates = &existing.duplicates[date];
            report.dates += 1;
            report.found += duplicates.len();

            if let Some(kept) = existing.primary.get(date) {
                log::info!("{}: keeping '{}' ({})", date, kept.title, kept.id);
            }
            for duplicate in duplicates {
                sub_item(&format!("duplicate '{}' ({})", duplicate.title, duplicate.id));
            }

            if !self.delete {
                continue;
            }
            for duplicate in duplicates {
                self.sleeper.sleep(self.request_delay).await;
                match self.calendar.delete_event(&duplicate.id).await {
                    Ok(()) => {
                        log::info!("Deleted duplicate for {}: {}", date, duplicate.title);
                        report.deleted += 1;
                    }
                    Err(e) => {
                        log::error!("Failed to delete duplicate {} for {}: {}", duplicate.id, date, e);
                        report.failed += 1;
                    }
                }
            }
        }

        if !self.delete {
            log::info!("Run again with --delete to remove {} duplicates", report.found);
        }
        Ok(report)
    }
}
