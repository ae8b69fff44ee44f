// src/pipeline/sync.rs

//! Calendar reconciliation.
//!
//! Diffs the desired menu records against the prefixed all-day events on the
//! calendar and converges with create and delete calls only. Titles are the
//! only compared field; an event whose title already matches is left alone
//! even when its description or color differ.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};

use crate::calendar::CalendarService;
use crate::error::{AppError, Result};
use crate::models::{CalendarEvent, MenuRecord, NewEvent, Reminder, SyncReport};
use crate::utils::http::Sleeper;

/// How created events look.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSettings {
    /// Marks the events this tool owns; empty matches every event
    pub prefix: String,
    pub color_id: u8,
    pub reminder: Option<Reminder>,
}

impl EventSettings {
    pub fn title_for(&self, record: &MenuRecord) -> String {
        format!("{}{}", self.prefix, record.display_text)
    }

    fn owns(&self, event: &CalendarEvent) -> bool {
        event.title.starts_with(&self.prefix)
    }
}

/// Prefixed events by date: the first one per date plus any duplicates.
#[derive(Debug, Default)]
pub(crate) struct ExistingEvents {
    pub(crate) primary: HashMap<NaiveDate, CalendarEvent>,
    pub(crate) duplicates: HashMap<NaiveDate, Vec<CalendarEvent>>,
}

impl ExistingEvents {
    pub(crate) fn index(events: Vec<CalendarEvent>) -> Self {
        let mut index = Self::default();
        for event in events {
            if index.primary.contains_key(&event.date) {
                index.duplicates.entry(event.date).or_default().push(event);
            } else {
                index.primary.insert(event.date, event);
            }
        }
        index
    }
}

/// Applies desired records to one calendar.
pub struct Reconciler {
    calendar: Arc<dyn CalendarService>,
    sleeper: Arc<dyn Sleeper>,
    settings: EventSettings,
    request_delay: Duration,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(
        calendar: Arc<dyn CalendarService>,
        sleeper: Arc<dyn Sleeper>,
        settings: EventSettings,
        request_delay: Duration,
    ) -> Self {
        Self {
            calendar,
            sleeper,
            settings,
            request_delay,
            dry_run: false,
        }
    }

    /// Compute and log the diff without issuing create or delete calls.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Reconcile `desired` against the calendar.
    ///
    /// Failing to list existing events is fatal. A failed create or delete
    /// is logged and counted against its date, and the remaining dates are
    /// still processed.
    pub async fn sync(&self, desired: &[MenuRecord]) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        // First record per date wins
        let mut by_date: BTreeMap<NaiveDate, &MenuRecord> = BTreeMap::new();
        for record in desired {
            by_date.entry(record.date).or_insert(record);
        }
        let (Some(first), Some(last)) = (by_date.keys().next(), by_date.keys().next_back()) else {
            log::info!("No menus to sync");
            return Ok(report);
        };
        let (start, end) = (*first, *last + TimeDelta::days(1));

        log::debug!("Syncing calendar events from {} to {}", start, end);
        let listed = self.calendar.list_events(start, end).await?;
        let owned: Vec<CalendarEvent> = listed
            .into_iter()
            .filter(|event| self.settings.owns(event))
            .collect();
        log::debug!("Found {} existing menu events in date range", owned.len());
        let mut existing = ExistingEvents::index(owned);

        for (date, record) in by_date {
            let title = self.settings.title_for(record);
            let mut date_failed = false;

            for duplicate in existing.duplicates.remove(&date).unwrap_or_default() {
                log::info!("Removing duplicate event for {}: {}", date, duplicate.title);
                match self.delete(&duplicate).await {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        log::error!("{e}");
                        date_failed = true;
                    }
                }
            }

            match existing.primary.remove(&date) {
                Some(current) if current.title == title => {
                    log::debug!("Event already exists and matches for {}", date);
                    report.skipped += 1;
                }
                Some(current) => {
                    log::info!(
                        "Replacing event for {}: '{}' -> '{}'",
                        date,
                        current.title,
                        title
                    );
                    match self.delete(&current).await {
                        Ok(()) => {
                            report.deleted += 1;
                            match self.create(record, &title).await {
                                Ok(()) => report.created += 1,
                                Err(e) => {
                                    log::error!("{e}");
                                    date_failed = true;
                                }
                            }
                        }
                        // Keep the stale event rather than risk a second one
                        Err(e) => {
                            log::error!("{e}");
                            date_failed = true;
                        }
                    }
                }
                None => match self.create(record, &title).await {
                    Ok(()) => report.created += 1,
                    Err(e) => {
                        log::error!("{e}");
                        date_failed = true;
                    }
                },
            }

            if date_failed {
                report.failed += 1;
            }
        }

        log::info!(
            "Calendar sync complete: created={}, deleted={}, skipped={}, failed={}",
            report.created,
            report.deleted,
            report.skipped,
            report.failed
        );
        Ok(report)
    }

    async fn create(&self, record: &MenuRecord, title: &str) -> Result<()> {
        if self.dry_run {
            log::info!("[DRY RUN] Would create event for {}: {}", record.date, title);
            return Ok(());
        }

        self.sleeper.sleep(self.request_delay).await;
        let event = NewEvent {
            date: record.date,
            title: title.to_string(),
            color_id: self.settings.color_id,
            description: record.detail_text.clone(),
            reminder: self.settings.reminder,
        };
        self.calendar
            .insert_event(&event)
            .await
            .map(|created| log::info!("Created event for {}: {} ({})", record.date, title, created.id))
            .map_err(|e| AppError::calendar(record.date, format!("create '{title}': {e}")))
    }

    async fn delete(&self, event: &CalendarEvent) -> Result<()> {
        if self.dry_run {
            log::info!("[DRY RUN] Would delete event for {}: {}", event.date, event.title);
            return Ok(());
        }

        self.sleeper.sleep(self.request_delay).await;
        self.calendar
            .delete_event(&event.id)
            .await
            .map(|()| log::debug!("Deleted event {} for {}", event.id, event.date))
            .map_err(|e| AppError::calendar(event.date, format!("delete '{}': {e}", event.title)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::calendar::testing::MemoryCalendar;
    use crate::utils::http::testing::RecordingSleeper;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(d: &str, display: &str) -> MenuRecord {
        MenuRecord::new(date(d), display, format!("MENU ITEMS\n- {display}"))
    }

    fn settings() -> EventSettings {
        EventSettings {
            prefix: "FRHL: ".into(),
            color_id: 3,
            reminder: None,
        }
    }

    fn reconciler(calendar: &Arc<MemoryCalendar>, sleeper: &Arc<RecordingSleeper>) -> Reconciler {
        Reconciler::new(
            calendar.clone(),
            sleeper.clone(),
            settings(),
            Duration::from_millis(250),
        )
    }

    fn desired() -> Vec<MenuRecord> {
        vec![
            record("2025-09-01", "Orange Chicken"),
            record("2025-09-02", "Pizza"),
        ]
    }

    fn scenario_calendar() -> Arc<MemoryCalendar> {
        Arc::new(MemoryCalendar::with_events(&[
            ("2025-09-01", "FRHL: Orange Chicken"),
            ("2025-09-02", "FRHL: Tacos"),
        ]))
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let calendar = scenario_calendar();
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper).sync(&desired()).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                created: 1,
                deleted: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(calendar.titles_on("2025-09-01"), vec!["FRHL: Orange Chicken"]);
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Pizza"]);
        // One pause before each mutation
        assert_eq!(sleeper.pauses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_sync_is_noop() {
        let calendar = scenario_calendar();
        let sleeper = Arc::new(RecordingSleeper::default());
        let reconciler = reconciler(&calendar, &sleeper);

        reconciler.sync(&desired()).await.unwrap();
        let before = calendar.mutation_count();
        let second = reconciler.sync(&desired()).await.unwrap();

        assert_eq!(second.created, 0);
        assert_eq!(second.deleted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(calendar.mutation_count(), before);
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_mutations() {
        let calendar = scenario_calendar();
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper)
            .dry_run(true)
            .sync(&desired())
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                created: 1,
                deleted: 1,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(calendar.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(calendar.mutation_count(), 0);
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Tacos"]);
    }

    #[tokio::test]
    async fn test_undesired_dates_are_untouched() {
        let calendar = Arc::new(MemoryCalendar::with_events(&[
            ("2025-09-01", "FRHL: Orange Chicken"),
            ("2025-09-02", "FRHL: Tacos"),
            ("2025-09-03", "FRHL: Soup"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let desired = vec![
            record("2025-09-01", "Orange Chicken"),
            record("2025-09-04", "Burgers"),
        ];

        let report = reconciler(&calendar, &sleeper).sync(&desired).await.unwrap();

        assert_eq!(report.deleted, 0);
        assert_eq!(report.created, 1);
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Tacos"]);
        assert_eq!(calendar.titles_on("2025-09-03"), vec!["FRHL: Soup"]);
    }

    #[tokio::test]
    async fn test_unprefixed_events_are_ignored() {
        let calendar = Arc::new(MemoryCalendar::with_events(&[
            ("2025-09-01", "Orange Chicken"),
            ("2025-09-02", "Pizza party FRHL: Pizza"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper).sync(&desired()).await.unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(calendar.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            calendar.titles_on("2025-09-01"),
            vec!["Orange Chicken", "FRHL: Orange Chicken"]
        );
    }

    #[tokio::test]
    async fn test_duplicates_removed_for_desired_dates_only() {
        let calendar = Arc::new(MemoryCalendar::with_events(&[
            ("2025-09-01", "FRHL: Orange Chicken"),
            ("2025-09-01", "FRHL: Orange Chicken"),
            ("2025-09-05", "FRHL: Fish"),
            ("2025-09-05", "FRHL: Fish"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let desired = vec![
            record("2025-09-01", "Orange Chicken"),
            record("2025-09-08", "Pasta"),
        ];

        let report = reconciler(&calendar, &sleeper).sync(&desired).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.created, 1);
        assert_eq!(calendar.titles_on("2025-09-01"), vec!["FRHL: Orange Chicken"]);
        assert_eq!(calendar.titles_on("2025-09-05").len(), 2);
    }

    #[tokio::test]
    async fn test_failed_date_does_not_stop_others() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.fail_inserts_of("FRHL: Pizza");
        let sleeper = Arc::new(RecordingSleeper::default());
        let desired = vec![
            record("2025-09-01", "Orange Chicken"),
            record("2025-09-02", "Pizza"),
            record("2025-09-03", "Tacos"),
        ];

        let report = reconciler(&calendar, &sleeper).sync(&desired).await.unwrap();

        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert!(report.has_failures());
        assert!(calendar.titles_on("2025-09-02").is_empty());
        assert_eq!(calendar.titles_on("2025-09-03"), vec!["FRHL: Tacos"]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.fail_listing.store(true, Ordering::SeqCst);
        let sleeper = Arc::new(RecordingSleeper::default());

        let result = reconciler(&calendar, &sleeper).sync(&desired()).await;

        assert!(matches!(result, Err(AppError::FetchExhausted { .. })));
        assert_eq!(calendar.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_desired_skips_listing() {
        let calendar = Arc::new(MemoryCalendar::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper).sync(&[]).await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(calendar.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_created_event_carries_settings() {
        let calendar = Arc::new(MemoryCalendar::default());
        let sleeper = Arc::new(RecordingSleeper::default());

        reconciler(&calendar, &sleeper)
            .sync(&[record("2025-09-01", "Orange Chicken")])
            .await
            .unwrap();

        let events = calendar.events.lock().unwrap();
        assert_eq!(events[0].color_id.as_deref(), Some("3"));
        assert_eq!(
            events[0].description.as_deref(),
            Some("MENU ITEMS\n- Orange Chicken")
        );
    }

    #[tokio::test]
    async fn test_failed_replacement_delete_keeps_old_event() {
        let calendar = Arc::new(MemoryCalendar::default());
        let stale = calendar.add("2025-09-01", "FRHL: Tacos");
        calendar.fail_deletes_of(&stale);
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper).sync(&desired()).await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                created: 1,
                deleted: 0,
                skipped: 0,
                failed: 1
            }
        );
        assert_eq!(calendar.insert_calls.load(Ordering::SeqCst), 1);
        assert_eq!(calendar.titles_on("2025-09-01"), vec!["FRHL: Tacos"]);
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Pizza"]);
    }

    #[tokio::test]
    async fn test_failed_duplicate_delete_counts_once() {
        let calendar = Arc::new(MemoryCalendar::default());
        calendar.add("2025-09-01", "FRHL: Orange Chicken");
        let stuck = calendar.add("2025-09-01", "FRHL: Orange Chicken");
        calendar.add("2025-09-01", "FRHL: Old Soup");
        calendar.fail_deletes_of(&stuck);
        let sleeper = Arc::new(RecordingSleeper::default());

        let report = reconciler(&calendar, &sleeper).sync(&desired()).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.created, 1);
        assert_eq!(
            calendar.titles_on("2025-09-01"),
            vec!["FRHL: Orange Chicken", "FRHL: Orange Chicken"]
        );
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Pizza"]);
    }
}
