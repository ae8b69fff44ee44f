// src/pipeline/run.rs

//! Whole-run orchestration: validate, collect, reconcile, report.

use std::sync::Arc;

use crate::calendar::{CalendarService, CredentialSource, GoogleCalendar};
use crate::error::{AppError, Result};
use crate::models::{Config, MenuRecord, ParserConfig, SyncConfig, SyncReport, SyncWindow};
use crate::pipeline::cleanup::{CleanupReport, DuplicateCleaner};
use crate::pipeline::collect::run_collect;
use crate::pipeline::sync::{EventSettings, Reconciler};
use crate::services::{MenuParser, select_parser};
use crate::utils::http::{Fetcher, ReqwestTransport, Sleeper, TokioSleeper};
use crate::utils::log::{header, step, summary};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIGURATION: i32 = 2;

/// Everything one run needs beyond the file configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub parser: ParserConfig,
    pub window: SyncWindow,
    pub calendar_id: Option<String>,
    pub event: EventSettings,
    pub dry_run: bool,
    pub credentials: CredentialSource,
}

/// Inputs for a standalone duplicate cleanup.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub window: SyncWindow,
    pub calendar_id: Option<String>,
    pub prefix: String,
    /// Remove duplicates instead of only reporting them
    pub delete: bool,
    pub credentials: CredentialSource,
}

/// Where collected records are reconciled.
pub struct SyncTarget {
    pub calendar: Arc<dyn CalendarService>,
    pub event: EventSettings,
    pub dry_run: bool,
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<MenuRecord>,
    pub unit_total: usize,
    pub failed_units: usize,
    /// Absent when only collecting
    pub report: Option<SyncReport>,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        self.failed_units > 0 || self.report.is_some_and(|r| r.has_failures())
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            EXIT_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }
}

/// Map a run result to the process exit status.
pub fn exit_code(result: &Result<RunOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) if e.is_configuration() => EXIT_CONFIGURATION,
        Err(_) => EXIT_FAILURE,
    }
}

/// Collects and reconciles with injected network seams.
pub struct Runner {
    fetcher: Fetcher,
    sleeper: Arc<dyn Sleeper>,
    settings: SyncConfig,
}

impl Runner {
    pub fn new(fetcher: Fetcher, sleeper: Arc<dyn Sleeper>, settings: SyncConfig) -> Self {
        Self {
            fetcher,
            sleeper,
            settings,
        }
    }

    pub async fn run(
        &self,
        parser: &MenuParser,
        window: &SyncWindow,
        target: Option<SyncTarget>,
    ) -> Result<RunOutcome> {
        let total_steps = if target.is_some() { 2 } else { 1 };

        step(1, total_steps, "Collect - Fetching menus");
        let collection = run_collect(parser, window, &self.fetcher, &self.settings).await;
        let mut outcome = RunOutcome {
            unit_total: collection.unit_total,
            failed_units: collection.failed_units,
            records: collection.records,
            report: None,
        };

        if let Some(target) = target {
            step(2, total_steps, "Sync - Reconciling calendar events");
            let reconciler = Reconciler::new(
                target.calendar,
                Arc::clone(&self.sleeper),
                target.event,
                self.settings.request_delay(),
            )
            .dry_run(target.dry_run);
            outcome.report = Some(reconciler.sync(&outcome.records).await?);
        }

        let mut items = vec![
            ("Menus collected", outcome.records.len().to_string()),
            (
                "Units failed",
                format!("{} of {}", outcome.failed_units, outcome.unit_total),
            ),
        ];
        if let Some(report) = &outcome.report {
            items.extend(report.summary_items());
        }
        summary("Menu Sync", &items);

        Ok(outcome)
    }
}

/// Run the whole job against the real network.
///
/// Configuration problems are reported before any request is made.
pub async fn run(options: RunOptions, config: &Config) -> Result<RunOutcome> {
    header("School Menu Calendar Sync");

    config.validate()?;
    let parser = select_parser(&options.parser)?;
    if !options.dry_run && options.calendar_id.is_none() {
        return Err(AppError::config(
            "--calendar-id is required unless --dry-run is set",
        ));
    }

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let transport = Arc::new(ReqwestTransport::new(&config.fetch.user_agent)?);
    let fetcher = Fetcher::new(transport, Arc::clone(&sleeper), config.fetch.policy());

    let target = match &options.calendar_id {
        Some(calendar_id) => {
            let token = options.credentials.access_token().await?;
            let calendar = GoogleCalendar::new(fetcher.clone(), calendar_id.clone(), token);
            Some(SyncTarget {
                calendar: Arc::new(calendar),
                event: options.event.clone(),
                dry_run: options.dry_run,
            })
        }
        None => None,
    };

    if options.dry_run {
        log::info!("Dry run: no calendar changes will be made");
    }

    Runner::new(fetcher, sleeper, config.sync.clone())
        .run(&parser, &options.window, target)
        .await
}

/// Find duplicate prefixed events on the real calendar, deleting them only
/// when asked to.
pub async fn run_cleanup(options: CleanupOptions, config: &Config) -> Result<CleanupReport> {
    header("Duplicate Menu Event Cleanup");

    config.validate()?;
    let Some(calendar_id) = options.calendar_id else {
        return Err(AppError::config(
            "--calendar-id is required for --cleanup-duplicates",
        ));
    };

    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let transport = Arc::new(ReqwestTransport::new(&config.fetch.user_agent)?);
    let fetcher = Fetcher::new(transport, Arc::clone(&sleeper), config.fetch.policy());
    let token = options.credentials.access_token().await?;
    let calendar = GoogleCalendar::new(fetcher, calendar_id, token);

    if !options.delete {
        log::info!("Report only: no events will be deleted");
    }

    let report = DuplicateCleaner::new(
        Arc::new(calendar),
        sleeper,
        options.prefix,
        config.sync.request_delay(),
    )
    .delete(options.delete)
    .run(options.window.start_date, options.window.end_date())
    .await?;

    summary("Duplicate Cleanup", &report.summary_items());
    Ok(report)
}

/// Exit status for a cleanup result.
pub fn cleanup_exit_code(result: &Result<CleanupReport>) -> i32 {
    match result {
        Ok(report) if report.has_failures() => EXIT_FAILURE,
        Ok(_) => EXIT_SUCCESS,
        Err(e) if e.is_configuration() => EXIT_CONFIGURATION,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;

    use super::*;
    use crate::calendar::testing::MemoryCalendar;
    use crate::utils::http::testing::{RecordingSleeper, ScriptedTransport, fetcher};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn parser() -> MenuParser {
        select_parser(&ParserConfig {
            base_url: "https://d.api.nutrislice.com/menu/api/weeks/school/x/menu-type/lunch".into(),
            ..Default::default()
        })
        .unwrap()
    }

    const WEEK: &str = r#"{"days": [
        {"date": "2025-09-01", "menu_items": [{"position": 0, "text": "Orange Chicken"}]},
        {"date": "2025-09-02", "menu_items": [{"position": 0, "text": "Pizza"}]}
    ]}"#;

    fn runner(transport: Arc<ScriptedTransport>) -> Runner {
        let sleeper = Arc::new(RecordingSleeper::default());
        Runner::new(
            fetcher(transport, sleeper.clone(), 1),
            sleeper,
            SyncConfig::default(),
        )
    }

    fn target(calendar: &Arc<MemoryCalendar>, dry_run: bool) -> SyncTarget {
        SyncTarget {
            calendar: calendar.clone(),
            event: EventSettings {
                prefix: "FRHL: ".into(),
                color_id: 3,
                reminder: None,
            },
            dry_run,
        }
    }

    #[tokio::test]
    async fn test_collect_and_sync() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, WEEK));
        let calendar = Arc::new(MemoryCalendar::with_events(&[
            ("2025-09-01", "FRHL: Orange Chicken"),
            ("2025-09-02", "FRHL: Tacos"),
        ]));
        let window = SyncWindow::new(date("2025-09-01"), 1).unwrap();

        let outcome = runner(transport)
            .run(&parser(), &window, Some(target(&calendar, false)))
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(
            outcome.report,
            Some(SyncReport {
                created: 1,
                deleted: 1,
                skipped: 1,
                failed: 0
            })
        );
        assert_eq!(outcome.exit_code(), EXIT_SUCCESS);
        assert_eq!(calendar.titles_on("2025-09-02"), vec!["FRHL: Pizza"]);
    }

    #[tokio::test]
    async fn test_failed_unit_sets_failure_exit() {
        let transport = Arc::new(ScriptedTransport::new().reply(500, ""));
        let calendar = Arc::new(MemoryCalendar::default());
        let window = SyncWindow::new(date("2025-09-01"), 1).unwrap();

        let outcome = runner(transport)
            .run(&parser(), &window, Some(target(&calendar, false)))
            .await
            .unwrap();

        assert!(outcome.records.is_empty());
        assert_eq!(outcome.failed_units, 1);
        assert_eq!(outcome.exit_code(), EXIT_FAILURE);
        // Nothing desired, nothing listed
        assert_eq!(calendar.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_collect_only() {
        let transport = Arc::new(ScriptedTransport::new().reply(200, WEEK));
        let window = SyncWindow::new(date("2025-09-01"), 1).unwrap();

        let outcome = runner(transport).run(&parser(), &window, None).await.unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.report.is_none());
        assert_eq!(outcome.exit_code(), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_configuration_errors_exit_before_network() {
        let options = RunOptions {
            parser: ParserConfig {
                base_url: "https://menus.example.org/api".into(),
                ..Default::default()
            },
            window: SyncWindow::new(date("2025-09-01"), 1).unwrap(),
            calendar_id: Some("cal".into()),
            event: EventSettings::default(),
            dry_run: false,
            credentials: CredentialSource::ServiceAccount {
                key: "missing.json".into(),
            },
        };

        let result = run(options, &Config::default()).await;
        assert!(matches!(result, Err(AppError::UnsupportedProvider { .. })));
        assert_eq!(exit_code(&result), EXIT_CONFIGURATION);
    }

    #[tokio::test]
    async fn test_calendar_id_required_without_dry_run() {
        let options = RunOptions {
            parser: ParserConfig {
                base_url: "https://d.api.nutrislice.com/menu".into(),
                ..Default::default()
            },
            window: SyncWindow::new(date("2025-09-01"), 1).unwrap(),
            calendar_id: None,
            event: EventSettings::default(),
            dry_run: false,
            credentials: CredentialSource::ServiceAccount {
                key: "missing.json".into(),
            },
        };

        let result = run(options, &Config::default()).await;
        assert_eq!(exit_code(&result), EXIT_CONFIGURATION);
    }

    #[tokio::test]
    async fn test_cleanup_requires_calendar_id() {
        let options = CleanupOptions {
            window: SyncWindow::new(date("2025-09-01"), 1).unwrap(),
            calendar_id: None,
            prefix: "FRHL: ".into(),
            delete: true,
            credentials: CredentialSource::ServiceAccount {
                key: "missing.json".into(),
            },
        };

        let result = run_cleanup(options, &Config::default()).await;
        assert!(result.as_ref().is_err_and(|e| e.is_configuration()));
        assert_eq!(cleanup_exit_code(&result), EXIT_CONFIGURATION);
    }

    #[test]
    fn test_cleanup_exit_codes() {
        let clean: Result<CleanupReport> = Ok(CleanupReport {
            dates: 1,
            found: 2,
            deleted: 2,
            failed: 0,
        });
        assert_eq!(cleanup_exit_code(&clean), EXIT_SUCCESS);

        let partial: Result<CleanupReport> = Ok(CleanupReport {
            failed: 1,
            ..CleanupReport::default()
        });
        assert_eq!(cleanup_exit_code(&partial), EXIT_FAILURE);
    }

    #[test]
    fn test_runtime_error_exit_code() {
        let result: Result<RunOutcome> = Err(AppError::auth("expired"));
        assert_eq!(exit_code(&result), EXIT_FAILURE);
    }
}
