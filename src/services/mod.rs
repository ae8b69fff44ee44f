//! Menu source parsers.
//!
//! This module contains:
//! - The weekly provider (`NutriSliceParser`)
//! - The monthly categorized provider (`FdMealPlannerParser`)
//! - Provider selection by URL (`select_parser`)
//! - The unit-by-unit collection loop shared by every provider

mod fdmealplanner;
mod nutrislice;
pub mod render;
mod selector;

use std::fmt;

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{MenuRecord, SyncConfig, SyncWindow};
use crate::utils::http::Fetcher;

pub use fdmealplanner::FdMealPlannerParser;
pub use nutrislice::NutriSliceParser;
pub use selector::{PROVIDERS, ProviderRule, select_parser};

/// One request's worth of menu data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionUnit {
    /// Week starting on the given Sunday
    Week(NaiveDate),
    Month { year: i32, month: u32 },
}

impl fmt::Display for CollectionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Week(sunday) => write!(f, "week of {sunday}"),
            Self::Month { year, month } => write!(f, "month {year}-{month:02}"),
        }
    }
}

/// Summary of a collection pass.
#[derive(Debug, Default)]
pub struct Collection {
    /// Records ordered by date, at most one per date
    pub records: Vec<MenuRecord>,
    pub unit_total: usize,
    pub failed_units: usize,
}

impl Collection {
    pub fn has_failures(&self) -> bool {
        self.failed_units > 0
    }
}

/// The closed set of supported providers.
#[derive(Debug, Clone)]
pub enum MenuParser {
    NutriSlice(NutriSliceParser),
    FdMealPlanner(FdMealPlannerParser),
}

impl MenuParser {
    pub fn provider(&self) -> &'static str {
        match self {
            Self::NutriSlice(_) => NutriSliceParser::NAME,
            Self::FdMealPlanner(_) => FdMealPlannerParser::NAME,
        }
    }

    /// Units to request for `window`, in date order.
    pub fn units(&self, window: &SyncWindow) -> Vec<CollectionUnit> {
        self.plan(window).iter().map(PlannedUnit::unit).collect()
    }

    fn plan(&self, window: &SyncWindow) -> Vec<PlannedUnit<'_>> {
        match self {
            Self::NutriSlice(parser) => window
                .week_starts()
                .into_iter()
                .map(|sunday| PlannedUnit::Week(parser, sunday))
                .collect(),
            Self::FdMealPlanner(parser) => window
                .months()
                .into_iter()
                .map(|(year, month)| PlannedUnit::Month(parser, year, month))
                .collect(),
        }
    }

    /// Walk every unit of the window once.
    ///
    /// A failed unit contributes no records and is counted; collection stops
    /// early only after `max_consecutive_failures` failures in a row.
    pub async fn collect(
        &self,
        window: &SyncWindow,
        fetcher: &Fetcher,
        settings: &SyncConfig,
    ) -> Collection {
        let units = self.plan(window);
        let limit = settings.max_consecutive_failures.max(1);
        let mut collection = Collection {
            unit_total: units.len(),
            ..Collection::default()
        };
        let mut consecutive_failures = 0;

        log::info!(
            "Starting {} menu collection from {} ({} units)",
            self.provider(),
            window.start_date,
            units.len()
        );

        for (index, planned) in units.iter().enumerate() {
            if index > 0 {
                fetcher.pause(settings.request_delay()).await;
            }

            let unit = planned.unit();
            match planned.fetch(window, fetcher).await {
                Ok(records) => {
                    log::debug!("{}: found {} menus", unit, records.len());
                    consecutive_failures = 0;
                    collection.records.extend(records);
                }
                Err(e) => {
                    log::warn!("Failed to fetch menus for {}: {}", unit, e);
                    collection.failed_units += 1;
                    consecutive_failures += 1;
                    if consecutive_failures >= limit {
                        log::error!(
                            "Failed to fetch {} consecutive units, stopping collection",
                            consecutive_failures
                        );
                        break;
                    }
                }
            }
        }

        collection.records.sort_by_key(|r| r.date);
        collection.records.dedup_by_key(|r| r.date);

        log::info!(
            "{} menu collection complete. Found {} menus ({} of {} units failed)",
            self.provider(),
            collection.records.len(),
            collection.failed_units,
            collection.unit_total
        );
        collection
    }
}

/// A unit bound to the parser that fetches it.
enum PlannedUnit<'a> {
    Week(&'a NutriSliceParser, NaiveDate),
    Month(&'a FdMealPlannerParser, i32, u32),
}

impl PlannedUnit<'_> {
    fn unit(&self) -> CollectionUnit {
        match *self {
            Self::Week(_, sunday) => CollectionUnit::Week(sunday),
            Self::Month(_, year, month) => CollectionUnit::Month { year, month },
        }
    }

    async fn fetch(&self, window: &SyncWindow, fetcher: &Fetcher) -> Result<Vec<MenuRecord>> {
        match *self {
            Self::Week(parser, sunday) => parser.fetch_week(sunday, window, fetcher).await,
            Self::Month(parser, year, month) => {
                parser.fetch_month(year, month, window, fetcher).await
            }
        }
    }
}
