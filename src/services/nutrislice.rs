// src/services/nutrislice.rs

//! Weekly-batch menu provider.
//!
//! One request per calendar week (`<base>/<YYYY>/<MM>/<DD>/`, keyed by the
//! week's Sunday) returns every day of that week with its food items.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::Result;
use crate::models::{MenuRecord, ParserConfig, SyncWindow};
use crate::services::render::{Block, render_detail};
use crate::utils::http::{Fetcher, HttpRequest};
use crate::utils::text::TextRules;

/// Position assigned to items that carry none.
const LAST_POSITION: i64 = i64::MAX;

#[derive(Debug, Deserialize)]
struct WeekResponse {
    #[serde(default)]
    days: Option<Vec<DayMenu>>,
}

#[derive(Debug, Deserialize)]
struct DayMenu {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    menu_items: Option<Vec<MenuItem>>,
}

#[derive(Debug, Deserialize)]
struct MenuItem {
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    is_holiday: Option<bool>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    food: Option<Food>,
}

#[derive(Debug, Deserialize)]
struct Food {
    #[serde(default)]
    name: Option<String>,
}

impl MenuItem {
    fn position(&self) -> i64 {
        self.position.unwrap_or(LAST_POSITION)
    }

    fn text(&self) -> Option<&str> {
        non_blank(self.text.as_deref())
    }

    fn food_name(&self) -> Option<&str> {
        non_blank(self.food.as_ref().and_then(|f| f.name.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parser for the weekly provider.
#[derive(Debug, Clone)]
pub struct NutriSliceParser {
    base_url: String,
    text_rules: TextRules,
}

impl NutriSliceParser {
    pub const NAME: &'static str = "NutriSlice";

    pub fn new(config: &ParserConfig) -> Result<Self> {
        url::Url::parse(config.base_url.trim())?;
        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            text_rules: config.text_rules.clone(),
        })
    }

    /// Endpoint for the week starting on `sunday`.
    pub fn week_url(&self, sunday: NaiveDate) -> String {
        format!("{}/{}/", self.base_url, sunday.format("%Y/%m/%d"))
    }

    /// Fetch one week and keep the window's days.
    pub async fn fetch_week(
        &self,
        sunday: NaiveDate,
        window: &SyncWindow,
        fetcher: &Fetcher,
    ) -> Result<Vec<MenuRecord>> {
        let url = self.week_url(sunday);
        log::debug!("Fetching weekly menu for week of {} from {}", sunday, url);

        let response: WeekResponse = fetcher.fetch_json(&HttpRequest::get(url)).await?;
        Ok(self.extract_week(response, window))
    }

    fn extract_week(&self, response: WeekResponse, window: &SyncWindow) -> Vec<MenuRecord> {
        let mut records = Vec::new();

        for day in response.days.unwrap_or_default() {
            let Some(date_str) = day.date.as_deref() else {
                continue;
            };
            let date = match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    log::warn!("Invalid date format: {}", date_str);
                    continue;
                }
            };
            if !window.contains(date) {
                continue;
            }

            if let Some(record) = self.extract_day(date, day.menu_items.unwrap_or_default()) {
                log::info!("Collected menu for {}: {}", date, record.display_text);
                records.push(record);
            }
        }

        records
    }

    fn extract_day(&self, date: NaiveDate, mut items: Vec<MenuItem>) -> Option<MenuRecord> {
        if items.is_empty() {
            log::debug!("No menu items for {}", date);
            return None;
        }
        if items.iter().any(|item| item.is_holiday.unwrap_or(false)) {
            log::info!("Holiday detected for {}, skipping", date);
            return None;
        }

        // Stable: equal positions keep response order
        items.sort_by_key(MenuItem::position);

        let display = items
            .iter()
            .find_map(|item| item.text().or_else(|| item.food_name()))
            .map(|name| self.text_rules.apply(name))
            .filter(|name| !name.is_empty());
        let Some(display) = display else {
            log::debug!("No usable menu title for {}", date);
            return None;
        };

        let mut block = Block::new("Menu Items");
        for name in items.iter().filter_map(MenuItem::food_name) {
            let name = self.text_rules.apply(name);
            if !name.is_empty() {
                block.push(name, 0);
            }
        }

        Some(MenuRecord::new(date, display, render_detail(&[block])))
    }
}
