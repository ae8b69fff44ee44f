// src/services/fdmealplanner.rs

//! Monthly-batch, categorized menu provider.
//!
//! One request per calendar month returns every served day with its recipe
//! components. Components carry a category, a sequence number and an
//! optional parent, and are rendered grouped by category.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{MenuRecord, ParserConfig, SyncWindow};
use crate::services::render::{Block, render_detail};
use crate::utils::http::{Fetcher, HttpRequest};
use crate::utils::text::TextRules;

/// Parameters the provider cannot work without, by CLI-facing name.
pub const REQUIRED_PARAMS: [&str; 4] = ["account_id", "location_id", "meal_period_id", "tenant_id"];

const TIME_OFFSET: &str = "360";

#[derive(Debug, Deserialize)]
struct MonthResponse {
    #[serde(default)]
    result: Option<Vec<DayMenu>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayMenu {
    #[serde(default)]
    str_menu_for_date: Option<String>,
    #[serde(default)]
    menu_recipies_data: Option<Vec<Recipe>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipe {
    #[serde(default)]
    component_id: Option<i64>,
    #[serde(default)]
    parent_component_id: Option<i64>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    sequence_number: Option<i64>,
    #[serde(default)]
    english_alternate_name: Option<String>,
    #[serde(default)]
    component_name: Option<String>,
}

impl Recipe {
    /// Preferred human-readable name, falling back to the internal one.
    fn resolved_name(&self) -> Option<&str> {
        let english = self
            .english_alternate_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("n/a"));
        english.or_else(|| {
            self.component_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
        })
    }

    fn is_top_level(&self) -> bool {
        matches!(self.parent_component_id, None | Some(0))
    }

    fn category(&self) -> &str {
        self.category.as_deref().map(str::trim).unwrap_or("")
    }
}

/// A component that survived name filtering.
struct Component<'a> {
    recipe: &'a Recipe,
    name: &'a str,
}

/// Top-level components grouped by category in first-appearance order.
struct CategoryGroup<'a> {
    category: &'a str,
    parents: Vec<&'a Component<'a>>,
}

/// Validated provider parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AccountParams {
    account_id: String,
    location_id: String,
    meal_period_id: String,
    tenant_id: String,
}

/// Parser for the monthly categorized provider.
#[derive(Debug, Clone)]
pub struct FdMealPlannerParser {
    base_url: String,
    params: AccountParams,
    text_rules: TextRules,
}

impl FdMealPlannerParser {
    pub const NAME: &'static str = "FDMealPlanner";

    /// Validate the provider parameters once, up front.
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let missing: Vec<String> = REQUIRED_PARAMS
            .iter()
            .filter(|name| config.params.get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::InvalidConfiguration {
                provider: Self::NAME,
                missing,
            });
        }

        url::Url::parse(config.base_url.trim())?;

        let param = |name: &str| config.params.get(name).unwrap_or_default().to_string();
        Ok(Self {
            base_url: config.base_url.trim().to_string(),
            params: AccountParams {
                account_id: param("account_id"),
                location_id: param("location_id"),
                meal_period_id: param("meal_period_id"),
                tenant_id: param("tenant_id"),
            },
            text_rules: config.text_rules.clone(),
        })
    }

    /// Request for one month; `cache_buster` fills the `_` parameter.
    pub fn month_request(&self, year: i32, month: u32, cache_buster: i64) -> Result<HttpRequest> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::config(format!("Invalid month {year}-{month:02}")))?;
        let last = last_day_of_month(first);

        Ok(HttpRequest::get(&self.base_url)
            .query("menuId", "0")
            .query("accountId", &self.params.account_id)
            .query("locationId", &self.params.location_id)
            .query("mealPeriodId", &self.params.meal_period_id)
            .query("tenantId", &self.params.tenant_id)
            .query("monthId", month.to_string())
            .query("fromDate", first.format("%Y/%m/%d").to_string())
            .query("endDate", last.format("%Y/%m/%d").to_string())
            .query("timeOffset", TIME_OFFSET)
            .query("_", cache_buster.to_string()))
    }

    /// Fetch one month and keep the window's days.
    pub async fn fetch_month(
        &self,
        year: i32,
        month: u32,
        window: &SyncWindow,
        fetcher: &Fetcher,
    ) -> Result<Vec<MenuRecord>> {
        log::debug!("Fetching menu data for {year}-{month:02} from {}", self.base_url);

        let request = self.month_request(year, month, Utc::now().timestamp_millis())?;
        let response: MonthResponse = fetcher.fetch_json(&request).await?;

        let days = response.result.unwrap_or_default();
        if days.is_empty() {
            log::info!("No menu data available for {year}-{month:02}");
        }
        Ok(self.extract_month(days, window))
    }

    fn extract_month(&self, days: Vec<DayMenu>, window: &SyncWindow) -> Vec<MenuRecord> {
        let mut records = Vec::new();

        for day in days {
            let Some(date_str) = day.str_menu_for_date.as_deref() else {
                continue;
            };
            // The provider sometimes appends a time component
            let date = match NaiveDate::parse_from_str(date_str.get(..10).unwrap_or(date_str), "%Y-%m-%d") {
                Ok(date) => date,
                Err(_) => {
                    log::warn!("Invalid date format: {}", date_str);
                    continue;
                }
            };
            if !window.contains(date) {
                continue;
            }

            let recipes = day.menu_recipies_data.unwrap_or_default();
            if let Some(record) = self.extract_day(date, &recipes) {
                log::info!("Collected menu for {}: {}", date, record.display_text);
                records.push(record);
            }
        }

        records
    }

    fn extract_day(&self, date: NaiveDate, recipes: &[Recipe]) -> Option<MenuRecord> {
        let mut components: Vec<Component<'_>> = recipes
            .iter()
            .filter_map(|recipe| {
                recipe
                    .resolved_name()
                    .map(|name| Component { recipe, name })
            })
            .collect();
        components.sort_by_key(|c| c.recipe.sequence_number.unwrap_or(i64::MAX));

        let mut children: HashMap<i64, Vec<&Component<'_>>> = HashMap::new();
        for component in components.iter().filter(|c| !c.recipe.is_top_level()) {
            if let Some(parent_id) = component.recipe.parent_component_id {
                children.entry(parent_id).or_default().push(component);
            }
        }

        let groups = group_by_category(&components);
        if groups.is_empty() {
            log::debug!("No menu components for {}", date);
            return None;
        }

        let display = title_component(&groups)
            .map(|c| self.text_rules.apply(c.name))
            .filter(|name| !name.is_empty());
        let Some(display) = display else {
            log::debug!("No usable menu title for {}", date);
            return None;
        };

        let blocks: Vec<Block> = groups
            .iter()
            .map(|group| {
                let mut block = Block::new(group.category);
                for parent in &group.parents {
                    block.push(self.text_rules.apply(parent.name), 0);
                    let kids = parent
                        .recipe
                        .component_id
                        .and_then(|id| children.get(&id));
                    for child in kids.into_iter().flatten() {
                        block.push(self.text_rules.apply(child.name), 1);
                    }
                }
                block
            })
            .collect();

        Some(MenuRecord::new(date, display, render_detail(&blocks)))
    }
}

fn group_by_category<'a>(components: &'a [Component<'a>]) -> Vec<CategoryGroup<'a>> {
    let mut groups: Vec<CategoryGroup<'a>> = Vec::new();
    for component in components.iter().filter(|c| c.recipe.is_top_level()) {
        let category = component.recipe.category();
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.parents.push(component),
            None => groups.push(CategoryGroup {
                category,
                parents: vec![component],
            }),
        }
    }
    groups
}

/// First top-level component in rendering order.
fn title_component<'a>(groups: &[CategoryGroup<'a>]) -> Option<&'a Component<'a>> {
    groups
        .first()
        .and_then(|group| group.parents.first())
        .copied()
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}
