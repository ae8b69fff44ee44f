//! Parser selection by base URL.
//!
//! Providers are matched by a case-insensitive domain fragment, in table
//! order. Adding a provider means one row here plus one [`MenuParser`]
//! variant.

use crate::error::{AppError, Result};
use crate::models::ParserConfig;
use crate::services::{FdMealPlannerParser, MenuParser, NutriSliceParser};

/// One row of the provider table.
pub struct ProviderRule {
    /// Lower-case URL fragment identifying the provider
    pub fragment: &'static str,
    pub name: &'static str,
    build: fn(&ParserConfig) -> Result<MenuParser>,
}

pub static PROVIDERS: [ProviderRule; 2] = [
    ProviderRule {
        fragment: "nutrislice.com",
        name: NutriSliceParser::NAME,
        build: build_nutrislice,
    },
    ProviderRule {
        fragment: "fdmealplanner.com",
        name: FdMealPlannerParser::NAME,
        build: build_fdmealplanner,
    },
];

fn build_nutrislice(config: &ParserConfig) -> Result<MenuParser> {
    NutriSliceParser::new(config).map(MenuParser::NutriSlice)
}

fn build_fdmealplanner(config: &ParserConfig) -> Result<MenuParser> {
    FdMealPlannerParser::new(config).map(MenuParser::FdMealPlanner)
}

/// Pick and construct the parser for `config.base_url`.
pub fn select_parser(config: &ParserConfig) -> Result<MenuParser> {
    let url = config.base_url.to_lowercase();

    let rule = PROVIDERS
        .iter()
        .find(|rule| url.contains(rule.fragment))
        .ok_or_else(|| AppError::UnsupportedProvider {
            url: config.base_url.clone(),
            supported: supported_providers(),
        })?;

    log::debug!("Detected provider '{}' for URL: {}", rule.name, config.base_url);
    (rule.build)(config)
}

fn supported_providers() -> String {
    PROVIDERS
        .iter()
        .map(|rule| format!("{} ({})", rule.name, rule.fragment))
        .collect::<Vec<_>>()
        .join(", ")
}
