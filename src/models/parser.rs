//! Parser configuration.

use crate::utils::text::TextRules;

/// Everything a menu parser needs, before provider validation.
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Upstream menu API root; selects the parser
    pub base_url: String,

    /// Provider-specific parameters, validated by the matched provider only
    pub params: ProviderParams,

    /// Rewrites applied to every display and detail text
    pub text_rules: TextRules,
}

/// Optional provider parameters as supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProviderParams {
    pub account_id: Option<String>,
    pub location_id: Option<String>,
    pub meal_period_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl ProviderParams {
    /// Look up a parameter by its CLI-facing name, ignoring blank values.
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "account_id" => self.account_id.as_deref(),
            "location_id" => self.location_id.as_deref(),
            "meal_period_id" => self.meal_period_id.as_deref(),
            "tenant_id" => self.tenant_id.as_deref(),
            _ => None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}
