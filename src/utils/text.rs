// src/utils/text.rs

//! Text rewriting applied to menu names before they reach the calendar.

use crate::error::{AppError, Result};

/// Abbreviation removed by `--replace-wg` ("whole grain").
pub const ABBREVIATION: &str = "WG";

/// Ordered find→replace rules plus the abbreviation-strip flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRules {
    pub replacements: Vec<(String, String)>,
    pub strip_abbreviation: bool,
}

impl TextRules {
    /// Build rules from `find->replace` strings, keeping declaration order.
    pub fn parse<S: AsRef<str>>(rules: &[S], strip_abbreviation: bool) -> Result<Self> {
        let replacements = rules
            .iter()
            .map(|s| parse_rule(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            replacements,
            strip_abbreviation,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && !self.strip_abbreviation
    }

    pub fn apply(&self, text: &str) -> String {
        apply_text_rules(text, &self.replacements, self.strip_abbreviation)
    }
}

/// Split a single `find->replace` rule. The replacement may be empty.
pub fn parse_rule(rule: &str) -> Result<(String, String)> {
    match rule.split_once("->") {
        Some((find, _)) if find.is_empty() => Err(AppError::config(format!(
            "Text replacement '{rule}' has an empty search string"
        ))),
        Some((find, replace)) => Ok((find.to_string(), replace.to_string())),
        None => Err(AppError::config(format!(
            "Text replacement '{rule}' must use the form find->replace"
        ))),
    }
}

/// Apply rules in order, each to its first match only, then optionally drop
/// the abbreviation token. Whitespace left behind is normalized to single spaces.
pub fn apply_text_rules(text: &str, rules: &[(String, String)], strip_abbrev: bool) -> String {
    if rules.is_empty() && !strip_abbrev {
        return text.to_string();
    }

    let mut result = text.to_string();
    for (find, replace) in rules {
        if !find.is_empty() {
            result = result.replacen(find.as_str(), replace, 1);
        }
    }

    result
        .split_whitespace()
        .filter(|token| !strip_abbrev || *token != ABBREVIATION)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(f, r)| (f.to_string(), r.to_string()))
            .collect()
    }

    #[test]
    fn test_single_rule() {
        let r = rules(&[("WG ", "")]);
        assert_eq!(
            apply_text_rules("WG Popcorn Chicken", &r, false),
            "Popcorn Chicken"
        );
    }

    #[test]
    fn test_rules_apply_in_order_first_match_only() {
        let r = rules(&[("a", "b"), ("b", "c")]);
        assert_eq!(apply_text_rules("aa", &r, false), "ca");
    }

    #[test]
    fn test_strip_abbreviation() {
        assert_eq!(apply_text_rules("WG Pizza WG Slice WG", &[], true), "Pizza Slice");
        // Only whole tokens are removed
        assert_eq!(apply_text_rules("WGX Bagel", &[], true), "WGX Bagel");
    }

    #[test]
    fn test_whitespace_normalized_after_rules() {
        let r = rules(&[("Spicy", "")]);
        assert_eq!(
            apply_text_rules(" Spicy  Chicken\tWrap ", &r, false),
            "Chicken Wrap"
        );
    }

    #[test]
    fn test_no_rules_is_identity() {
        assert_eq!(apply_text_rules("  Tacos  ", &[], false), "  Tacos  ");
    }

    #[test]
    fn test_parse_rules() {
        let parsed = TextRules::parse(&["Chkn->Chicken", "Entree: ->"], false).unwrap();
        assert_eq!(
            parsed.replacements,
            rules(&[("Chkn", "Chicken"), ("Entree: ", "")])
        );
        assert_eq!(parsed.apply("Entree: Chkn Nuggets"), "Chicken Nuggets");
    }

    #[test]
    fn test_parse_rule_errors() {
        assert!(parse_rule("no arrow").is_err());
        assert!(parse_rule("->x").is_err());
    }
}
