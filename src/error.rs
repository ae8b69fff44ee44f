// src/error.rs

//! Unified error handling for the menu sync application.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for menu sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No parser is registered for the base URL
    #[error("Unsupported menu API URL: {url}. Supported: {supported}")]
    UnsupportedProvider { url: String, supported: String },

    /// A matched provider is missing required parameters
    #[error("Missing required {provider} parameters: {}", missing.join(", "))]
    InvalidConfiguration {
        provider: &'static str,
        missing: Vec<String>,
    },

    /// Color name is not in the calendar palette
    #[error("Unknown color '{0}'. Use a name (lavender..tomato) or an ID from 1 to 11")]
    UnknownColor(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-retryable 4xx response
    #[error("HTTP {status} from {url}")]
    FetchClient { url: String, status: u16 },

    /// Every attempt failed
    #[error("Fetch of {url} failed after {attempts} attempts: {last}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    /// A single create/delete call failed
    #[error("Calendar operation failed for {date}: {message}")]
    CalendarOperation { date: NaiveDate, message: String },

    /// Credential bootstrap failed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl fmt::Display) -> Self {
        Self::Auth(message.to_string())
    }

    /// Create a calendar operation error for a date.
    pub fn calendar(date: NaiveDate, message: impl fmt::Display) -> Self {
        Self::CalendarOperation {
            date,
            message: message.to_string(),
        }
    }

    /// Whether this error belongs to the fatal configuration class.
    ///
    /// Configuration errors are raised before any network activity and map
    /// to a different exit code than runtime failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedProvider { .. }
                | Self::InvalidConfiguration { .. }
                | Self::UnknownColor(_)
                | Self::Config(_)
                | Self::Toml(_)
                | Self::Url(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(AppError::UnknownColor("plaid".into()).is_configuration());
        assert!(AppError::config("bad").is_configuration());
        assert!(
            !AppError::FetchClient {
                url: "https://x".into(),
                status: 404
            }
            .is_configuration()
        );
        assert!(!AppError::auth("expired").is_configuration());
    }

    #[test]
    fn test_invalid_configuration_lists_missing_fields() {
        let err = AppError::InvalidConfiguration {
            provider: "FDMealPlanner",
            missing: vec!["account_id".into(), "tenant_id".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required FDMealPlanner parameters: account_id, tenant_id"
        );
    }
}
