// src/models/mod.rs

//! Domain models for the menu sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod menu;
mod parser;
mod report;

// Re-export all public types
pub use config::{Config, FetchConfig, SyncConfig};
pub use event::{CalendarEvent, NewEvent, Reminder};
pub use menu::{MenuRecord, SyncWindow, is_weekend, sunday_on_or_before};
pub use parser::{ParserConfig, ProviderParams};
pub use report::SyncReport;
