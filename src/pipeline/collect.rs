// src/pipeline/collect.rs

use crate::models::{MenuRecord, SyncConfig, SyncWindow};
use crate::services::{Collection, MenuParser};
use crate::utils::http::Fetcher;

/// Run the parser over the window once.
pub async fn run_collect(
    parser: &MenuParser,
    window: &SyncWindow,
    fetcher: &Fetcher,
    settings: &SyncConfig,
) -> Collection {
    log::info!(
        "Collecting {} menus for {} to {}",
        parser.provider(),
        window.start_date,
        window.end_date()
    );
    let collection = parser.collect(window, fetcher, settings).await;
    for record in &collection.records {
        log::debug!("{}: {}", record.date, record.display_text);
    }
    collection
}

/// Human-readable listing used by dry runs without a calendar.
pub fn format_records(records: &[MenuRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&format!("{}: {}\n", record.date, record.display_text));
        if let Some(detail) = &record.detail_text {
            for line in detail.lines() {
                if line.is_empty() {
                    out.push('\n');
                } else {
                    out.push_str(&format!("    {line}\n"));
                }
            }
        }
    }
    out
}
