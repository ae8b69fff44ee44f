//! Reconciliation outcome.

use serde::Serialize;

/// Counts of what a sync did, or would do in dry-run mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub deleted: usize,
    /// Dates whose event already carried the expected title
    pub skipped: usize,
    /// Dates whose create or delete call failed
    pub failed: usize,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Lines for [`crate::utils::log::summary`].
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Created", self.created.to_string()),
            ("Deleted", self.deleted.to_string()),
            ("Skipped", self.skipped.to_string()),
            ("Failed", self.failed.to_string()),
        ]
    }
}
