//! Pipeline entry points for a sync run.
//!
//! - `run_collect`: Fetch menus for the window
//! - `Reconciler`: Converge calendar events to the collected menus
//! - `run`: Whole job with exit status
//! - `DuplicateCleaner`: Standalone duplicate removal

pub mod cleanup;
pub mod collect;
pub mod run;
pub mod sync;

pub use cleanup::{CleanupReport, DuplicateCleaner};
pub use collect::{format_records, run_collect};
pub use run::{
    CleanupOptions, RunOptions, RunOutcome, Runner, SyncTarget, cleanup_exit_code, exit_code, run,
    run_cleanup,
};
pub use sync::{EventSettings, Reconciler};
