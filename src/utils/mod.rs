//! Utility functions and helpers.

pub mod color;
pub mod http;
pub mod log;
pub mod text;

pub use color::resolve_color;
pub use text::{TextRules, apply_text_rules};
