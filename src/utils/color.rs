//! Calendar color palette.

use crate::error::{AppError, Result};

/// Google Calendar event colors, indexed by color ID.
pub const CALENDAR_COLORS: [(&str, u8); 11] = [
    ("lavender", 1),
    ("sage", 2),
    ("grape", 3),
    ("flamingo", 4),
    ("banana", 5),
    ("tangerine", 6),
    ("peacock", 7),
    ("graphite", 8),
    ("blueberry", 9),
    ("basil", 10),
    ("tomato", 11),
];

/// Resolve a color name (case-insensitive) or a numeric ID to a color ID.
pub fn resolve_color(name_or_id: &str) -> Result<u8> {
    let input = name_or_id.trim();

    if let Ok(id) = input.parse::<u8>() {
        if (1..=11).contains(&id) {
            return Ok(id);
        }
        return Err(AppError::UnknownColor(name_or_id.to_string()));
    }

    let lower = input.to_lowercase();
    CALENDAR_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, id)| *id)
        .ok_or_else(|| AppError::UnknownColor(name_or_id.to_string()))
}
