//! Titles for generated lesson materials

use chrono::{DateTime, SecondsFormat, Utc};
use lessongen_common::events::GenerationType;

/// Separator between the type label and the timestamp
pub const AUTO_TITLE_MARKER: &str = " AI tạo_";

/// `"{Audio|Video} AI tạo_YYYYMMDDHHMMSS"` for the given instant
pub fn auto_title(generation_type: GenerationType, at: DateTime<Utc>) -> String {
    format!("{}{}{}", generation_type.label(), AUTO_TITLE_MARKER, utc_timestamp(at))
}

/// ISO 8601 instant with all separators removed, cut to 14 digits
pub fn utc_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .chars()
        .filter(char::is_ascii_digit)
        .take(14)
        .collect()
}
