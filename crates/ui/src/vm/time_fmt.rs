use chrono::{DateTime, Utc};
use lms_core::time::to_display_time;

/// `dd/mm/yyyy, hh:mm am|pm` in the display timezone.
#[must_use]
pub fn format_datetime(value: DateTime<Utc>) -> String {
    to_display_time(value)
        .format("%d/%m/%Y, %I:%M %P")
        .to_string()
}
