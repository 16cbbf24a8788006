//! Conversion between internal UTC date-times and the store's date format.
//!
//! The store writes times signed and truncated to seconds:
//! `+2023-01-01T00:00:00Z`. Conversion is exact in both directions.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::claim::ClaimError;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a date-time the way the store stores it
pub fn to_wire_date(date: &DateTime<Utc>) -> String {
    format!("+{}", date.format(WIRE_FORMAT))
}

/// Parse a store date back into a UTC date-time
pub fn from_wire_date(raw: &str) -> Result<DateTime<Utc>, ClaimError> {
    let unsigned = raw
        .strip_prefix('+')
        .ok_or_else(|| ClaimError::InvalidWireDate(raw.to_string()))?;

    NaiveDateTime::parse_from_str(unsigned, WIRE_FORMAT)
        .map(|date| date.and_utc())
        .map_err(|_| ClaimError::InvalidWireDate(raw.to_string()))
}
