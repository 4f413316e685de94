use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

/// The default network code used for both the catalog and the contributor
pub const DEFAULT_NETWORK: &str = "us";

/// The catalog and contributor network codes stamped onto every event a reader produces
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribution {
    pub catalog: String,
    pub contributor: String,
}

impl Attribution {
    pub fn new<S: ToString, T: ToString>(catalog: S, contributor: T) -> Self {
        Self {
            catalog: catalog.to_string(),
            contributor: contributor.to_string(),
        }
    }
}

impl Default for Attribution {
    fn default() -> Self {
        Self::new(DEFAULT_NETWORK, DEFAULT_NETWORK)
    }
}

/// A single value that could not be decoded from a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl FieldError {
    pub fn new<S: ToString>(field: &'static str, value: &str, reason: S) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not parse {} from {:?}: {}",
            self.field, self.value, self.reason
        )
    }
}

impl std::error::Error for FieldError {}

/// Slice the columns `start..end` out of a fixed-width line, clipping to the end of the
/// line. A range that does not fall on character boundaries yields an empty string.
pub(crate) fn column(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or_default()
}

/// Slice everything from column `start` to the end of a fixed-width line
pub(crate) fn column_from(line: &str, start: usize) -> &str {
    column(line, start, line.len())
}

/// Parse a whitespace-trimmed token into `T`, reporting failures against `field`
pub(crate) fn parse_field<T>(token: &str, field: &'static str) -> Result<T, FieldError>
where
    T: FromStr,
    T::Err: Display,
{
    let token = token.trim();
    if token.is_empty() {
        return Err(FieldError::new(field, token, "empty field"));
    }
    token
        .parse::<T>()
        .map_err(|e| FieldError::new(field, token, e))
}

/// Parse a possibly blank token, treating an empty field as absent
pub(crate) fn parse_optional<T>(token: &str, field: &'static str) -> Result<Option<T>, FieldError>
where
    T: FromStr,
    T::Err: Display,
{
    if token.trim().is_empty() {
        Ok(None)
    } else {
        parse_field(token, field).map(Some)
    }
}

/// Split fractional seconds into whole seconds and truncated microseconds, clamping
/// both to their valid ranges
pub(crate) fn split_seconds(seconds: f64) -> (u32, u32) {
    let whole = seconds.trunc().clamp(0.0, 59.0);
    let micros = ((seconds - whole) * 1e6).trunc().clamp(0.0, 999_999.0) as u32;
    (whole as u32, micros)
}

/// Build a timestamp from calendar fields, reporting impossible dates against `field`
pub(crate) fn make_datetime(
    field: &'static str,
    (year, month, day): (i32, u32, u32),
    (hour, minute, second, micro): (u32, u32, u32, u32),
) -> Result<NaiveDateTime, FieldError> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_micro_opt(hour, minute, second, micro))
        .ok_or_else(|| {
            FieldError::new(
                field,
                &format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micro:06}"),
                "not a valid date and time",
            )
        })
}
