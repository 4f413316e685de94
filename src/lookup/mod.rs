//! Resolve station codes and preferred magnitudes against external services.
//!
//! The readers only depend on the [`StationLookup`] and [`CatalogLookup`] traits. Every
//! failure is treated as "no information": callers fall back to the data they already
//! have and never abort a record because a lookup failed.
use std::io;
use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;

mod dictionary;
#[cfg(feature = "serde")]
pub mod comcat;

pub use dictionary::StationDictionary;

/// The recommended upper bound on how long a single lookup may block
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Lookup service unavailable: {0}")]
    Unavailable(String),
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("Failed to decode lookup response: {0}")]
    Decode(String),
}

/// The magnitude an external catalog prefers for an event
#[derive(Debug, Clone, PartialEq)]
pub struct PreferredMagnitude {
    pub value: f64,
    pub magnitude_type: String,
    /// The network code of the agency that contributed the magnitude
    pub source: String,
}

impl PreferredMagnitude {
    pub fn new<S: ToString, T: ToString>(value: f64, magnitude_type: S, source: T) -> Self {
        Self {
            value,
            magnitude_type: magnitude_type.to_string(),
            source: source.to_string(),
        }
    }
}

/// The cache key for a station mnemonic paired with the first letter of a phase name,
/// e.g. `URVA-P`
pub fn station_key(mnemonic: &str, phase_type: &str) -> String {
    let initial: String = phase_type.chars().take(1).collect();
    format!("{mnemonic}-{initial}")
}

/// Translate bare station mnemonics into `NET.STA.CHA.LOC` codes
pub trait StationLookup {
    /// Find the station closest to the given coordinates whose name matches `mnemonic`.
    /// Returns `mnemonic` unchanged when nothing better is known.
    fn resolve_by_location(
        &mut self,
        mnemonic: &str,
        latitude: f64,
        longitude: f64,
        radius: f64,
    ) -> Result<String, LookupError>;

    /// Find the channel best suited to `phase_type` for the station epoch active at `arrival`
    fn resolve_by_name_and_time(
        &mut self,
        mnemonic: &str,
        phase_type: &str,
        arrival: NaiveDateTime,
    ) -> Result<String, LookupError>;
}

/// Query an external earthquake catalog for its view of an event
pub trait CatalogLookup {
    fn find_preferred_magnitude(
        &mut self,
        latitude: f64,
        longitude: f64,
        time: NaiveDateTime,
        radius_km: f64,
        window_seconds: f64,
    ) -> Result<Option<PreferredMagnitude>, LookupError>;
}

/// A lookup that knows nothing and leaves every value as it was
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NullLookup;

impl StationLookup for NullLookup {
    fn resolve_by_location(
        &mut self,
        mnemonic: &str,
        _latitude: f64,
        _longitude: f64,
        _radius: f64,
    ) -> Result<String, LookupError> {
        Ok(mnemonic.to_string())
    }

    fn resolve_by_name_and_time(
        &mut self,
        mnemonic: &str,
        _phase_type: &str,
        _arrival: NaiveDateTime,
    ) -> Result<String, LookupError> {
        Ok(mnemonic.to_string())
    }
}

impl CatalogLookup for NullLookup {
    fn find_preferred_magnitude(
        &mut self,
        _latitude: f64,
        _longitude: f64,
        _time: NaiveDateTime,
        _radius_km: f64,
        _window_seconds: f64,
    ) -> Result<Option<PreferredMagnitude>, LookupError> {
        Ok(None)
    }
}
