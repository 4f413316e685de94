use std::collections::HashMap;
use std::io::{self, prelude::*};

use chrono::NaiveDateTime;
use log::{debug, warn};
use thiserror::Error;

use crate::event::{ErrorEllipse, Event, EventError, Magnitude, Origin, Phase, Quantity};
use crate::io::utils::{make_datetime, parse_field, Attribution, FieldError};
use crate::lookup::{station_key, CatalogLookup, NullLookup, StationLookup};

/// Only events whose first magnitude exceeds this are checked against the external catalog
pub const MIN_LOOKUP_MAGNITUDE: f64 = 4.0;
/// The search radius around an epicenter when looking for a matching catalog event
pub const LOOKUP_RADIUS_KM: f64 = 10.0;
/// The search window around an origin time when looking for a matching catalog event
pub const LOOKUP_WINDOW_SECONDS: f64 = 3.0;
/// The search radius in degrees when resolving a station by its coordinates
pub const STATION_SEARCH_RADIUS: f64 = 0.2;

/// Map a phase usage code to the arrival time weight
pub fn usage_weight(code: &str) -> Option<u8> {
    match code {
        "+" => Some(1),
        "x" | "-" => Some(0),
        _ => None,
    }
}

#[derive(Debug, Error)]
pub enum MlocError {
    #[error("Malformed line {line} ({reason}): {content:?}")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("Block starting on line {line} was not terminated by STOP")]
    IncompleteRecord { line: usize },
    #[error("Block starting on line {line} is not a valid event: {source}")]
    InvalidEvent {
        line: usize,
        #[source]
        source: EventError,
    },
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

impl From<MlocError> for io::Error {
    fn from(value: MlocError) -> Self {
        match value {
            MlocError::IOError(e) => e,
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

/// A layer of the 1-D velocity model used for the relocation. Depth in km, velocities in km/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityLayer {
    pub depth: f64,
    pub vp: f64,
    pub vs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StationCoordinates {
    latitude: f64,
    longitude: f64,
}

/// The contents of one `STOP`-terminated block read so far
#[derive(Debug, Default)]
struct MlocBlockBuilder {
    start_line: usize,
    started: bool,
    error: Option<MlocError>,
    layers: Vec<VelocityLayer>,
    stations: HashMap<String, StationCoordinates>,
    comments: Vec<String>,
    origins: Vec<Origin>,
    magnitudes: Vec<Magnitude>,
}

impl MlocBlockBuilder {
    fn comment(&self) -> Option<String> {
        if self.comments.is_empty() {
            None
        } else {
            Some(self.comments.join(" "))
        }
    }
}

fn tokens(line: &str) -> Vec<&str> {
    line.get(1..).unwrap_or_default().split_ascii_whitespace().collect()
}

fn require(parts: &[&str], count: usize, record: &'static str) -> Result<(), FieldError> {
    if parts.len() < count {
        Err(FieldError::new(
            record,
            &parts.join(" "),
            format!("expected at least {count} fields, found {}", parts.len()),
        ))
    } else {
        Ok(())
    }
}

/// Decode six date and time tokens whose seconds run from 1 to 60. The seconds are
/// shifted back by one, never below zero, keeping the truncated fractional part.
fn parse_shifted_time(parts: &[&str], field: &'static str) -> Result<NaiveDateTime, FieldError> {
    let year = parse_field(parts[0], field)?;
    let month = parse_field(parts[1], field)?;
    let day = parse_field(parts[2], field)?;
    let hour = parse_field(parts[3], field)?;
    let minute = parse_field(parts[4], field)?;
    let seconds: f64 = parse_field(parts[5], field)?;
    if seconds < 0.0 {
        return Err(FieldError::new(field, parts[5], "negative seconds"));
    }
    let micro = ((seconds - seconds.trunc()) * 1e6).trunc() as u32;
    let second = (seconds.trunc() as u32).saturating_sub(1);
    make_datetime(field, (year, month, day), (hour, minute, second, micro))
}

/**
A reader for MLOC multiple-event relocation files, where each event is a block of
tagged lines terminated by `STOP`.

Phase station mnemonics are translated into `NET.STA.CHA.LOC` codes with a
[`StationLookup`], and larger events are matched against an external catalog with a
[`CatalogLookup`] to pick their preferred magnitude. Both default to [`NullLookup`].
*/
pub struct MlocReader<R: io::Read> {
    handle: io::BufReader<R>,
    pub line_number: usize,
    attribution: Attribution,
    station_lookup: Box<dyn StationLookup>,
    catalog_lookup: Box<dyn CatalogLookup>,
    station_cache: HashMap<String, String>,
    block_counter: usize,
    done: bool,
}

impl<R: io::Read> MlocReader<R> {
    pub fn new(file: R) -> MlocReader<R> {
        Self {
            handle: io::BufReader::new(file),
            line_number: 0,
            attribution: Attribution::default(),
            station_lookup: Box::new(NullLookup),
            catalog_lookup: Box::new(NullLookup),
            station_cache: HashMap::new(),
            block_counter: 0,
            done: false,
        }
    }

    pub fn with_catalog<S: ToString>(mut self, catalog: S) -> Self {
        self.attribution.catalog = catalog.to_string();
        self
    }

    pub fn with_contributor<S: ToString>(mut self, contributor: S) -> Self {
        self.attribution.contributor = contributor.to_string();
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn with_station_lookup<L: StationLookup + 'static>(mut self, lookup: L) -> Self {
        self.station_lookup = Box::new(lookup);
        self
    }

    pub fn with_catalog_lookup<L: CatalogLookup + 'static>(mut self, lookup: L) -> Self {
        self.catalog_lookup = Box::new(lookup);
        self
    }

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    /// The station codes resolved so far, keyed by `MNEMONIC-<phase initial>`
    pub fn station_cache(&self) -> &HashMap<String, String> {
        &self.station_cache
    }

    fn handle_layer(&self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        let parts = tokens(line);
        require(&parts, 3, "velocity layer")?;
        builder.layers.push(VelocityLayer {
            depth: parse_field(parts[0], "layer depth")?,
            vp: parse_field(parts[1], "layer P velocity")?,
            vs: parse_field(parts[2], "layer S velocity")?,
        });
        Ok(())
    }

    fn handle_station(&self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        let parts = tokens(line);
        require(&parts, 4, "station")?;
        let coordinates = StationCoordinates {
            latitude: parse_field(parts[1], "station latitude")?,
            longitude: parse_field(parts[2], "station longitude")?,
        };
        let _elevation: f64 = parse_field(parts[3], "station elevation")?;
        builder.stations.insert(parts[0].to_string(), coordinates);
        Ok(())
    }

    fn handle_hypocenter(&self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        let parts = tokens(line);
        require(&parts, 19, "hypocenter")?;
        let time = parse_shifted_time(&parts[0..6], "origin time")?;
        let time_error: f64 = parse_field(parts[6], "origin time uncertainty")?;
        let latitude: f64 = parse_field(parts[7], "latitude")?;
        let mut longitude: f64 = parse_field(parts[8], "longitude")?;
        if longitude > 180.0 {
            longitude -= 360.0;
        }
        let ellipse = ErrorEllipse {
            azimuth: parse_field(parts[9], "ellipse azimuth")?,
            minor: parse_field(parts[10], "ellipse minor axis")?,
            major: parse_field(parts[11], "ellipse major axis")?,
        };
        let depth: f64 = parse_field(parts[12], "depth")?;
        let depth_lower: f64 = parse_field(parts[14], "depth lower uncertainty")?;
        let depth_upper: f64 = parse_field(parts[15], "depth upper uncertainty")?;

        let preferred = builder.origins.is_empty();
        let origin = Origin::new(
            parts[18],
            preferred,
            Quantity::uncertain(time, time_error),
            latitude.into(),
            longitude.into(),
            Quantity::bounded(depth, depth_lower, depth_upper).scale(1000.0),
        )
        .with_ellipse(ellipse);
        builder.origins.push(origin);
        Ok(())
    }

    fn handle_magnitude(&self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        let parts = tokens(line);
        require(&parts, 2, "magnitude")?;
        let value = parse_field(parts[0], "magnitude")?;
        let magnitude_type = match parts[1] {
            "UNK" => "ML",
            t => t,
        };
        let mut magnitude = Magnitude::new(value, magnitude_type, builder.magnitudes.is_empty());
        if parts.len() > 2 {
            magnitude = magnitude.with_author(parts[2..].join(" "));
        }
        builder.magnitudes.push(magnitude);
        Ok(())
    }

    fn cached_station_by_name(
        &mut self,
        mnemonic: &str,
        phase_type: &str,
        arrival: NaiveDateTime,
    ) -> String {
        let key = station_key(mnemonic, phase_type);
        if let Some(code) = self.station_cache.get(&key) {
            debug!("Using cached station {code} for {key}");
            return code.clone();
        }
        match self
            .station_lookup
            .resolve_by_name_and_time(mnemonic, phase_type, arrival)
        {
            Ok(code) => {
                self.station_cache.insert(key, code.clone());
                code
            }
            Err(e) => {
                warn!("Failed to resolve station {key}, keeping the mnemonic: {e}");
                mnemonic.to_string()
            }
        }
    }

    fn resolve_station(
        &mut self,
        stations: &HashMap<String, StationCoordinates>,
        mnemonic: &str,
        phase_type: &str,
        arrival: NaiveDateTime,
    ) -> String {
        if let Some(coords) = stations.get(mnemonic) {
            match self.station_lookup.resolve_by_location(
                mnemonic,
                coords.latitude,
                coords.longitude,
                STATION_SEARCH_RADIUS,
            ) {
                Ok(code) if code != mnemonic => return code,
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to resolve station {mnemonic} by location: {e}");
                }
            }
        }
        self.cached_station_by_name(mnemonic, phase_type, arrival)
    }

    fn handle_phase(&mut self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        let parts = tokens(line);
        require(&parts, 13, "phase")?;
        let weight = usage_weight(parts[0])
            .ok_or_else(|| FieldError::new("usage code", parts[0], "expected one of '+', 'x' or '-'"))?;
        let mnemonic = parts[1];
        let distance = parse_field(parts[2], "phase distance")?;
        let azimuth = parse_field(parts[3], "phase azimuth")?;
        let name = parts[4];
        let time = parse_shifted_time(&parts[5..11], "arrival time")?;
        let _precision: i32 = parse_field(parts[11], "arrival precision")?;
        let residual = parse_field(parts[12], "phase residual")?;

        if builder.origins.is_empty() {
            return Err(FieldError::new("phase", line, "phase found before any hypocenter"));
        }

        let station = self.resolve_station(&builder.stations, mnemonic, name, time);
        let phase = Phase {
            id: format!("{}_{name}_{station}", time.format("%Y%m%d%H%M%S")),
            name: name.to_string(),
            distance,
            azimuth,
            time,
            station,
            residual,
            weight,
        };
        if let Some(origin) = builder.origins.first_mut() {
            origin.add_or_replace_phase(phase);
        }
        Ok(())
    }

    /// Ask the external catalog for a better magnitude if the event is large enough
    fn update_preferred_magnitude(&mut self, builder: &mut MlocBlockBuilder) {
        let first = match builder.magnitudes.first() {
            Some(m) if m.value > MIN_LOOKUP_MAGNITUDE => m.value,
            _ => return,
        };
        let origin = match builder.origins.iter().find(|o| o.preferred) {
            Some(origin) => origin,
            None => return,
        };
        let result = self.catalog_lookup.find_preferred_magnitude(
            origin.latitude.get(),
            origin.longitude.get(),
            origin.time.get(),
            LOOKUP_RADIUS_KM,
            LOOKUP_WINDOW_SECONDS,
        );
        match result {
            Ok(Some(found)) => {
                debug!(
                    "Replacing preferred magnitude {first} with {} {} from {}",
                    found.value, found.magnitude_type, found.source
                );
                builder
                    .magnitudes
                    .iter_mut()
                    .for_each(|m| m.preferred = false);
                builder.magnitudes.push(
                    Magnitude::new(found.value, found.magnitude_type, true)
                        .with_author(found.source),
                );
            }
            Ok(None) => {
                debug!("No catalog event matches the origin {}", origin.id);
            }
            Err(e) => {
                warn!("Catalog lookup failed for origin {}: {e}", origin.id);
            }
        }
    }

    fn finish_block(&mut self, mut builder: MlocBlockBuilder) -> Result<Event, MlocError> {
        let line = builder.start_line;
        if !builder.layers.is_empty() {
            debug!(
                "Block starting on line {line} uses a {}-layer velocity model",
                builder.layers.len()
            );
        }
        self.update_preferred_magnitude(&mut builder);
        let comment = builder.comment();
        let event = Event::new(
            format!("{:08}", self.block_counter),
            &self.attribution.catalog,
            &self.attribution.contributor,
            builder.origins,
            builder.magnitudes,
        )
        .map_err(|source| MlocError::InvalidEvent { line, source })?;
        debug!("Parsed MLOC event {}", event.id);
        Ok(match comment {
            Some(comment) => event.with_comment(comment),
            None => event,
        })
    }

    fn handle_line(&mut self, line: &str, builder: &mut MlocBlockBuilder) -> Result<(), FieldError> {
        match line.as_bytes().first() {
            Some(b'L') => self.handle_layer(line, builder),
            Some(b'C') => self.handle_station(line, builder),
            Some(b'#') => {
                builder.comments.push(line[1..].trim().to_string());
                Ok(())
            }
            Some(b'E') => Ok(()),
            Some(b'H') => self.handle_hypocenter(line, builder),
            Some(b'M') => self.handle_magnitude(line, builder),
            Some(b'P') => self.handle_phase(line, builder),
            _ => Ok(()),
        }
    }

    /// Read the next `STOP`-terminated block from the stream, if there is one.
    pub fn read_next(&mut self) -> Option<Result<Event, MlocError>> {
        if self.done {
            return None;
        }
        let mut builder = MlocBlockBuilder::default();
        let mut buffer = String::new();
        loop {
            buffer.clear();
            let b = match self.handle.read_line(&mut buffer) {
                Ok(b) => b,
                Err(err) => {
                    self.done = true;
                    return Some(Err(MlocError::IOError(err)));
                }
            };
            if b == 0 {
                self.done = true;
                if let Some(err) = builder.error.take() {
                    return Some(Err(err));
                }
                if builder.started {
                    warn!(
                        "Input ended inside the block starting on line {}",
                        builder.start_line
                    );
                    return Some(Err(MlocError::IncompleteRecord {
                        line: builder.start_line,
                    }));
                }
                return None;
            }
            self.line_number += 1;
            let line = buffer.trim_end_matches(['\r', '\n']);

            if line.trim_end() == "STOP" {
                self.block_counter += 1;
                if let Some(err) = builder.error.take() {
                    warn!("Skipping block ending on line {}: {err}", self.line_number);
                    return Some(Err(err));
                }
                return Some(self.finish_block(builder));
            }

            if matches!(line.as_bytes().first(), Some(b'L' | b'C' | b'E' | b'H' | b'M' | b'P'))
                && !builder.started
            {
                builder.started = true;
                builder.start_line = self.line_number;
            }

            // After a bad line the rest of the block is skipped up to its STOP
            if builder.error.is_some() {
                continue;
            }
            if let Err(err) = self.handle_line(line, &mut builder) {
                builder.error = Some(MlocError::MalformedLine {
                    line: self.line_number,
                    content: line.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

impl<R: io::Read> Iterator for MlocReader<R> {
    type Item = Result<Event, MlocError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

/// Check whether a block of text looks like MLOC output
pub fn is_mloc(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    text.lines().any(|line| {
        line.trim_end() == "STOP"
            || (line.starts_with('H') && tokens(line).len() >= 19)
    })
}
