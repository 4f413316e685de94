use std::io::{self, prelude::*};
use std::sync::LazyLock;

use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::event::{
    moment_magnitude, Event, EventError, EvaluationStatus, FocalMechanism, InversionType,
    Magnitude, MomentTensor, NodalPlane, Origin, PrincipalAxis, Quantity, SourceTimeFunction,
    SourceTimeFunctionType, WaveUsage,
};
use crate::io::utils::{
    column, column_from, make_datetime, parse_field, split_seconds, Attribution, FieldError,
};

/// Conversion factor from dyne-centimeters to newton-meters
pub const DYNECM_TO_NEWTONMETERS: f64 = 1.0 / 1e7;

static CMT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CMT:\s*([0-5])").unwrap());

/// The line of the five-line NDK record the reader expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NdkParserState {
    Hypocenter,
    Identifier,
    Centroid,
    TensorComponents,
    PrincipalAxes,
    Done,
}

impl NdkParserState {
    fn next(self) -> Self {
        match self {
            Self::Hypocenter => Self::Identifier,
            Self::Identifier => Self::Centroid,
            Self::Centroid => Self::TensorComponents,
            Self::TensorComponents => Self::PrincipalAxes,
            Self::PrincipalAxes => Self::Hypocenter,
            Self::Done => Self::Done,
        }
    }
}

#[derive(Debug, Error)]
pub enum NdkError {
    #[error("Malformed {field} on line {line} ({reason}): {content:?}")]
    MalformedField {
        line: usize,
        content: String,
        field: &'static str,
        reason: String,
    },
    #[error("Record starting on line {line} ended after {lines_read} of 5 lines")]
    IncompleteRecord { line: usize, lines_read: usize },
    #[error("Record starting on line {line} is not a valid event: {source}")]
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

impl From<NdkError> for io::Error {
    fn from(value: NdkError) -> Self {
        match value {
            NdkError::IOError(e) => e,
            e => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}

/// The values collected from the lines of one record so far
#[derive(Debug, Default)]
struct NdkRecordBuilder {
    start_line: usize,
    lines_read: usize,
    error: Option<NdkError>,
    event_id: String,
    exponent: i32,
    hypocenter: Option<Origin>,
    centroid: Option<Origin>,
    focal_mechanism: FocalMechanism,
    moment_tensor: MomentTensor,
}

impl NdkRecordBuilder {
    fn scale(&self) -> f64 {
        10f64.powf(self.exponent as f64) * DYNECM_TO_NEWTONMETERS
    }

    fn build(self, attribution: &Attribution) -> Result<Event, NdkError> {
        let line = self.start_line;
        let scalar_moment = self.moment_tensor.scalar_moment;
        let magnitude_type = match &self.moment_tensor.method {
            Some(method) => method.clone(),
            None => {
                warn!(
                    "No moment tensor method for event {}, labeling magnitude as Mw",
                    self.event_id
                );
                "Mw".to_string()
            }
        };
        let magnitude = Magnitude::new(moment_magnitude(scalar_moment), magnitude_type, true)
            .with_author(&attribution.catalog);

        let origins: Vec<Origin> = self.hypocenter.into_iter().chain(self.centroid).collect();
        let mut focal_mechanism = self.focal_mechanism;
        focal_mechanism.evaluation_status = EvaluationStatus::Reviewed;

        Event::new(
            self.event_id,
            &attribution.catalog,
            &attribution.contributor,
            origins,
            vec![magnitude],
        )
        .map(|event| {
            event
                .with_focal_mechanism(focal_mechanism)
                .with_moment_tensor(self.moment_tensor)
        })
        .map_err(|source| NdkError::InvalidEvent { line, source })
    }
}

/**
A reader for the Global CMT project's NDK format, where each moment tensor solution
is written as a group of five fixed-width lines.

The reader is an [`Iterator`] over `Result<Event, NdkError>`. A record that fails to
parse produces an error and the reader carries on with the next record.
*/
pub struct NdkReader<R: io::Read> {
    handle: io::BufReader<R>,
    pub state: NdkParserState,
    pub line_number: usize,
    attribution: Attribution,
}

impl<R: io::Read> NdkReader<R> {
    pub fn new(file: R) -> NdkReader<R> {
        Self {
            handle: io::BufReader::new(file),
            state: NdkParserState::Hypocenter,
            line_number: 0,
            attribution: Attribution::default(),
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

    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }

    fn malformed(&self, line: &str, err: FieldError) -> NdkError {
        NdkError::MalformedField {
            line: self.line_number,
            content: line.to_string(),
            field: err.field,
            reason: err.reason,
        }
    }

    fn handle_hypocenter(&self, line: &str, builder: &mut NdkRecordBuilder) -> Result<(), FieldError> {
        let source = column(line, 0, 4).trim();
        let dstr = column(line, 5, 26);
        let year = parse_field(column(dstr, 0, 4), "year")?;
        let month = parse_field(column(dstr, 5, 7), "month")?;
        let day = parse_field(column(dstr, 8, 10), "day")?;
        let hour = parse_field(column(dstr, 11, 13), "hour")?;
        let minute = parse_field(column(dstr, 14, 16), "minute")?;
        let (second, micro) = split_seconds(parse_field(column_from(dstr, 17), "second")?);
        let time = make_datetime("hypocenter time", (year, month, day), (hour, minute, second, micro))?;

        let latitude: f64 = parse_field(column(line, 27, 33), "hypocenter latitude")?;
        let longitude: f64 = parse_field(column(line, 34, 41), "hypocenter longitude")?;
        let depth: f64 = parse_field(column(line, 42, 47), "hypocenter depth")?;

        let id = format!("{source}{}", time.format("%Y%m%d%H%M%S"));
        builder.hypocenter = Some(Origin::new(
            id,
            true,
            time.into(),
            latitude.into(),
            longitude.into(),
            (depth * 1000.0).into(),
        ));
        Ok(())
    }

    fn handle_identifier(&self, line: &str, builder: &mut NdkRecordBuilder) -> Result<(), FieldError> {
        builder.event_id = column(line, 0, 16).trim().to_string();

        let tensor = &mut builder.moment_tensor;
        tensor.body_waves = Some(WaveUsage::new(
            parse_field(column(line, 19, 22), "body wave stations")?,
            parse_field(column(line, 22, 27), "body wave channels")?,
        ));
        tensor.surface_waves = Some(WaveUsage::new(
            parse_field(column(line, 34, 37), "surface wave stations")?,
            parse_field(column(line, 37, 42), "surface wave channels")?,
        ));
        tensor.mantle_waves = Some(WaveUsage::new(
            parse_field(column(line, 49, 52), "mantle wave stations")?,
            parse_field(column(line, 52, 57), "mantle wave channels")?,
        ));

        let cmt = column(line, 62, 68).trim();
        let code = CMT_CODE
            .captures(cmt)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u8>().ok());
        match code {
            Some(code) => {
                let method = if code < 3 { "Mwc" } else { "Mww" };
                tensor.inversion_type = Some(match code % 3 {
                    0 => InversionType::General,
                    1 => InversionType::ZeroTrace,
                    _ => InversionType::DoubleCouple,
                });
                tensor.method = Some(method.to_string());
                builder.focal_mechanism.method = Some(method.to_string());
            }
            None => {
                warn!(
                    "Unrecognized inversion code {cmt:?} on line {}",
                    self.line_number
                );
            }
        }

        let function_type = match column(line, 69, 74) {
            "TRIHD" => SourceTimeFunctionType::Triangle,
            _ => SourceTimeFunctionType::BoxCar,
        };
        let duration = parse_field(column_from(line, 75), "half duration")?;
        tensor.source_time_function = Some(SourceTimeFunction::new(function_type, duration));
        Ok(())
    }

    fn handle_centroid(&self, line: &str, builder: &mut NdkRecordBuilder) -> Result<(), FieldError> {
        let hypocenter_time: NaiveDateTime = match &builder.hypocenter {
            Some(origin) => origin.time.get(),
            None => return Err(FieldError::new("centroid time", line, "no hypocenter")),
        };
        let offset: f64 = parse_field(column(line, 9, 18), "centroid time offset")?;
        let offset_error = parse_field(column(line, 18, 23), "centroid time error")?;
        let latitude = parse_field(column(line, 23, 30), "centroid latitude")?;
        let latitude_error = parse_field(column(line, 29, 34), "centroid latitude error")?;
        let longitude = parse_field(column(line, 34, 42), "centroid longitude")?;
        let longitude_error = parse_field(column(line, 42, 47), "centroid longitude error")?;
        let depth: f64 = parse_field(column(line, 47, 53), "centroid depth")?;
        let depth_error: f64 = parse_field(column(line, 53, 58), "centroid depth error")?;

        let delta = TimeDelta::microseconds((offset * 1e6).round() as i64);
        let time = hypocenter_time
            .checked_add_signed(delta)
            .ok_or_else(|| FieldError::new("centroid time offset", line, "time out of range"))?;

        let id = line.split_ascii_whitespace().last().unwrap_or_default();
        builder.centroid = Some(Origin::new(
            id,
            false,
            Quantity::uncertain(time, offset_error),
            Quantity::uncertain(latitude, latitude_error),
            Quantity::uncertain(longitude, longitude_error),
            Quantity::uncertain(depth, depth_error).scale(1000.0),
        ));
        Ok(())
    }

    fn handle_tensor_components(
        &self,
        line: &str,
        builder: &mut NdkRecordBuilder,
    ) -> Result<(), FieldError> {
        builder.exponent = parse_field(column(line, 0, 2), "exponent")?;
        let scale = builder.scale();
        let component = |start: usize,
                         mid: usize,
                         end: Option<usize>,
                         field: &'static str|
         -> Result<Quantity<f64>, FieldError> {
            let value: f64 = parse_field(column(line, start, mid), field)?;
            let error: f64 = match end {
                Some(end) => parse_field(column(line, mid, end), field)?,
                None => parse_field(column_from(line, mid), field)?,
            };
            Ok(Quantity::uncertain(value * scale, error * scale))
        };
        let tensor = &mut builder.moment_tensor;
        tensor.mrr = component(2, 9, Some(15), "Mrr")?;
        tensor.mtt = component(15, 22, Some(28), "Mtt")?;
        tensor.mpp = component(28, 35, Some(41), "Mpp")?;
        tensor.mrt = component(41, 48, Some(54), "Mrt")?;
        tensor.mrp = component(54, 61, Some(67), "Mrp")?;
        tensor.mtp = component(67, 74, None, "Mtp")?;
        Ok(())
    }

    fn handle_principal_axes(
        &self,
        line: &str,
        builder: &mut NdkRecordBuilder,
    ) -> Result<(), FieldError> {
        let scale = builder.scale();
        let axis = |start: usize, field: &'static str| -> Result<PrincipalAxis, FieldError> {
            Ok(PrincipalAxis::new(
                parse_field::<f64>(column(line, start, start + 8), field)? * scale,
                parse_field(column(line, start + 8, start + 11), field)?,
                parse_field(column(line, start + 11, start + 15), field)?,
            ))
        };
        let focal = &mut builder.focal_mechanism;
        focal.t_axis = axis(3, "T axis")?;
        focal.n_axis = axis(18, "N axis")?;
        focal.p_axis = axis(33, "P axis")?;

        let scalar_moment: f64 = parse_field(column(line, 49, 56), "scalar moment")?;
        builder.moment_tensor.scalar_moment = scalar_moment * scale;

        focal.nodal_plane_1 = NodalPlane::new(
            parse_field(column(line, 56, 60), "nodal plane 1 strike")?,
            parse_field(column(line, 60, 63), "nodal plane 1 dip")?,
            parse_field(column(line, 63, 68), "nodal plane 1 rake")?,
        );
        focal.nodal_plane_2 = NodalPlane::new(
            parse_field(column(line, 68, 72), "nodal plane 2 strike")?,
            parse_field(column(line, 72, 75), "nodal plane 2 dip")?,
            parse_field(column_from(line, 75), "nodal plane 2 rake")?,
        );
        Ok(())
    }

    fn handle_line(&self, state: NdkParserState, line: &str, builder: &mut NdkRecordBuilder) {
        let result = match state {
            NdkParserState::Hypocenter => self.handle_hypocenter(line, builder),
            NdkParserState::Identifier => self.handle_identifier(line, builder),
            NdkParserState::Centroid => self.handle_centroid(line, builder),
            NdkParserState::TensorComponents => self.handle_tensor_components(line, builder),
            NdkParserState::PrincipalAxes => self.handle_principal_axes(line, builder),
            NdkParserState::Done => Ok(()),
        };
        if let Err(err) = result {
            builder.error = Some(self.malformed(line, err));
        }
    }

    /// Read the next five-line record from the stream, if there is one.
    pub fn read_next(&mut self) -> Option<Result<Event, NdkError>> {
        if self.state == NdkParserState::Done {
            return None;
        }
        let mut builder = NdkRecordBuilder::default();
        let mut buffer = String::new();
        loop {
            buffer.clear();
            let b = match self.handle.read_line(&mut buffer) {
                Ok(b) => b,
                Err(err) => {
                    self.state = NdkParserState::Done;
                    return Some(Err(NdkError::IOError(err)));
                }
            };
            if b == 0 {
                self.state = NdkParserState::Done;
                if builder.lines_read == 0 {
                    return None;
                }
                if let Some(err) = builder.error.take() {
                    return Some(Err(err));
                }
                warn!(
                    "Input ended after {} lines of the record starting on line {}",
                    builder.lines_read, builder.start_line
                );
                return Some(Err(NdkError::IncompleteRecord {
                    line: builder.start_line,
                    lines_read: builder.lines_read,
                }));
            }
            self.line_number += 1;

            let line = buffer.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            if builder.lines_read == 0 {
                builder.start_line = self.line_number;
            }
            builder.lines_read += 1;

            let state = self.state;
            // Once a line of the record fails, the rest of it is consumed but not decoded
            if builder.error.is_none() {
                self.handle_line(state, line, &mut builder);
            }
            self.state = state.next();

            if state == NdkParserState::PrincipalAxes {
                if let Some(err) = builder.error.take() {
                    warn!("Skipping record starting on line {}: {err}", builder.start_line);
                    return Some(Err(err));
                }
                let result = builder.build(&self.attribution);
                if let Ok(event) = &result {
                    debug!("Parsed NDK event {}", event.id);
                }
                return Some(result);
            }
        }
    }
}

impl<R: io::Read> Iterator for NdkReader<R> {
    type Item = Result<Event, NdkError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

/// Check whether a block of text looks like the start of an NDK file
pub fn is_ndk(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    match (lines.next(), lines.next()) {
        (Some(first), Some(second)) => {
            let date = column(first, 5, 15);
            date.len() == 10
                && date.as_bytes()[4] == b'/'
                && date.as_bytes()[7] == b'/'
                && CMT_CODE.is_match(second)
        }
        _ => false,
    }
}
