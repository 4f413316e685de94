//! Read the [ISC-GEM](http://www.isc.ac.uk/iscgem/) Global Instrumental Earthquake
//! Catalogue, distributed as comma-separated text.
//!
//! **Requires the `iscgem` feature, enabled by default**
#![cfg(feature = "iscgem")]
use std::io;

use chrono::NaiveDateTime;
use log::debug;
use thiserror::Error;

use crate::event::{
    ErrorEllipse, EvaluationMode, EvaluationStatus, Event, EventError, Magnitude, Origin,
    Quantity,
};
use crate::io::utils::{parse_field, parse_optional, FieldError, DEFAULT_NETWORK};

/// The catalog code every ISC-GEM event is published under
pub const ISCGEM_CATALOG: &str = "iscgem";

/// The column layout of the catalogue file, which carries no header row
pub const ISCGEM_COLUMNS: [&str; 24] = [
    "date",
    "lat",
    "lon",
    "smajax",
    "sminax",
    "strike",
    "epicenter_quality",
    "depth",
    "depth_uncertainty",
    "depth_quality",
    "mw",
    "mw_unc",
    "mw_quality",
    "mw_source",
    "moment",
    "factor",
    "moment_author",
    "mpp",
    "mpr",
    "mrr",
    "mrt",
    "mtp",
    "mtt",
    "eventid",
];

const DATE: usize = 0;
const LAT: usize = 1;
const LON: usize = 2;
const SMAJAX: usize = 3;
const SMINAX: usize = 4;
const DEPTH: usize = 7;
const DEPTH_UNCERTAINTY: usize = 8;
const MW: usize = 10;
const MOMENT_AUTHOR: usize = 16;
const EVENTID: usize = 23;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum IscGemError {
    #[error("Malformed {field} in row on line {line} ({reason})")]
    MalformedField {
        line: u64,
        field: &'static str,
        reason: String,
    },
    #[error("Row on line {line} is not a valid event: {source}")]
    InvalidEvent {
        line: u64,
        #[source]
        source: EventError,
    },
    #[error("Failed to read CSV record: {0}")]
    CSVError(
        #[from]
        #[source]
        csv::Error,
    ),
}

impl From<IscGemError> for io::Error {
    fn from(value: IscGemError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}

/**
A reader for the ISC-GEM catalogue. Each row becomes one [`Event`] with a single
reviewed origin and a single preferred `Mw` magnitude.

Rows that fail to parse produce an error without stopping the iteration.
*/
pub struct IscGemReader<R: io::Read> {
    handle: csv::Reader<R>,
    record: csv::StringRecord,
    contributor: String,
    done: bool,
}

impl<R: io::Read> IscGemReader<R> {
    pub fn new(file: R) -> IscGemReader<R> {
        let handle = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);
        Self {
            handle,
            record: csv::StringRecord::new(),
            contributor: DEFAULT_NETWORK.to_string(),
            done: false,
        }
    }

    pub fn with_contributor<S: ToString>(mut self, contributor: S) -> Self {
        self.contributor = contributor.to_string();
        self
    }

    pub fn contributor(&self) -> &str {
        &self.contributor
    }

    fn field(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or_default()
    }

    /// Decode the current record into the event id and its single origin and magnitude
    fn parse_row(&self) -> Result<(String, Origin, Magnitude), FieldError> {
        let date = self.field(DATE);
        let time = NaiveDateTime::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| FieldError::new("date", date, e))?;
        let latitude: f64 = parse_field(self.field(LAT), "lat")?;
        let longitude: f64 = parse_field(self.field(LON), "lon")?;
        let major: Option<f64> = parse_optional(self.field(SMAJAX), "smajax")?;
        let minor: Option<f64> = parse_optional(self.field(SMINAX), "sminax")?;
        let depth: f64 = parse_field(self.field(DEPTH), "depth")?;
        let depth_uncertainty: Option<f64> =
            parse_optional(self.field(DEPTH_UNCERTAINTY), "depth_uncertainty")?;
        let mw: f64 = parse_field(self.field(MW), "mw")?;
        let eventid = self.field(EVENTID);
        if eventid.is_empty() {
            return Err(FieldError::new("eventid", eventid, "empty field"));
        }

        let depth = match depth_uncertainty {
            Some(uncertainty) => Quantity::uncertain(depth, uncertainty),
            None => Quantity::Value(depth),
        };
        let mut origin = Origin::new(
            format!("{ISCGEM_CATALOG}{eventid}"),
            true,
            time.into(),
            latitude.into(),
            longitude.into(),
            depth.scale(1000.0),
        )
        .with_evaluation(EvaluationMode::Manual, EvaluationStatus::Reviewed);
        if let (Some(major), Some(minor)) = (major, minor) {
            origin = origin.with_ellipse(ErrorEllipse::new(major, minor, 0.0));
        }

        let mut magnitude = Magnitude::new(mw, "Mw", true);
        let author = self.field(MOMENT_AUTHOR);
        if !author.is_empty() {
            magnitude = magnitude.with_author(author);
        }
        Ok((eventid.to_string(), origin, magnitude))
    }

    /// Read the next row of the catalogue, if there is one.
    pub fn read_next(&mut self) -> Option<Result<Event, IscGemError>> {
        if self.done {
            return None;
        }
        match self.handle.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                if e.is_io_error() {
                    self.done = true;
                }
                return Some(Err(e.into()));
            }
        }
        let line = self.record.position().map(|p| p.line()).unwrap_or_default();
        let (eventid, origin, magnitude) = match self.parse_row() {
            Ok(parts) => parts,
            Err(e) => {
                return Some(Err(IscGemError::MalformedField {
                    line,
                    field: e.field,
                    reason: e.reason,
                }))
            }
        };
        let result = Event::new(
            eventid,
            ISCGEM_CATALOG,
            &self.contributor,
            vec![origin],
            vec![magnitude],
        )
        .map_err(|source| IscGemError::InvalidEvent { line, source });
        if let Ok(event) = &result {
            debug!("Parsed ISC-GEM event {}", event.id);
        }
        Some(result)
    }
}

impl<R: io::Read> Iterator for IscGemReader<R> {
    type Item = Result<Event, IscGemError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

/// Check whether a block of text looks like ISC-GEM catalogue rows
pub fn is_iscgem(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    text.lines()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            fields.len() >= ISCGEM_COLUMNS.len()
                && NaiveDateTime::parse_from_str(fields[0].trim(), DATE_FORMAT).is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn row(depth_uncertainty: &str, author: &str, smajax: &str) -> String {
        format!(
            "1994-01-17 12:30:56.24, 34.164, -118.550, {smajax}, 3.4, 49.8,A, 15.0, {depth_uncertainty},A, 6.65,0.20,A,1, 1.180, 19, {author},-0.120, 0.440, 1.110,-0.310,-0.160,-0.990, 189275\n"
        )
    }

    #[test_log::test]
    fn test_reader() {
        let file = fs::File::open("./test/data/isc-gem-cat.csv").expect("Test file doesn't exist");
        let events: Vec<_> = IscGemReader::new(file)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(events.len(), 2);

        let loma = &events[0];
        assert_eq!(loma.id, "389808");
        assert_eq!(loma.catalog, "iscgem");
        assert_eq!(loma.contributor, "us");
        let origin = &loma.origins[0];
        assert_eq!(origin.id, "iscgem389808");
        assert!(origin.preferred);
        assert_eq!(origin.evaluation_mode, Some(EvaluationMode::Manual));
        assert_eq!(origin.evaluation_status, Some(EvaluationStatus::Reviewed));
        let time = NaiveDate::from_ymd_opt(1989, 10, 18)
            .unwrap()
            .and_hms_milli_opt(0, 4, 17, 440)
            .unwrap();
        assert_eq!(origin.time.get(), time);
        assert_eq!(origin.latitude.get(), 37.074);
        assert_eq!(origin.longitude.get(), -121.806);
        assert_eq!(origin.depth.get(), 12_000.0);
        assert!((origin.depth.uncertainty().unwrap() - 3_300.0).abs() < 1e-6);
        assert_eq!(origin.ellipse, Some(ErrorEllipse::new(4.4, 3.3, 0.0)));
        assert_eq!(loma.magnitudes.len(), 1);
        let magnitude = &loma.magnitudes[0];
        assert!(magnitude.preferred);
        assert_eq!(magnitude.magnitude_type, "Mw");
        assert_eq!(magnitude.value, 6.89);
        assert_eq!(magnitude.author.as_deref(), Some("gcmt"));

        let northridge = &events[1];
        assert_eq!(northridge.id, "189275");
        assert_eq!(northridge.origins[0].latitude.get(), 34.164);
        assert_eq!(northridge.magnitudes[0].value, 6.65);
        assert_eq!(
            northridge.origins[0].ellipse,
            Some(ErrorEllipse::new(4.0, 3.4, 0.0))
        );
    }

    #[test]
    fn test_optional_fields() {
        let text = row("", "", "");
        let mut reader = IscGemReader::new(text.as_bytes()).with_contributor("at");
        let event = reader.next().unwrap().unwrap();
        assert_eq!(event.contributor, "at");
        let origin = &event.origins[0];
        assert_eq!(origin.depth, Quantity::Value(15_000.0));
        assert!(origin.ellipse.is_none());
        assert!(event.magnitudes[0].author.is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_whole_second_dates() {
        let text = row("3.4", "gcmt", "4.0").replace("12:30:56.24", "12:30:56");
        let event = IscGemReader::new(text.as_bytes()).next().unwrap().unwrap();
        let time = NaiveDate::from_ymd_opt(1994, 1, 17)
            .unwrap()
            .and_hms_opt(12, 30, 56)
            .unwrap();
        assert_eq!(event.origins[0].time.get(), time);
    }

    #[test_log::test]
    fn test_malformed_row_is_isolated() {
        let bad = row("3.4", "gcmt", "4.0").replace("34.164", "north");
        let text = format!("# comment\n{bad}{}", row("3.4", "gcmt", "4.0"));
        let mut reader = IscGemReader::new(text.as_bytes());
        match reader.next() {
            Some(Err(IscGemError::MalformedField { field, .. })) => {
                assert_eq!(field, "lat");
            }
            other => panic!("Expected a malformed field, got {other:?}"),
        }
        assert_eq!(reader.next().unwrap().unwrap().id, "189275");
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_missing_eventid() {
        let text = row("3.4", "gcmt", "4.0").replace(" 189275", "");
        let result = IscGemReader::new(text.as_bytes()).next().unwrap();
        assert!(matches!(
            result,
            Err(IscGemError::MalformedField {
                field: "eventid",
                ..
            })
        ));
    }

    #[test]
    fn test_is_iscgem() {
        let text = fs::read_to_string("./test/data/isc-gem-cat.csv").unwrap();
        assert!(is_iscgem(text.as_bytes()));
        assert!(!is_iscgem(b"PDE  2005/01/01 01:20:05.4  13.78  -88.78"));
    }
}
