use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;

use super::quantity::Quantity;

/// Whether a solution was produced by a human analyst or an automatic system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvaluationMode {
    Manual,
    Automatic,
}

impl EvaluationMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            _ => Err(format!("Unknown evaluation mode {s}")),
        }
    }
}

/// The review state of a solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvaluationStatus {
    Preliminary,
    Confirmed,
    #[default]
    Reviewed,
    Final,
    Rejected,
}

impl EvaluationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preliminary => "preliminary",
            Self::Confirmed => "confirmed",
            Self::Reviewed => "reviewed",
            Self::Final => "final",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for EvaluationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preliminary" => Ok(Self::Preliminary),
            "confirmed" => Ok(Self::Confirmed),
            "reviewed" => Ok(Self::Reviewed),
            "final" => Ok(Self::Final),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown evaluation status {s}")),
        }
    }
}

/// Horizontal location uncertainty. Axes are in kilometers, the azimuth in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorEllipse {
    pub major: f64,
    pub minor: f64,
    pub azimuth: f64,
}

impl ErrorEllipse {
    pub fn new(major: f64, minor: f64, azimuth: f64) -> Self {
        Self {
            major,
            minor,
            azimuth,
        }
    }
}

/// Summary statistics describing how well constrained an origin is
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OriginQuality {
    pub station_count: u32,
    pub phase_count: u32,
    pub standard_error: f64,
    pub azimuthal_gap: f64,
    pub minimum_distance: f64,
}

/**
A single seismic phase observation at a station, associated with an origin.

The `station` is a resolved `NET.STA.CHA.LOC` code when station resolution
succeeded, otherwise the raw station mnemonic from the source file.
*/
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Phase {
    pub id: String,
    pub name: String,
    /// Epicentral distance in degrees
    pub distance: f64,
    /// Station azimuth in degrees
    pub azimuth: f64,
    pub time: NaiveDateTime,
    pub station: String,
    /// Travel time residual in seconds
    pub residual: f64,
    /// 1 if the phase was used to compute the location, 0 otherwise
    pub weight: u8,
}

impl Phase {
    /// Whether this phase was used in the location solution
    pub fn is_used(&self) -> bool {
        self.weight > 0
    }

    /// The key used to detect repeated observations of the same phase at the same station
    pub fn observation_key(&self) -> (&str, &str) {
        (&self.station, &self.name)
    }
}

/// A hypocenter solution. Depths are in meters, coordinates in degrees.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Origin {
    pub id: String,
    pub preferred: bool,
    pub time: Quantity<NaiveDateTime>,
    pub latitude: Quantity<f64>,
    pub longitude: Quantity<f64>,
    pub depth: Quantity<f64>,
    pub ellipse: Option<ErrorEllipse>,
    pub quality: Option<OriginQuality>,
    pub evaluation_mode: Option<EvaluationMode>,
    pub evaluation_status: Option<EvaluationStatus>,
    pub phases: Vec<Phase>,
}

impl Origin {
    pub fn new<S: ToString>(
        id: S,
        preferred: bool,
        time: Quantity<NaiveDateTime>,
        latitude: Quantity<f64>,
        longitude: Quantity<f64>,
        depth: Quantity<f64>,
    ) -> Self {
        Self {
            id: id.to_string(),
            preferred,
            time,
            latitude,
            longitude,
            depth,
            ellipse: None,
            quality: None,
            evaluation_mode: None,
            evaluation_status: None,
            phases: Vec::new(),
        }
    }

    pub fn with_ellipse(mut self, ellipse: ErrorEllipse) -> Self {
        self.ellipse = Some(ellipse);
        self
    }

    pub fn with_evaluation(mut self, mode: EvaluationMode, status: EvaluationStatus) -> Self {
        self.evaluation_mode = Some(mode);
        self.evaluation_status = Some(status);
        self
    }

    /// Add a phase, replacing an earlier observation of the same phase at the same
    /// station in place
    pub fn add_or_replace_phase(&mut self, phase: Phase) {
        match self
            .phases
            .iter_mut()
            .find(|p| p.observation_key() == phase.observation_key())
        {
            Some(existing) => *existing = phase,
            None => self.phases.push(phase),
        }
    }
}
