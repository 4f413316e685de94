use std::fmt::Display;

use super::origin::EvaluationStatus;
use super::quantity::Quantity;

/// A fault plane orientation in degrees
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodalPlane {
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
}

impl NodalPlane {
    pub fn new(strike: f64, dip: f64, rake: f64) -> Self {
        Self { strike, dip, rake }
    }
}

/// A principal axis of the moment tensor. `value` is the eigenvalue in newton-meters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrincipalAxis {
    pub value: f64,
    pub plunge: f64,
    pub azimuth: f64,
}

impl PrincipalAxis {
    pub fn new(value: f64, plunge: f64, azimuth: f64) -> Self {
        Self {
            value,
            plunge,
            azimuth,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FocalMechanism {
    /// The method label, e.g. "Mwc" or "Mww". Required for serialization.
    pub method: Option<String>,
    pub nodal_plane_1: NodalPlane,
    pub nodal_plane_2: NodalPlane,
    pub t_axis: PrincipalAxis,
    pub n_axis: PrincipalAxis,
    pub p_axis: PrincipalAxis,
    pub evaluation_status: EvaluationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InversionType {
    General,
    ZeroTrace,
    DoubleCouple,
}

impl InversionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::ZeroTrace => "zero trace",
            Self::DoubleCouple => "double couple",
        }
    }
}

impl Display for InversionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceTimeFunctionType {
    BoxCar,
    Triangle,
    Trapezoid,
    #[default]
    Unknown,
}

impl SourceTimeFunctionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BoxCar => "box car",
            Self::Triangle => "triangle",
            Self::Trapezoid => "trapezoid",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for SourceTimeFunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Times are in seconds
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceTimeFunction {
    pub function_type: SourceTimeFunctionType,
    pub duration: f64,
    pub rise_time: Option<f64>,
    pub decay_time: Option<f64>,
}

impl SourceTimeFunction {
    pub fn new(function_type: SourceTimeFunctionType, duration: f64) -> Self {
        Self {
            function_type,
            duration,
            rise_time: None,
            decay_time: None,
        }
    }
}

/// How many stations and channels of one wave type contributed to an inversion
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaveUsage {
    pub station_count: u32,
    pub channel_count: u32,
}

impl WaveUsage {
    pub fn new(station_count: u32, channel_count: u32) -> Self {
        Self {
            station_count,
            channel_count,
        }
    }
}

/**
A seismic moment tensor. All components and the scalar moment are in
newton-meters.
*/
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MomentTensor {
    /// The method label, e.g. "Mwc" or "Mww". Required for serialization.
    pub method: Option<String>,
    pub mrr: Quantity<f64>,
    pub mtt: Quantity<f64>,
    pub mpp: Quantity<f64>,
    pub mrt: Quantity<f64>,
    pub mrp: Quantity<f64>,
    pub mtp: Quantity<f64>,
    pub scalar_moment: f64,
    pub inversion_type: Option<InversionType>,
    pub source_time_function: Option<SourceTimeFunction>,
    pub double_couple: Option<f64>,
    pub clvd: Option<f64>,
    pub body_waves: Option<WaveUsage>,
    pub surface_waves: Option<WaveUsage>,
    pub mantle_waves: Option<WaveUsage>,
}

impl MomentTensor {
    /// The tensor components in `Mrr, Mtt, Mpp, Mrt, Mrp, Mtp` order, paired with their
    /// QuakeML element names
    pub fn components(&self) -> [(&'static str, &Quantity<f64>); 6] {
        [
            ("Mrr", &self.mrr),
            ("Mtt", &self.mtt),
            ("Mpp", &self.mpp),
            ("Mrt", &self.mrt),
            ("Mrp", &self.mrp),
            ("Mtp", &self.mtp),
        ]
    }

    /// The moment magnitude implied by the scalar moment, rounded to one decimal place
    pub fn moment_magnitude(&self) -> f64 {
        moment_magnitude(self.scalar_moment)
    }
}

/// Compute `Mw = 2/3 (log10(M0) - 16.1)` with `M0` in dyne-cm from a scalar moment in
/// newton-meters, rounded half-to-even to one decimal place.
pub fn moment_magnitude(scalar_moment: f64) -> f64 {
    let dyne_cm = scalar_moment * 1e7;
    let mag = (2.0 / 3.0) * (dyne_cm.log10() - 16.1);
    (mag * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_moment_magnitude() {
        let m0 = 1.312e23 * 1e-7;
        let expected = ((2.0 / 3.0) * ((m0 * 1e7f64).log10() - 16.1) * 10.0).round() / 10.0;
        assert_eq!(moment_magnitude(m0), expected);
        assert_eq!(moment_magnitude(m0), 4.7);
    }

    #[test]
    fn test_enum_labels() {
        assert_eq!(InversionType::ZeroTrace.to_string(), "zero trace");
        assert_eq!(SourceTimeFunctionType::BoxCar.to_string(), "box car");
        assert_eq!(SourceTimeFunctionType::default(), SourceTimeFunctionType::Unknown);
    }
}
