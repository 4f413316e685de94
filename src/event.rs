//! The canonical earthquake event model shared by every catalog reader and the
//! QuakeML writer.
//!
//! An [`Event`] owns its [`Origin`]s and [`Magnitude`]s and optionally a
//! [`FocalMechanism`] and [`MomentTensor`]. Events are validated when they are
//! constructed with [`Event::new`] and again before they are serialized.
use std::fmt::Display;

use thiserror::Error;

mod magnitude;
mod mechanism;
mod origin;
mod quantity;

pub use magnitude::Magnitude;
pub use mechanism::{
    moment_magnitude, FocalMechanism, InversionType, MomentTensor, NodalPlane, PrincipalAxis,
    SourceTimeFunction, SourceTimeFunctionType, WaveUsage,
};
pub use origin::{
    ErrorEllipse, EvaluationMode, EvaluationStatus, Origin, OriginQuality, Phase,
};
pub use quantity::Quantity;

/// The kind of entity that was marked as preferred more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferredKind {
    Origin,
    Magnitude,
}

impl Display for PreferredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Origin => f.write_str("origin"),
            Self::Magnitude => f.write_str("magnitude"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("{record} is missing required field {field}")]
    MissingField { record: String, field: &'static str },
    #[error("more than one preferred {0} found")]
    MultiplePreferred(PreferredKind),
}

impl EventError {
    pub fn missing<S: ToString>(record: S, field: &'static str) -> Self {
        Self::MissingField {
            record: record.to_string(),
            field,
        }
    }
}

/// A single earthquake with all of its candidate solutions
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    pub id: String,
    /// The network code of the catalog the event was published in
    pub catalog: String,
    /// The network code of the agency contributing the solution
    pub contributor: String,
    pub origins: Vec<Origin>,
    pub magnitudes: Vec<Magnitude>,
    pub focal_mechanism: Option<FocalMechanism>,
    pub moment_tensor: Option<MomentTensor>,
    pub comment: Option<String>,
}

impl Event {
    /// Create a new event, checking that the required fields are populated and
    /// that at most one origin and one magnitude are preferred.
    pub fn new<S: ToString, T: ToString, U: ToString>(
        id: S,
        catalog: T,
        contributor: U,
        origins: Vec<Origin>,
        magnitudes: Vec<Magnitude>,
    ) -> Result<Self, EventError> {
        let event = Self {
            id: id.to_string(),
            catalog: catalog.to_string(),
            contributor: contributor.to_string(),
            origins,
            magnitudes,
            focal_mechanism: None,
            moment_tensor: None,
            comment: None,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn with_focal_mechanism(mut self, focal_mechanism: FocalMechanism) -> Self {
        self.focal_mechanism = Some(focal_mechanism);
        self
    }

    pub fn with_moment_tensor(mut self, moment_tensor: MomentTensor) -> Self {
        self.moment_tensor = Some(moment_tensor);
        self
    }

    pub fn with_comment<S: ToString>(mut self, comment: S) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::missing("event", "id"));
        }
        if self.catalog.is_empty() {
            return Err(EventError::missing(&self.id, "catalog"));
        }
        if self.contributor.is_empty() {
            return Err(EventError::missing(&self.id, "contributor"));
        }
        if self.origins.is_empty() {
            return Err(EventError::missing(&self.id, "origins"));
        }
        if self.magnitudes.is_empty() {
            return Err(EventError::missing(&self.id, "magnitudes"));
        }
        if self.origins.iter().filter(|o| o.preferred).count() > 1 {
            return Err(EventError::MultiplePreferred(PreferredKind::Origin));
        }
        if self.magnitudes.iter().filter(|m| m.preferred).count() > 1 {
            return Err(EventError::MultiplePreferred(PreferredKind::Magnitude));
        }
        if self.magnitudes.iter().any(|m| m.magnitude_type.is_empty()) {
            return Err(EventError::missing(&self.id, "magnitude type"));
        }
        Ok(())
    }

    pub fn preferred_origin(&self) -> Option<&Origin> {
        self.origins.iter().find(|o| o.preferred)
    }

    pub fn preferred_magnitude(&self) -> Option<&Magnitude> {
        self.magnitudes.iter().find(|m| m.preferred)
    }
}

#[cfg(test)]
mod test {
    use chrono::NaiveDate;

    use super::*;

    fn origin(id: &str, preferred: bool) -> Origin {
        let time = NaiveDate::from_ymd_opt(1994, 1, 17)
            .unwrap()
            .and_hms_opt(12, 30, 55)
            .unwrap();
        Origin::new(
            id,
            preferred,
            time.into(),
            34.164.into(),
            (-118.551).into(),
            18_000.0.into(),
        )
    }

    #[test]
    fn test_construction() {
        let event = Event::new(
            "189275",
            "iscgem",
            "us",
            vec![origin("a", true), origin("b", false)],
            vec![Magnitude::new(6.65, "Mw", true)],
        )
        .unwrap();
        assert_eq!(event.preferred_origin().unwrap().id, "a");
        assert_eq!(event.preferred_magnitude().unwrap().value, 6.65);
    }

    #[test]
    fn test_multiple_preferred() {
        let err = Event::new(
            "1",
            "us",
            "us",
            vec![origin("a", true), origin("b", true)],
            vec![Magnitude::new(5.0, "Mw", true)],
        )
        .unwrap_err();
        assert_eq!(err, EventError::MultiplePreferred(PreferredKind::Origin));

        let err = Event::new(
            "1",
            "us",
            "us",
            vec![origin("a", true)],
            vec![
                Magnitude::new(5.0, "Mw", true),
                Magnitude::new(4.8, "ML", true),
            ],
        )
        .unwrap_err();
        assert_eq!(err, EventError::MultiplePreferred(PreferredKind::Magnitude));
    }

    #[test]
    fn test_missing_fields() {
        let err = Event::new("1", "us", "us", vec![], vec![Magnitude::new(5.0, "Mw", true)])
            .unwrap_err();
        assert!(matches!(err, EventError::MissingField { field: "origins", .. }));

        let err = Event::new("", "us", "us", vec![origin("a", true)], vec![]).unwrap_err();
        assert!(matches!(err, EventError::MissingField { field: "id", .. }));

        let err = Event::new(
            "1",
            "us",
            "us",
            vec![origin("a", true)],
            vec![Magnitude::new(5.0, "", true)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EventError::MissingField {
                field: "magnitude type",
                ..
            }
        ));
    }
}
