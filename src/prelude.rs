//! A set of commonly used types and traits
pub use crate::event::{Event, FocalMechanism, Magnitude, MomentTensor, Origin, Phase, Quantity};
pub use crate::io::{to_quakeml, write_quakeml, CatalogError, CatalogFormat, EventSourceExt};
pub use crate::lookup::{CatalogLookup, StationLookup};
pub use std::io::prelude::*;
