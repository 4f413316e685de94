//! Read multiple-event relocation results written by MLOC.
//!
//! **Requires the `mloc` feature, enabled by default**
#![cfg(feature = "mloc")]
mod reader;

pub use reader::{
    is_mloc, usage_weight, MlocError, MlocReader, VelocityLayer, LOOKUP_RADIUS_KM,
    LOOKUP_WINDOW_SECONDS, MIN_LOOKUP_MAGNITUDE, STATION_SEARCH_RADIUS,
};
