//! `quakecat` reads seismological event catalogs and converts them to [QuakeML](https://quake.ethz.ch/quakeml/).
//!
//! Three input formats are supported, each behind a default-on feature flag:
//!
//! - [NDK](crate::io::ndk) moment tensor solutions from the Global CMT project (`ndk`)
//! - [MLOC](crate::io::mloc) multiple-event relocations (`mloc`)
//! - the [ISC-GEM](crate::io::iscgem) instrumental catalogue (`iscgem`)
//!
//! Readers produce [`Event`]s which [`to_quakeml`] serializes to a single-line QuakeML
//! document.
//!
//! ```no_run
//! use quakecat::prelude::*;
//!
//! let (format, events) = quakecat::io::open_file("catalog.ndk.gz")?;
//! for event in events {
//!     let event = event?;
//!     let xml = to_quakeml(&event)?;
//!     write_quakeml(&xml, &event.id, "output", format.file_type())?;
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
pub mod event;
pub mod io;
pub mod lookup;
pub mod prelude;

pub use crate::event::{Event, EventError, Magnitude, Origin, Quantity};

#[cfg(feature = "iscgem")]
pub use crate::io::iscgem::IscGemReader;
#[cfg(feature = "mloc")]
pub use crate::io::mloc::MlocReader;
#[cfg(feature = "ndk")]
pub use crate::io::ndk::NdkReader;

pub use crate::io::quakeml::{to_quakeml, write_quakeml};
