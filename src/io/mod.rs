//! Reading earthquake catalog formats and writing QuakeML.
//!
//! Every reader yields one [`Event`](crate::event::Event) per record, or an error for
//! a record that could not be read, and carries on with the next record.

pub(crate) mod compression;
mod infer_format;
#[cfg(feature = "iscgem")]
pub mod iscgem;
#[cfg(feature = "mloc")]
pub mod mloc;
#[cfg(feature = "ndk")]
pub mod ndk;
pub mod quakeml;
pub(crate) mod traits;
pub(crate) mod utils;

pub use crate::io::compression::open_maybe_gzipped;
pub use crate::io::infer_format::{
    infer_format, infer_from_path, infer_from_stream, open_file, CatalogFormat, EventIterator,
};

#[cfg(feature = "iscgem")]
pub use crate::io::iscgem::{IscGemError, IscGemReader};
#[cfg(feature = "mloc")]
pub use crate::io::mloc::{MlocError, MlocReader};
#[cfg(feature = "ndk")]
pub use crate::io::ndk::{NdkError, NdkReader};

pub use crate::io::quakeml::{quakeml_path, to_quakeml, write_quakeml, QuakeMLError};
pub use crate::io::traits::{CatalogBatch, CatalogError, EventSourceExt};
pub use crate::io::utils::{Attribution, FieldError, DEFAULT_NETWORK};
