//! Read moment tensor solutions from [NDK](https://www.ldeo.columbia.edu/~gcmt/projects/CMT/catalog/allorder.ndk_explained)
//! files published by the Global CMT project.
//!
//! **Requires the `ndk` feature, enabled by default**
#![cfg(feature = "ndk")]
mod reader;

pub use reader::{is_ndk, NdkError, NdkParserState, NdkReader, DYNECM_TO_NEWTONMETERS};
