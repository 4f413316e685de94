use std::io;

use log::warn;
use thiserror::Error;

use crate::event::Event;

#[cfg(feature = "iscgem")]
use super::iscgem::IscGemError;
#[cfg(feature = "mloc")]
use super::mloc::MlocError;
#[cfg(feature = "ndk")]
use super::ndk::NdkError;

/// The failure of a single record from any supported catalog reader
#[derive(Debug, Error)]
pub enum CatalogError {
    #[cfg(feature = "ndk")]
    #[error(transparent)]
    NDK(#[from] NdkError),
    #[cfg(feature = "mloc")]
    #[error(transparent)]
    MLOC(#[from] MlocError),
    #[cfg(feature = "iscgem")]
    #[error(transparent)]
    ISCGEM(#[from] IscGemError),
    #[error("Encountered an IO error: {0}")]
    IOError(
        #[from]
        #[source]
        io::Error,
    ),
}

impl From<CatalogError> for io::Error {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::IOError(e) => e,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

/// The events that were read successfully from a catalog, and the records that were not
#[derive(Debug, Default)]
pub struct CatalogBatch<E> {
    pub events: Vec<Event>,
    pub failures: Vec<E>,
}

impl<E> CatalogBatch<E> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Helpers for any reader that yields one event or one record failure at a time
pub trait EventSourceExt<E>: Iterator<Item = Result<Event, E>> + Sized {
    /// Read every record, keeping good events and collecting failures instead of stopping
    fn collect_batch(self) -> CatalogBatch<E>
    where
        E: std::fmt::Display,
    {
        let mut batch = CatalogBatch {
            events: Vec::new(),
            failures: Vec::new(),
        };
        for record in self {
            match record {
                Ok(event) => batch.events.push(event),
                Err(e) => {
                    warn!("Skipping record: {e}");
                    batch.failures.push(e);
                }
            }
        }
        batch
    }
}

impl<E, I: Iterator<Item = Result<Event, E>>> EventSourceExt<E> for I {}
