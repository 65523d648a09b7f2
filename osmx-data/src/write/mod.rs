//! Serialisers for extracted datasets.

use std::io;

use thiserror::Error;

mod gpx;
mod osm;

pub use gpx::GpxWriter;
pub use osm::OsmXmlWriter;

/// Failure while writing output.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The underlying writer failed.
    #[error("failed to write {format} output: {source}")]
    Io {
        /// Output format being written.
        format: &'static str,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The XML event writer failed.
    #[error("failed to write {format} output: {source}")]
    Xml {
        /// Output format being written.
        format: &'static str,
        /// Underlying error.
        #[source]
        source: quick_xml::Error,
    },
}

impl WriteError {
    pub(crate) fn io(format: &'static str) -> impl Fn(io::Error) -> Self {
        move |source| Self::Io { format, source }
    }

    pub(crate) fn xml(format: &'static str) -> impl Fn(quick_xml::Error) -> Self {
        move |source| Self::Xml { format, source }
    }
}
