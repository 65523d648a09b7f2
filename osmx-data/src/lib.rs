//! File formats for OpenStreetMap extraction.
//!
//! Responsibilities:
//! - Open inputs and detect XML or PBF from the suffix or content.
//! - Provide restartable [`osmx_core::Backend`] streams for both formats.
//! - Serialise datasets as OSM XML and GPX.
//!
//! Boundaries:
//! - Extraction and duplicate detection live in `osmx-core`.
//! - Path handling goes through `osmx-fs`.
//!
//! Invariants:
//! - Section offsets are discovered once per opened file.
//! - Malformed records surface as recoverable [`osmx_core::ReadError`]s;
//!   nothing here panics on bad input.

mod open;
mod pbf;
mod timestamp;
mod write;
mod xml;

pub use open::{FileType, OpenError, OsmFile, open};
pub use pbf::PbfBackend;
pub use write::{GpxWriter, OsmXmlWriter, WriteError};
pub use xml::XmlBackend;
