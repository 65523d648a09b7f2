//! Facade crate for osmx, the OpenStreetMap extraction toolkit.
//!
//! This crate re-exports the core model, extraction engine and duplicate-way
//! detector, and exposes the XML/PBF readers and writers behind the
//! `formats` feature.

#![forbid(unsafe_code)]

pub use osmx_core::{
    Backend, BackendError, BoundingBox, Criterion, Dataset, DetectorConfig, DuplicateDetector,
    DuplicatePair, DuplicateReport, Entity, EntityKind, ExtractConfig, ExtractError, Extraction,
    ExtractionEngine, ExtractionReport, Filters, HashIdSet, IdMembership, Member, MemberKind,
    MemoryBackend, Metadata, Mode, Node, Predicate, ReadError, Relation, Selection, SortedIdSet,
    Tag, TileSizeError, Way, extract,
};

#[cfg(feature = "formats")]
pub use osmx_data::{
    FileType, GpxWriter, OpenError, OsmFile, OsmXmlWriter, PbfBackend, WriteError, XmlBackend,
    open,
};
