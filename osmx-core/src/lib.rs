//! Core model and algorithms for OpenStreetMap extraction.
//!
//! Responsibilities:
//! - Model nodes, ways and relations with their tags and edit metadata.
//! - Extract closure-preserving subsets through the [`Backend`] abstraction.
//! - Detect duplicate ways with an adaptive tile sweep.
//!
//! Boundaries:
//! - No file formats or I/O here; decoding and writing live in `osmx-data`.
//! - No logging setup; the library only emits through the `log` facade.
//!
//! Invariants:
//! - Entity ids are non-zero and unique per kind.
//! - Every extraction mode except [`Mode::Dump`] yields a dataset closed one
//!   level downward.
//! - No global mutable state.

mod backend;
mod bbox;
mod dupes;
mod extract;
mod filter;
mod ids;
mod model;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backend::{
    Backend, BackendError, DecodeSource, EntityStream, MemoryBackend, ReadError,
};
pub use bbox::{BBoxParseError, BoundingBox};
pub use dupes::{
    DetectorConfig, DuplicateDetector, DuplicatePair, DuplicateReport, MAX_TILES, TileSizeError,
    auto_tile_size, shares_edge,
};
pub use extract::{
    ExtractConfig, ExtractError, Extraction, ExtractionEngine, ExtractionReport, Mode, Phase,
    PhaseReport, Selection, extract,
};
pub use filter::{Criterion, Filters, Predicate};
pub use ids::{HashIdSet, IdMembership, SortedIdSet};
pub use model::{
    Dataset, Entity, EntityKind, Member, MemberKind, Metadata, Node, Relation, Tag, Way,
};
