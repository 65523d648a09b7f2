//! Format-independent access to the three entity streams of an input.
//!
//! A [`Backend`] hands out one lazy stream per entity kind. Asking for a
//! stream again restarts it at the first entity of that kind, which is how
//! the extraction engine performs its repeated passes.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{EntityKind, Node, Relation, Way};

mod memory;

pub use memory::MemoryBackend;

/// Lazy stream of entities of one kind, in file order.
pub type EntityStream<'a, T> = Box<dyn Iterator<Item = Result<T, ReadError>> + 'a>;

/// Boxed error from a format-specific decoder.
pub type DecodeSource = Box<dyn StdError + Send + Sync + 'static>;

/// Failure while reading a single record from a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The record lacks a required field or carries an invalid one.
    ///
    /// Consumers skip the record and keep reading.
    #[error("malformed {kind} record at {position}: {reason}")]
    Malformed {
        /// Kind of the record being read.
        kind: EntityKind,
        /// Format-specific position (byte offset or block index).
        position: u64,
        /// Human-readable description of the defect.
        reason: String,
    },
    /// The underlying reader failed; the stream cannot continue.
    #[error("I/O error while reading {kind} records")]
    Io {
        /// Kind of the record being read.
        kind: EntityKind,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The input could not be decoded past this point.
    #[error("failed to decode {kind} records")]
    Decode {
        /// Kind of the record being read.
        kind: EntityKind,
        /// Decoder error.
        #[source]
        source: DecodeSource,
    },
}

impl ReadError {
    /// Build a [`ReadError::Malformed`].
    pub fn malformed(kind: EntityKind, position: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            position,
            reason: reason.into(),
        }
    }

    /// Whether the record can be skipped without aborting the stream.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Failure to (re)start a stream.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Seeking back to the start of a section failed.
    #[error("failed to restart the {kind} stream")]
    Restart {
        /// Stream being restarted.
        kind: EntityKind,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Section discovery failed before the stream could start.
    #[error("failed to locate the {kind} section")]
    Section {
        /// Stream being located.
        kind: EntityKind,
        /// Decoder error.
        #[source]
        source: DecodeSource,
    },
}

/// Reader supplying restartable entity streams.
///
/// Implementations discover section boundaries at most once per handle and
/// cache them; every call restarts the corresponding stream from its first
/// entity.
pub trait Backend {
    /// Stream every relation.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the stream cannot be restarted.
    fn relations(&mut self) -> Result<EntityStream<'_, Relation>, BackendError>;

    /// Stream every way.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the stream cannot be restarted.
    fn ways(&mut self) -> Result<EntityStream<'_, Way>, BackendError>;

    /// Stream every node.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the stream cannot be restarted.
    fn nodes(&mut self) -> Result<EntityStream<'_, Node>, BackendError>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn relations(&mut self) -> Result<EntityStream<'_, Relation>, BackendError> {
        (**self).relations()
    }

    fn ways(&mut self) -> Result<EntityStream<'_, Way>, BackendError> {
        (**self).ways()
    }

    fn nodes(&mut self) -> Result<EntityStream<'_, Node>, BackendError> {
        (**self).nodes()
    }
}
