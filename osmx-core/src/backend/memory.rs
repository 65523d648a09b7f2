//! In-memory [`Backend`] over pre-built records.

use std::io;

use super::{Backend, BackendError, EntityStream, ReadError};
use crate::{Dataset, EntityKind, Node, Relation, Way};

/// A stream slot: either a valid record or an injected failure.
#[derive(Debug, Clone)]
enum Slot<T> {
    Record(T),
    Malformed(String),
    Fail(String),
}

impl<T: Clone> Slot<T> {
    fn read(&self, kind: EntityKind, position: usize) -> Result<T, ReadError> {
        match self {
            Self::Record(record) => Ok(record.clone()),
            Self::Malformed(reason) => Err(ReadError::malformed(
                kind,
                u64::try_from(position).unwrap_or(u64::MAX),
                reason.clone(),
            )),
            Self::Fail(message) => Err(ReadError::Io {
                kind,
                source: io::Error::other(message.clone()),
            }),
        }
    }
}

/// Backend holding its records in vectors.
///
/// Useful for tests and for callers that already hold a [`Dataset`]. Streams
/// can be salted with malformed records and hard failures to exercise error
/// handling.
///
/// # Examples
/// ```
/// use osmx_core::{Backend, MemoryBackend, Node};
///
/// let mut backend = MemoryBackend::default().with_node(Node::new(1, 0.0, 0.0));
/// let first: Vec<_> = backend.nodes().unwrap().collect();
/// let second: Vec<_> = backend.nodes().unwrap().collect();
/// assert_eq!(first.len(), 1);
/// assert_eq!(second.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    nodes: Vec<Slot<Node>>,
    ways: Vec<Slot<Way>>,
    relations: Vec<Slot<Relation>>,
    restarts: [usize; 3],
}

impl MemoryBackend {
    /// Append a node.
    #[must_use]
    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(Slot::Record(node));
        self
    }

    /// Append a way.
    #[must_use]
    pub fn with_way(mut self, way: Way) -> Self {
        self.ways.push(Slot::Record(way));
        self
    }

    /// Append a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(Slot::Record(relation));
        self
    }

    /// Append a malformed record to the stream of `kind`.
    #[must_use]
    pub fn with_malformed(mut self, kind: EntityKind, reason: impl Into<String>) -> Self {
        let text: String = reason.into();
        match kind {
            EntityKind::Node => self.nodes.push(Slot::Malformed(text)),
            EntityKind::Way => self.ways.push(Slot::Malformed(text)),
            EntityKind::Relation => self.relations.push(Slot::Malformed(text)),
        }
        self
    }

    /// Append an unrecoverable read failure to the stream of `kind`.
    #[must_use]
    pub fn with_failure(mut self, kind: EntityKind, message: impl Into<String>) -> Self {
        let text: String = message.into();
        match kind {
            EntityKind::Node => self.nodes.push(Slot::Fail(text)),
            EntityKind::Way => self.ways.push(Slot::Fail(text)),
            EntityKind::Relation => self.relations.push(Slot::Fail(text)),
        }
        self
    }

    /// How many times the stream of `kind` has been started.
    #[must_use]
    pub fn restarts(&self, kind: EntityKind) -> usize {
        self.restarts
            .get(Self::slot_index(kind))
            .copied()
            .unwrap_or_default()
    }

    const fn slot_index(kind: EntityKind) -> usize {
        match kind {
            EntityKind::Node => 0,
            EntityKind::Way => 1,
            EntityKind::Relation => 2,
        }
    }

    fn stream<T: Clone + 'static>(
        slots: &[Slot<T>],
        kind: EntityKind,
    ) -> EntityStream<'_, T> {
        Box::new(
            slots
                .iter()
                .enumerate()
                .map(move |(position, slot)| slot.read(kind, position)),
        )
    }

    fn count_restart(&mut self, kind: EntityKind) {
        if let Some(count) = self.restarts.get_mut(Self::slot_index(kind)) {
            *count += 1;
        }
    }
}

impl From<Dataset> for MemoryBackend {
    fn from(dataset: Dataset) -> Self {
        Self {
            nodes: dataset.nodes.into_iter().map(Slot::Record).collect(),
            ways: dataset.ways.into_iter().map(Slot::Record).collect(),
            relations: dataset.relations.into_iter().map(Slot::Record).collect(),
            restarts: [0; 3],
        }
    }
}

impl Backend for MemoryBackend {
    fn relations(&mut self) -> Result<EntityStream<'_, Relation>, BackendError> {
        self.count_restart(EntityKind::Relation);
        Ok(Self::stream(&self.relations, EntityKind::Relation))
    }

    fn ways(&mut self) -> Result<EntityStream<'_, Way>, BackendError> {
        self.count_restart(EntityKind::Way);
        Ok(Self::stream(&self.ways, EntityKind::Way))
    }

    fn nodes(&mut self) -> Result<EntityStream<'_, Node>, BackendError> {
        self.count_restart(EntityKind::Node);
        Ok(Self::stream(&self.nodes, EntityKind::Node))
    }
}
