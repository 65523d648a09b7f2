//! Closure-preserving three-phase extraction.
//!
//! Relations are read first, then ways, then nodes. Every kept relation
//! marks its members as wanted and every kept way marks its nodes as wanted;
//! a wanted entity is kept even when it fails its own predicate. The result
//! is therefore closed one level downward.
//!
//! Bounding-box extraction runs two extra scans before the relation phase:
//! one collecting nodes inside the box and one collecting ways touching
//! those nodes.

use std::fmt;
use std::marker::PhantomData;

use log::{debug, trace};
use thiserror::Error;

use crate::{
    Backend, BackendError, BoundingBox, Dataset, Entity, EntityKind, EntityStream, Filters,
    HashIdSet, IdMembership, MemberKind, Node, Predicate, ReadError, Relation, Way,
};

mod selection;

pub use selection::Selection;


/// How an extraction chooses the entities it keeps on their own merit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Keep everything; predicates are ignored and nothing propagates.
    Dump,
    /// Keep the entity of the given kind with the given id, plus its closure.
    ///
    /// Phases for kinds above the target keep nothing; phases below keep
    /// wanted entities and, when explicitly supplied, predicate matches.
    ById(EntityKind, u64),
    /// Keep entities inside the box that also satisfy their predicate.
    ByBoundingBox(BoundingBox),
    /// Keep entities satisfying their predicate; a missing predicate accepts.
    ByPredicate,
}

/// Mode and predicates for one extraction.
#[derive(Debug)]
pub struct ExtractConfig {
    /// Selection mode.
    pub mode: Mode,
    /// Per-kind predicates.
    pub filters: Filters,
}

impl ExtractConfig {
    /// A configuration with no predicates.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            filters: Filters::none(),
        }
    }

    /// Replace the predicates.
    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }
}

/// A stage of the extraction, named in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Scan collecting nodes inside the bounding box.
    NodeScope,
    /// Scan collecting ways touching in-scope nodes.
    WayScope,
    /// Relation phase.
    Relations,
    /// Way phase.
    Ways,
    /// Node phase.
    Nodes,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NodeScope => "node scope",
            Self::WayScope => "way scope",
            Self::Relations => "relation",
            Self::Ways => "way",
            Self::Nodes => "node",
        })
    }
}

/// Errors returned by [`extract`] and [`ExtractionEngine::run`].
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The caller supplied no selection criteria.
    #[error("no selection specified")]
    NoSelection,
    /// A stream could not be (re)started.
    #[error("failed to start the {phase} phase")]
    Start {
        /// Phase that could not start.
        phase: Phase,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// A non-recoverable read failure aborted a phase.
    #[error("{phase} phase aborted")]
    Phase {
        /// Phase that failed.
        phase: Phase,
        /// Read failure.
        #[source]
        source: ReadError,
    },
}

/// Counts for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseReport {
    /// Entities kept.
    pub kept: usize,
    /// Valid entities not kept.
    pub rejected: usize,
    /// Malformed records skipped.
    pub malformed: usize,
}

/// Counts for the three main phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionReport {
    /// Relation phase.
    pub relations: PhaseReport,
    /// Way phase.
    pub ways: PhaseReport,
    /// Node phase.
    pub nodes: PhaseReport,
}

impl ExtractionReport {
    /// Malformed records skipped across all phases.
    #[must_use]
    pub const fn malformed(&self) -> usize {
        self.relations.malformed + self.ways.malformed + self.nodes.malformed
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Kept entities in file order.
    pub dataset: Dataset,
    /// Per-phase counts.
    pub report: ExtractionReport,
}

/// Run an extraction with the default [`HashIdSet`].
///
/// # Errors
/// Returns [`ExtractError`] when a phase cannot start or hits a
/// non-recoverable read failure.
///
/// # Examples
/// ```
/// use osmx_core::{extract, EntityKind, ExtractConfig, MemoryBackend, Mode, Node, Way};
///
/// let mut backend = MemoryBackend::default()
///     .with_way(Way::new(10, vec![1, 2]))
///     .with_node(Node::new(1, 0.0, 0.0))
///     .with_node(Node::new(2, 1.0, 1.0))
///     .with_node(Node::new(3, 2.0, 2.0));
/// let result = extract(&mut backend, ExtractConfig::new(Mode::ById(EntityKind::Way, 10)))?;
/// let ids: Vec<u64> = result.dataset.nodes.iter().map(|n| n.id).collect();
/// assert_eq!(ids, vec![1, 2]);
/// # Ok::<(), osmx_core::ExtractError>(())
/// ```
pub fn extract<B: Backend + ?Sized>(
    backend: &mut B,
    config: ExtractConfig,
) -> Result<Extraction, ExtractError> {
    ExtractionEngine::<HashIdSet>::new(config).run(backend)
}

/// Own-merit acceptance rule of one phase, derived from the [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum Rule {
    KeepAll,
    Nothing,
    Target(u64),
    Explicit,
    Default,
    Scoped,
}

impl Rule {
    const fn for_phase(mode: Mode, kind: EntityKind) -> Self {
        match mode {
            Mode::Dump => Self::KeepAll,
            Mode::ById(target, id) => {
                let (phase_rank, target_rank) = (rank(kind), rank(target));
                if phase_rank == target_rank {
                    Self::Target(id)
                } else if phase_rank > target_rank {
                    Self::Nothing
                } else {
                    Self::Explicit
                }
            }
            Mode::ByBoundingBox(_) => Self::Scoped,
            Mode::ByPredicate => Self::Default,
        }
    }

    fn accepts<E: Entity>(
        self,
        entity: &E,
        predicate: Option<&Predicate<E>>,
        in_scope: impl FnOnce() -> bool,
    ) -> bool {
        let explicit = || predicate.is_some_and(|p| p.matches(entity));
        let default = || predicate.is_none_or(|p| p.matches(entity));
        match self {
            Self::KeepAll => true,
            Self::Nothing => false,
            Self::Target(id) => entity.id() == id || explicit(),
            Self::Explicit => explicit(),
            Self::Default => default(),
            Self::Scoped => in_scope() && default(),
        }
    }
}

const fn rank(kind: EntityKind) -> u8 {
    match kind {
        EntityKind::Node => 0,
        EntityKind::Way => 1,
        EntityKind::Relation => 2,
    }
}

/// Ids of nodes inside the bounding box and of ways touching them.
struct Scope<S> {
    nodes: S,
    ways: S,
}

impl<S: IdMembership> Scope<S> {
    fn relation_inside(&self, relation: &Relation) -> bool {
        relation.members.iter().any(|member| match member.kind {
            MemberKind::Node => self.nodes.contains(member.id),
            MemberKind::Way => self.ways.contains(member.id),
            MemberKind::Unknown => {
                self.nodes.contains(member.id) || self.ways.contains(member.id)
            }
            MemberKind::Relation => false,
        })
    }
}

/// Three-phase extraction driver, generic over the identifier set.
///
/// # Examples
/// ```
/// use osmx_core::{ExtractConfig, ExtractionEngine, MemoryBackend, Mode, Node, SortedIdSet};
///
/// let mut backend = MemoryBackend::default().with_node(Node::new(1, 0.0, 0.0));
/// let engine = ExtractionEngine::<SortedIdSet>::new(ExtractConfig::new(Mode::Dump));
/// let result = engine.run(&mut backend)?;
/// assert_eq!(result.dataset.nodes.len(), 1);
/// # Ok::<(), osmx_core::ExtractError>(())
/// ```
#[derive(Debug)]
pub struct ExtractionEngine<S = HashIdSet> {
    config: ExtractConfig,
    ids: PhantomData<S>,
}

impl<S: IdMembership> ExtractionEngine<S> {
    /// Create an engine for `config`.
    #[must_use]
    pub const fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            ids: PhantomData,
        }
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub const fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Run every phase against `backend`.
    ///
    /// # Errors
    /// Returns [`ExtractError::Start`] when a stream cannot be restarted and
    /// [`ExtractError::Phase`] on a non-recoverable read failure. Later
    /// phases do not run after a failure.
    pub fn run<B: Backend + ?Sized>(&self, backend: &mut B) -> Result<Extraction, ExtractError> {
        let propagate = self.config.mode != Mode::Dump;
        let scope = match self.config.mode {
            Mode::ByBoundingBox(bbox) => Some(Self::scan_scope(backend, &bbox)?),
            _ => None,
        };
        let mut extraction = Extraction::default();
        let mut wanted_ways = S::default();
        let mut wanted_nodes = S::default();

        if let Some((relations, report)) = self.relation_phase(backend, scope.as_ref())? {
            if propagate {
                let (way_ids, node_ids) = member_targets(&relations);
                wanted_ways.extend_ids(way_ids);
                wanted_nodes.extend_ids(node_ids);
            }
            extraction.report.relations = report;
            extraction.dataset.relations = relations;
        }

        if let Some((ways, report)) = self.way_phase(backend, scope.as_ref(), &wanted_ways)? {
            if propagate {
                wanted_nodes.extend_ids(ways.iter().flat_map(|way| way.nodes.iter().copied()));
            }
            extraction.report.ways = report;
            extraction.dataset.ways = ways;
        }
        drop(wanted_ways);

        let (nodes, report) = self.node_phase(backend, scope.as_ref(), &wanted_nodes)?;
        extraction.report.nodes = report;
        extraction.dataset.nodes = nodes;

        debug!(
            "extraction finished: {} relations, {} ways, {} nodes, {} malformed",
            extraction.dataset.relations.len(),
            extraction.dataset.ways.len(),
            extraction.dataset.nodes.len(),
            extraction.report.malformed()
        );
        Ok(extraction)
    }

    fn relation_phase<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        scope: Option<&Scope<S>>,
    ) -> Result<Option<(Vec<Relation>, PhaseReport)>, ExtractError> {
        let rule = Rule::for_phase(self.config.mode, EntityKind::Relation);
        if rule == Rule::Nothing {
            debug!("relation phase skipped");
            return Ok(None);
        }
        let predicate = self.config.filters.relation.as_ref();
        let stream = start(Phase::Relations, backend.relations())?;
        collect_phase(Phase::Relations, stream, |relation| {
            rule.accepts(relation, predicate, || {
                scope.is_some_and(|s| s.relation_inside(relation))
            })
        })
        .map(Some)
    }

    fn way_phase<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        scope: Option<&Scope<S>>,
        wanted: &S,
    ) -> Result<Option<(Vec<Way>, PhaseReport)>, ExtractError> {
        let rule = Rule::for_phase(self.config.mode, EntityKind::Way);
        if rule == Rule::Nothing {
            debug!("way phase skipped");
            return Ok(None);
        }
        let predicate = self.config.filters.way.as_ref();
        let stream = start(Phase::Ways, backend.ways())?;
        collect_phase(Phase::Ways, stream, |way| {
            wanted.contains(way.id)
                || rule.accepts(way, predicate, || {
                    scope.is_some_and(|s| s.ways.contains(way.id))
                })
        })
        .map(Some)
    }

    fn node_phase<B: Backend + ?Sized>(
        &self,
        backend: &mut B,
        scope: Option<&Scope<S>>,
        wanted: &S,
    ) -> Result<(Vec<Node>, PhaseReport), ExtractError> {
        let rule = Rule::for_phase(self.config.mode, EntityKind::Node);
        let predicate = self.config.filters.node.as_ref();
        let stream = start(Phase::Nodes, backend.nodes())?;
        collect_phase(Phase::Nodes, stream, |node| {
            wanted.contains(node.id)
                || rule.accepts(node, predicate, || {
                    scope.is_some_and(|s| s.nodes.contains(node.id))
                })
        })
    }

    fn scan_scope<B: Backend + ?Sized>(
        backend: &mut B,
        bbox: &BoundingBox,
    ) -> Result<Scope<S>, ExtractError> {
        let mut nodes = S::default();
        let node_stream = start(Phase::NodeScope, backend.nodes())?;
        nodes.extend_ids(scan(Phase::NodeScope, node_stream, |node: &Node| {
            bbox.contains(node.location).then_some(node.id)
        })?);

        let mut ways = S::default();
        let way_stream = start(Phase::WayScope, backend.ways())?;
        ways.extend_ids(scan(Phase::WayScope, way_stream, |way: &Way| {
            way.nodes
                .iter()
                .any(|id| nodes.contains(*id))
                .then_some(way.id)
        })?);

        debug!(
            "bounding box scope: {} nodes, {} ways",
            nodes.len(),
            ways.len()
        );
        Ok(Scope { nodes, ways })
    }
}

fn start<T>(
    phase: Phase,
    stream: Result<EntityStream<'_, T>, BackendError>,
) -> Result<EntityStream<'_, T>, ExtractError> {
    stream.map_err(|source| ExtractError::Start { phase, source })
}

/// Drain `stream`, keeping entities for which `keep` returns true.
fn collect_phase<T, F>(
    phase: Phase,
    stream: EntityStream<'_, T>,
    mut keep: F,
) -> Result<(Vec<T>, PhaseReport), ExtractError>
where
    T: Entity,
    F: FnMut(&T) -> bool,
{
    let mut kept = Vec::new();
    let mut report = PhaseReport::default();
    for item in stream {
        match item {
            Ok(entity) if keep(&entity) => {
                trace!("{phase} phase: keeping {} {}", T::KIND, entity.id());
                report.kept += 1;
                kept.push(entity);
            }
            Ok(_) => report.rejected += 1,
            Err(err) if err.is_recoverable() => {
                debug!("{phase} phase: skipping record: {err}");
                report.malformed += 1;
            }
            Err(source) => return Err(ExtractError::Phase { phase, source }),
        }
    }
    debug!(
        "{phase} phase: kept {}, rejected {}, malformed {}",
        report.kept, report.rejected, report.malformed
    );
    Ok((kept, report))
}

/// Drain `stream`, collecting the ids `select` yields. Malformed records are
/// ignored here; the main phases count them.
fn scan<T, F>(phase: Phase, stream: EntityStream<'_, T>, mut select: F) -> Result<Vec<u64>, ExtractError>
where
    F: FnMut(&T) -> Option<u64>,
{
    let mut ids = Vec::new();
    for item in stream {
        match item {
            Ok(entity) => ids.extend(select(&entity)),
            Err(err) if err.is_recoverable() => {}
            Err(source) => return Err(ExtractError::Phase { phase, source }),
        }
    }
    Ok(ids)
}

/// Split relation members into wanted way ids and wanted node ids.
///
/// Members of unknown kind are wanted as both; relation members are not
/// followed.
fn member_targets(relations: &[Relation]) -> (Vec<u64>, Vec<u64>) {
    let mut ways = Vec::new();
    let mut nodes = Vec::new();
    for member in relations.iter().flat_map(|relation| &relation.members) {
        match member.kind {
            MemberKind::Way => ways.push(member.id),
            MemberKind::Node => nodes.push(member.id),
            MemberKind::Unknown => {
                ways.push(member.id);
                nodes.push(member.id);
            }
            MemberKind::Relation => {}
        }
    }
    (ways, nodes)
}
