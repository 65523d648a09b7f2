//! Duplicate-way detection over adaptive square tiles.
//!
//! Two ways are considered duplicates when they share a node at an interior
//! position of both and a neighbour of that node is shared as well, in
//! either direction. Comparing every pair of ways is quadratic, so the
//! dataset's bounding box is cut into square tiles and only ways touching the
//! same tile are compared.
//!
//! Tile edges are inclusive: a way straddling an edge is considered in every
//! tile it touches. Pairs found in several tiles are reported once.

use std::collections::{HashMap, HashSet};

use geo::Coord;
use log::{debug, trace, warn};
use thiserror::Error;

use crate::{BoundingBox, Dataset, Way};


/// Reasons a tile size cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TileSizeError {
    /// Auto-sizing needs at least one way.
    #[error("cannot derive a tile size from a dataset without ways")]
    NoWays,
    /// Auto-sizing needs at least one node.
    #[error("cannot derive a tile size from a dataset without nodes")]
    NoNodes,
    /// The size is zero, negative, NaN or infinite.
    #[error("tile size must be finite and positive, got {size}")]
    Invalid {
        /// Rejected size in degrees.
        size: f64,
    },
    /// The size would cut the bounding box into more than [`MAX_TILES`] tiles.
    #[error("tile size {size} is too small: the sweep would exceed {} tiles", MAX_TILES)]
    TooSmall {
        /// Rejected size in degrees.
        size: f64,
    },
}

/// Upper bound on the number of tiles one sweep may visit.
pub const MAX_TILES: u64 = 1 << 22;

/// Derive a tile edge length in degrees from dataset statistics.
///
/// Computes `((2 · area² · ln(nodes)) / ways)^(1/4)`, which balances the
/// quadratic per-tile pair comparison against the per-tile node lookups.
///
/// # Errors
/// Returns [`TileSizeError`] instead of a non-finite or non-positive size.
///
/// # Examples
/// ```
/// use osmx_core::{auto_tile_size, TileSizeError};
///
/// let size = auto_tile_size(1.0, 100, 1000)?;
/// assert!((size - 0.6097).abs() < 1e-3);
/// assert_eq!(auto_tile_size(1.0, 0, 1000), Err(TileSizeError::NoWays));
/// # Ok::<(), TileSizeError>(())
/// ```
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "tile sizing is a floating-point heuristic over entity counts"
)]
pub fn auto_tile_size(area: f64, ways: usize, nodes: usize) -> Result<f64, TileSizeError> {
    if ways == 0 {
        return Err(TileSizeError::NoWays);
    }
    if nodes == 0 {
        return Err(TileSizeError::NoNodes);
    }
    let size = ((2.0 * area * area * (nodes as f64).ln()) / ways as f64)
        .sqrt()
        .sqrt();
    validate_tile_size(size)
}

fn validate_tile_size(size: f64) -> Result<f64, TileSizeError> {
    if size.is_finite() && size > 0.0 {
        Ok(size)
    } else {
        Err(TileSizeError::Invalid { size })
    }
}

/// Detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Tile edge length in degrees; derived with [`auto_tile_size`] when unset.
    pub tile_size: Option<f64>,
}

/// Two ways sharing an adjacent node pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DuplicatePair {
    /// Way appearing first in the dataset.
    pub first: u64,
    /// Way appearing later in the dataset.
    pub second: u64,
}

impl DuplicatePair {
    const fn key(self) -> (u64, u64) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

/// Output of [`DuplicateDetector::detect`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DuplicateReport {
    /// Tile size actually used.
    pub tile_size: f64,
    /// Number of tiles swept.
    pub tiles: usize,
    /// Distinct duplicate pairs in discovery order.
    pub pairs: Vec<DuplicatePair>,
}

impl DuplicateReport {
    /// Way ids two per pair, in discovery order.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::{DuplicatePair, DuplicateReport};
    ///
    /// let report = DuplicateReport {
    ///     pairs: vec![DuplicatePair { first: 3, second: 9 }],
    ///     ..DuplicateReport::default()
    /// };
    /// assert_eq!(report.way_ids().collect::<Vec<_>>(), vec![3, 9]);
    /// ```
    pub fn way_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.pairs.iter().flat_map(|pair| [pair.first, pair.second])
    }

    /// Resolve [`DuplicateReport::way_ids`] against `dataset`, skipping ids
    /// the dataset does not hold.
    #[must_use]
    pub fn ways<'a>(&self, dataset: &'a Dataset) -> Vec<&'a Way> {
        let by_id = way_index(dataset);
        self.way_ids()
            .filter_map(|id| by_id.get(&id).copied())
            .collect()
    }

    /// Distinct way ids of this report that `dataset` does not hold, in
    /// discovery order.
    #[must_use]
    pub fn missing_ways(&self, dataset: &Dataset) -> Vec<u64> {
        let by_id = way_index(dataset);
        let mut seen = HashSet::new();
        self.way_ids()
            .filter(|id| !by_id.contains_key(id) && seen.insert(*id))
            .collect()
    }

    /// Number of distinct ways involved in at least one pair.
    #[must_use]
    pub fn distinct_ways(&self) -> usize {
        self.way_ids().collect::<HashSet<_>>().len()
    }
}

fn way_index(dataset: &Dataset) -> HashMap<u64, &Way> {
    dataset.ways.iter().map(|way| (way.id, way)).collect()
}

/// A way with its node positions resolved.
struct Located<'a> {
    way: &'a Way,
    coords: Vec<Coord<f64>>,
}

impl Located<'_> {
    fn touches(&self, left: f64, bottom: f64, size: f64) -> bool {
        let tile = tile_bounds(left, bottom, size);
        self.coords.iter().any(|coord| tile.contains(*coord))
    }
}

#[expect(clippy::float_arithmetic, reason = "tile edges are offsets in degrees")]
fn tile_bounds(left: f64, bottom: f64, size: f64) -> BoundingBox {
    BoundingBox::new(left, bottom, left + size, bottom + size)
}

#[expect(clippy::float_arithmetic, reason = "tile origins are offsets in degrees")]
fn tile_origin(start: f64, index: u32, size: f64) -> f64 {
    start + f64::from(index) * size
}

/// Tiles needed along one axis so the last origin does not pass `end`;
/// `None` when the count does not fit a `u32`.
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "the step count is range-checked before the cast"
)]
fn axis_tiles(start: f64, end: f64, size: f64) -> Option<u32> {
    if end < start {
        return Some(0);
    }
    let steps = ((end - start) / size).floor();
    if steps.is_finite() && steps < f64::from(u32::MAX) {
        Some(steps as u32 + 1)
    } else {
        None
    }
}

/// Column and row counts of the sweep, bounded by [`MAX_TILES`].
fn tile_grid(bbox: &BoundingBox, size: f64) -> Result<(u32, u32), TileSizeError> {
    let too_small = TileSizeError::TooSmall { size };
    let columns = axis_tiles(bbox.west, bbox.east, size).ok_or(too_small)?;
    let rows = axis_tiles(bbox.south, bbox.north, size).ok_or(too_small)?;
    if u64::from(columns) * u64::from(rows) > MAX_TILES {
        return Err(too_small);
    }
    Ok((columns, rows))
}

/// Tile-partitioned duplicate-way search.
///
/// # Examples
/// ```
/// use osmx_core::{Dataset, DetectorConfig, DuplicateDetector, Node, Way};
///
/// let mut dataset = Dataset {
///     nodes: (1..=4).map(|id| Node::new(id, id as f64, 0.0)).collect(),
///     ways: vec![Way::new(1, vec![1, 2, 3]), Way::new(2, vec![4, 2, 3])],
///     relations: Vec::new(),
/// };
/// let detector = DuplicateDetector::new(DetectorConfig { tile_size: Some(10.0) });
/// let report = detector.detect(&mut dataset)?;
/// assert_eq!(report.way_ids().collect::<Vec<_>>(), vec![1, 2]);
/// # Ok::<(), osmx_core::TileSizeError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateDetector {
    config: DetectorConfig,
}

impl DuplicateDetector {
    /// Create a detector.
    #[must_use]
    pub const fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Find duplicate ways in `dataset`.
    ///
    /// Sorts the node collection by id as a side effect.
    ///
    /// # Errors
    /// Returns [`TileSizeError`] when the configured tile size is unusable,
    /// would need more than [`MAX_TILES`] tiles, or auto-sizing has nothing to
    /// work with.
    pub fn detect(&self, dataset: &mut Dataset) -> Result<DuplicateReport, TileSizeError> {
        dataset.sort_nodes();
        let bbox = BoundingBox::from_nodes(&dataset.nodes);
        let tile_size = match self.config.tile_size {
            Some(size) => validate_tile_size(size)?,
            None => auto_tile_size(bbox.area(), dataset.ways.len(), dataset.nodes.len())?,
        };
        debug!(
            "duplicate search over {} ways, bbox {:.7},{:.7},{:.7},{:.7}, tile size {tile_size:.7}",
            dataset.ways.len(),
            bbox.west,
            bbox.south,
            bbox.east,
            bbox.north
        );

        let (columns, rows) = tile_grid(&bbox, tile_size)?;
        let located = locate_ways(dataset);
        let mut report = DuplicateReport {
            tile_size,
            ..DuplicateReport::default()
        };
        let mut seen = HashSet::new();
        for column in 0..columns {
            let left = tile_origin(bbox.west, column, tile_size);
            for row in 0..rows {
                let bottom = tile_origin(bbox.south, row, tile_size);
                let in_tile: Vec<&Located<'_>> = located
                    .iter()
                    .filter(|way| way.touches(left, bottom, tile_size))
                    .collect();
                trace!(
                    "tile {left:.7},{bottom:.7}: {} ways",
                    in_tile.len()
                );
                for pair in tile_pairs(&in_tile) {
                    if seen.insert(pair.key()) {
                        report.pairs.push(pair);
                    }
                }
                report.tiles += 1;
            }
        }
        debug!(
            "swept {} tiles, found {} duplicate pairs",
            report.tiles,
            report.pairs.len()
        );
        Ok(report)
    }
}

/// Resolve node coordinates for every way. Requires sorted nodes.
fn locate_ways(dataset: &Dataset) -> Vec<Located<'_>> {
    dataset
        .ways
        .iter()
        .map(|way| {
            let coords = way
                .nodes
                .iter()
                .filter_map(|id| {
                    let node = dataset.node(*id);
                    if node.is_none() {
                        warn!("node {id} missing, referenced by way {}", way.id);
                    }
                    node.map(|found| found.location)
                })
                .collect();
            Located { way, coords }
        })
        .collect()
}

/// Duplicate pairs among the ways of one tile, first match per pair.
fn tile_pairs<'a>(ways: &'a [&'a Located<'a>]) -> impl Iterator<Item = DuplicatePair> + 'a {
    ways.iter().enumerate().flat_map(move |(index, left)| {
        ways.iter()
            .skip(index + 1)
            .filter(move |right| shares_edge(&left.way.nodes, &right.way.nodes))
            .map(move |right| DuplicatePair {
                first: left.way.id,
                second: right.way.id,
            })
    })
}

/// Whether `a` and `b` share a node at interior positions of both whose
/// predecessor or successor is shared too.
///
/// # Examples
/// ```
/// use osmx_core::shares_edge;
///
/// assert!(shares_edge(&[1, 2, 3], &[4, 2, 3]));
/// assert!(shares_edge(&[1, 2, 3], &[3, 2, 4]));
/// assert!(!shares_edge(&[1, 2, 3], &[6, 2, 5]));
/// ```
#[must_use]
pub fn shares_edge(a: &[u64], b: &[u64]) -> bool {
    a.windows(3).any(|left| {
        b.windows(3).any(|right| match (left, right) {
            ([lp, lc, ln], [rp, rc, rn]) => {
                lc == rc && (lp == rp || lp == rn || ln == rp || ln == rn)
            }
            _ => false,
        })
    })
}
