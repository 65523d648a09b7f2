//! Axis-aligned longitude/latitude rectangles.

use std::str::FromStr;

use geo::{Coord, Rect};
use thiserror::Error;

use crate::Node;

/// Rectangle in degrees, stored as west/south/east/north edges.
///
/// A box is valid when `west <= east` and `south <= north`. The inverted box
/// returned by [`BoundingBox::empty`] marks "no coordinates seen yet".
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// Western edge (minimum longitude).
    pub west: f64,
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
    /// Northern edge (maximum latitude).
    pub north: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// Build a box from its four edges. No validation is performed.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The canonical inverted box meaning "empty".
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(180.0, 90.0, -180.0, -90.0)
    }

    /// Minimal box covering every node, or [`BoundingBox::empty`] for none.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::{BoundingBox, Node};
    ///
    /// let nodes = [Node::new(1, 10.0, 20.0), Node::new(2, 12.0, 18.0)];
    /// let bbox = BoundingBox::from_nodes(&nodes);
    /// assert_eq!(bbox, BoundingBox::new(10.0, 18.0, 12.0, 20.0));
    /// assert!(!BoundingBox::from_nodes(&[]).is_valid());
    /// ```
    #[must_use]
    pub fn from_nodes(nodes: &[Node]) -> Self {
        nodes.iter().fold(Self::empty(), |mut bbox, node| {
            bbox.west = bbox.west.min(node.lon());
            bbox.east = bbox.east.max(node.lon());
            bbox.south = bbox.south.min(node.lat());
            bbox.north = bbox.north.max(node.lat());
            bbox
        })
    }

    /// Whether the edges describe a non-inverted rectangle.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.west <= self.east && self.south <= self.north
    }

    /// `(east - west) * (north - south)`; zero or negative for degenerate boxes.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "area is a plain product of spans")]
    pub fn area(&self) -> f64 {
        (self.east - self.west) * (self.north - self.south)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, location: Coord<f64>) -> bool {
        (self.west..=self.east).contains(&location.x)
            && (self.south..=self.north).contains(&location.y)
    }

    /// Convert into a `geo` rectangle; `None` for an invalid box.
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        self.is_valid().then(|| {
            Rect::new(
                Coord {
                    x: self.west,
                    y: self.south,
                },
                Coord {
                    x: self.east,
                    y: self.north,
                },
            )
        })
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Errors returned when parsing a `west,south,east,north` string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BBoxParseError {
    /// Fewer or more than four comma-separated values were supplied.
    #[error("expected 4 comma-separated values (west,south,east,north), found {found}")]
    WrongArity {
        /// Number of values found.
        found: usize,
    },
    /// One of the values is not a number.
    #[error("invalid bounding box value {value:?}")]
    InvalidNumber {
        /// Offending text.
        value: String,
    },
}

impl FromStr for BoundingBox {
    type Err = BBoxParseError;

    /// Parse `west,south,east,north`.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::BoundingBox;
    ///
    /// let bbox: BoundingBox = "13.3,52.4,13.5,52.6".parse().unwrap();
    /// assert_eq!(bbox.west, 13.3);
    /// assert!("1,2,3".parse::<BoundingBox>().is_err());
    /// ```
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        let [west, south, east, north] = parts.as_slice() else {
            return Err(BBoxParseError::WrongArity { found: parts.len() });
        };
        let parse = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| BBoxParseError::InvalidNumber {
                    value: value.to_owned(),
                })
        };
        Ok(Self::new(
            parse(west)?,
            parse(south)?,
            parse(east)?,
            parse(north)?,
        ))
    }
}
