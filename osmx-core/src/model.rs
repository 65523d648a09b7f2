//! Entity records and the [`Dataset`] aggregate.
//!
//! Coordinates are WGS84 with `x = longitude` and `y = latitude`. Optional
//! metadata follows the OpenStreetMap convention of "zero or empty means
//! unset" rather than wrapping every field in an `Option`.

use geo::Coord;

/// Kind of an OpenStreetMap entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EntityKind {
    /// A point with coordinates.
    Node,
    /// An ordered path of node references.
    Way,
    /// A grouping of members.
    Relation,
}

impl EntityKind {
    /// Name used by the OSM XML format for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value annotation attached to an entity.
///
/// An empty key counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value; empty when the source omitted it.
    pub value: String,
}

impl Tag {
    /// Build a tag from anything convertible into strings.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::Tag;
    ///
    /// let tag = Tag::new("highway", "residential");
    /// assert!(tag.has_key());
    /// assert_eq!(tag.value, "residential");
    /// ```
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Whether the key is present, i.e. non-empty.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }
}

/// Edit metadata shared by all entity kinds.
///
/// Zero numbers and the empty user name mean "unset".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Contributor name.
    pub user: String,
    /// Contributor id.
    pub uid: u32,
    /// Entity version.
    pub version: u32,
    /// Changeset that produced this version.
    pub changeset: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl Metadata {
    /// Whether every field is unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
            && self.uid == 0
            && self.version == 0
            && self.changeset == 0
            && self.timestamp == 0
    }
}

/// A point entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    /// Identifier, unique among nodes and never zero.
    pub id: u64,
    /// Position with `x = longitude`, `y = latitude`.
    pub location: Coord<f64>,
    /// Edit metadata.
    pub meta: Metadata,
    /// Ordered tags.
    pub tags: Vec<Tag>,
}

impl Node {
    /// Construct an untagged node without metadata.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::Node;
    ///
    /// let node = Node::new(7, 13.4, 52.5);
    /// assert_eq!(node.lon(), 13.4);
    /// assert_eq!(node.lat(), 52.5);
    /// ```
    #[must_use]
    pub fn new(id: u64, lon: f64, lat: f64) -> Self {
        Self {
            id,
            location: Coord { x: lon, y: lat },
            meta: Metadata::default(),
            tags: Vec::new(),
        }
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(&self) -> f64 {
        self.location.x
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.location.y
    }
}

/// An ordered path over nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Way {
    /// Identifier, unique among ways and never zero.
    pub id: u64,
    /// Edit metadata.
    pub meta: Metadata,
    /// Referenced node ids in path order; never contains zero.
    pub nodes: Vec<u64>,
    /// Ordered tags.
    pub tags: Vec<Tag>,
}

impl Way {
    /// Construct an untagged way over `nodes`.
    #[must_use]
    pub fn new(id: u64, nodes: Vec<u64>) -> Self {
        Self {
            id,
            meta: Metadata::default(),
            nodes,
            tags: Vec::new(),
        }
    }
}

/// Target kind of a relation member.
///
/// `Unknown` covers member types the source did not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MemberKind {
    /// The source did not name a recognised member type.
    #[default]
    Unknown,
    /// Node member.
    Node,
    /// Way member.
    Way,
    /// Relation member.
    Relation,
}

impl MemberKind {
    /// Name used by the OSM XML format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Parse the OSM XML member type; unrecognised names map to `Unknown`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "node" => Self::Node,
            "way" => Self::Way,
            "relation" => Self::Relation,
            _ => Self::Unknown,
        }
    }
}

/// A reference from a relation to another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
    /// Kind of the referenced entity.
    pub kind: MemberKind,
    /// Id of the referenced entity.
    pub id: u64,
    /// Role of the member inside the relation; may be empty.
    pub role: String,
}

impl Member {
    /// Build a member reference.
    pub fn new(kind: MemberKind, id: u64, role: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            role: role.into(),
        }
    }
}

/// A named grouping of other entities.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Relation {
    /// Identifier, unique among relations and never zero.
    pub id: u64,
    /// Edit metadata.
    pub meta: Metadata,
    /// Ordered members.
    pub members: Vec<Member>,
    /// Ordered tags.
    pub tags: Vec<Tag>,
}

impl Relation {
    /// Construct an untagged relation with `members`.
    #[must_use]
    pub fn new(id: u64, members: Vec<Member>) -> Self {
        Self {
            id,
            meta: Metadata::default(),
            members,
            tags: Vec::new(),
        }
    }
}

/// Common read access used by filters and writers.
pub trait Entity {
    /// Entity kind.
    const KIND: EntityKind;

    /// Entity id.
    fn id(&self) -> u64;

    /// Edit metadata.
    fn meta(&self) -> &Metadata;

    /// Ordered tags.
    fn tags(&self) -> &[Tag];

    /// Value of the first tag named `key`, if any.
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags()
            .iter()
            .find(|tag| tag.has_key() && tag.key == key)
            .map(|tag| tag.value.as_str())
    }
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            fn id(&self) -> u64 {
                self.id
            }

            fn meta(&self) -> &Metadata {
                &self.meta
            }

            fn tags(&self) -> &[Tag] {
                &self.tags
            }
        }
    };
}

impl_entity!(Node, EntityKind::Node);
impl_entity!(Way, EntityKind::Way);
impl_entity!(Relation, EntityKind::Relation);

/// Result of an extraction: three owned entity collections.
///
/// Collections keep file order unless [`Dataset::sort_nodes`] was called.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dataset {
    /// Kept nodes.
    pub nodes: Vec<Node>,
    /// Kept ways.
    pub ways: Vec<Way>,
    /// Kept relations.
    pub relations: Vec<Relation>,
}

impl Dataset {
    /// Whether all three collections are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }

    /// Sort the node collection by id so [`Dataset::node`] can binary search.
    pub fn sort_nodes(&mut self) {
        self.nodes.sort_unstable_by_key(|node| node.id);
    }

    /// Look up a node by id.
    ///
    /// Requires the node collection to be sorted by id; see
    /// [`Dataset::sort_nodes`].
    ///
    /// # Examples
    /// ```
    /// use osmx_core::{Dataset, Node};
    ///
    /// let mut dataset = Dataset {
    ///     nodes: vec![Node::new(9, 0.0, 0.0), Node::new(3, 1.0, 1.0)],
    ///     ..Dataset::default()
    /// };
    /// dataset.sort_nodes();
    /// assert_eq!(dataset.node(3).map(|n| n.lon()), Some(1.0));
    /// assert!(dataset.node(4).is_none());
    /// ```
    #[must_use]
    pub fn node(&self, id: u64) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .and_then(|pos| self.nodes.get(pos))
    }
}
