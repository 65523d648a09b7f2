//! Per-kind entity predicates.
//!
//! A missing predicate means "accept everything" for the modes that consult
//! it; see [`crate::Mode`] for how `ById` modes cascade instead.

use std::fmt;

use crate::{Entity, Node, Relation, Way};

/// Boxed test applied to one entity kind.
pub struct Predicate<E> {
    test: Box<dyn Fn(&E) -> bool>,
}

impl<E> Predicate<E> {
    /// Wrap a closure.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::{Node, Predicate};
    ///
    /// let northern = Predicate::new(|node: &Node| node.lat() > 0.0);
    /// assert!(northern.matches(&Node::new(1, 0.0, 10.0)));
    /// ```
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&E) -> bool + 'static,
    {
        Self {
            test: Box::new(test),
        }
    }

    /// A predicate rejecting every entity.
    #[must_use]
    pub fn reject_all() -> Self {
        Self::new(|_| false)
    }

    /// Apply the predicate.
    pub fn matches(&self, entity: &E) -> bool {
        (self.test)(entity)
    }
}

impl<E: Entity> Predicate<E> {
    /// Build a predicate from a kind-independent [`Criterion`].
    #[must_use]
    pub fn from_criterion(criterion: Criterion) -> Self {
        Self::new(move |entity: &E| criterion.matches(entity))
    }
}

impl<E> fmt::Debug for Predicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").finish_non_exhaustive()
    }
}

/// Optional predicates for each phase of an extraction.
#[derive(Debug, Default)]
pub struct Filters {
    /// Node predicate.
    pub node: Option<Predicate<Node>>,
    /// Way predicate.
    pub way: Option<Predicate<Way>>,
    /// Relation predicate.
    pub relation: Option<Predicate<Relation>>,
}

impl Filters {
    /// No predicates at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Apply the same criterion to all three kinds.
    ///
    /// # Examples
    /// ```
    /// use osmx_core::{Criterion, Filters, Node, Way};
    ///
    /// let filters = Filters::from_criterion(&Criterion::user("alice"));
    /// let mut way = Way::new(1, vec![1, 2]);
    /// way.meta.user = "alice".into();
    /// assert!(filters.way.as_ref().is_some_and(|p| p.matches(&way)));
    /// assert!(!filters.node.as_ref().is_some_and(|p| p.matches(&Node::new(1, 0.0, 0.0))));
    /// ```
    #[must_use]
    pub fn from_criterion(criterion: &Criterion) -> Self {
        Self {
            node: Some(Predicate::from_criterion(criterion.clone())),
            way: Some(Predicate::from_criterion(criterion.clone())),
            relation: Some(Predicate::from_criterion(criterion.clone())),
        }
    }

    /// Whether no predicate is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.node.is_none() && self.way.is_none() && self.relation.is_none()
    }
}

/// Selection criteria understood by the command-line tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Entities last edited by the named contributor.
    User(String),
    /// Entities carrying a tag with `key`, optionally with exactly `value`.
    Tag {
        /// Required tag key.
        key: String,
        /// Required tag value, if any.
        value: Option<String>,
    },
    /// Entities carrying at least one tag.
    HasTags,
}

impl Criterion {
    /// Contributor criterion.
    pub fn user(name: impl Into<String>) -> Self {
        Self::User(name.into())
    }

    /// Tag criterion.
    pub fn tag(key: impl Into<String>, value: Option<String>) -> Self {
        Self::Tag {
            key: key.into(),
            value,
        }
    }

    /// Evaluate against any entity kind.
    ///
    /// Empty user names, keys and values never match.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Self::User(name) => {
                let user = &entity.meta().user;
                !user.is_empty() && user == name
            }
            Self::Tag {
                key,
                value: Some(value),
            } => entity.tags().iter().any(|tag| {
                tag.has_key() && !tag.value.is_empty() && &tag.key == key && &tag.value == value
            }),
            Self::Tag { key, value: None } => entity
                .tags()
                .iter()
                .any(|tag| tag.has_key() && &tag.key == key),
            Self::HasTags => !entity.tags().is_empty(),
        }
    }
}
