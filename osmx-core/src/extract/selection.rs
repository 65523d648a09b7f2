//! Command-line style selection criteria and their precedence.

use super::{ExtractConfig, ExtractError, Mode};
use crate::{BoundingBox, Criterion, EntityKind, Filters};

/// Loose selection criteria as collected from a command line.
///
/// At most one criterion drives the extraction. Precedence, highest first:
/// bounding box (narrowed by tag, then user, then "has tags"), relation id,
/// way id, node id, user, tag, "has tags".
///
/// # Examples
/// ```
/// use osmx_core::{EntityKind, Mode, Selection};
///
/// let selection = Selection {
///     way: Some(7),
///     node: Some(3),
///     ..Selection::default()
/// };
/// let config = selection.into_config()?;
/// assert_eq!(config.mode, Mode::ById(EntityKind::Way, 7));
/// # Ok::<(), osmx_core::ExtractError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Restrict to a bounding box.
    pub bbox: Option<BoundingBox>,
    /// Relation id.
    pub relation: Option<u64>,
    /// Way id.
    pub way: Option<u64>,
    /// Node id.
    pub node: Option<u64>,
    /// Contributor name.
    pub user: Option<String>,
    /// Tag key.
    pub tag: Option<String>,
    /// Tag value; only meaningful together with `tag`.
    pub value: Option<String>,
    /// Select entities carrying any tag.
    pub tagged: bool,
}

impl Selection {
    /// Resolve the criteria into an [`ExtractConfig`].
    ///
    /// # Errors
    /// Returns [`ExtractError::NoSelection`] when no criterion is set.
    pub fn into_config(self) -> Result<ExtractConfig, ExtractError> {
        let criterion = self.criterion();
        if let Some(bbox) = self.bbox {
            let filters = criterion
                .as_ref()
                .map_or_else(Filters::none, Filters::from_criterion);
            return Ok(ExtractConfig::new(Mode::ByBoundingBox(bbox)).with_filters(filters));
        }
        let by_id = [
            (EntityKind::Relation, self.relation),
            (EntityKind::Way, self.way),
            (EntityKind::Node, self.node),
        ]
        .into_iter()
        .find_map(|(kind, id)| id.map(|value| Mode::ById(kind, value)));
        if let Some(mode) = by_id {
            return Ok(ExtractConfig::new(mode));
        }
        criterion
            .map(|found| {
                ExtractConfig::new(Mode::ByPredicate).with_filters(Filters::from_criterion(&found))
            })
            .ok_or(ExtractError::NoSelection)
    }

    /// Tag criterion first, then user, then "has tags".
    ///
    /// Inside a bounding box the tag wins over the user; outside one the
    /// user wins over the tag.
    fn criterion(&self) -> Option<Criterion> {
        let tag = self
            .tag
            .as_ref()
            .map(|key| Criterion::tag(key.clone(), self.value.clone()));
        let user = self.user.as_ref().map(|name| Criterion::user(name.clone()));
        let tagged = self.tagged.then_some(Criterion::HasTags);
        if self.bbox.is_some() {
            tag.or(user).or(tagged)
        } else {
            user.or(tag).or(tagged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, Tag};
    use rstest::rstest;

    #[rstest]
    fn empty_selection_is_rejected() {
        let err = Selection::default()
            .into_config()
            .expect_err("nothing selected");
        assert!(matches!(err, ExtractError::NoSelection));
    }

    #[rstest]
    fn relation_id_beats_way_and_node() {
        let config = Selection {
            relation: Some(1),
            way: Some(2),
            node: Some(3),
            user: Some("someone".into()),
            ..Selection::default()
        }
        .into_config()
        .expect("relation selected");
        assert_eq!(config.mode, Mode::ById(EntityKind::Relation, 1));
        assert!(config.filters.is_empty());
    }

    #[rstest]
    fn bbox_prefers_tag_over_user() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let config = Selection {
            bbox: Some(bbox),
            relation: Some(4),
            user: Some("mapper".into()),
            tag: Some("amenity".into()),
            ..Selection::default()
        }
        .into_config()
        .expect("bbox selected");
        assert_eq!(config.mode, Mode::ByBoundingBox(bbox));
        let mut node = Node::new(1, 0.5, 0.5);
        node.tags.push(Tag::new("amenity", "bench"));
        let node_filter = config.filters.node.as_ref().expect("node filter");
        assert!(node_filter.matches(&node));
    }

    #[rstest]
    fn user_beats_tag_without_bbox() {
        let config = Selection {
            user: Some("mapper".into()),
            tag: Some("amenity".into()),
            ..Selection::default()
        }
        .into_config()
        .expect("user selected");
        assert_eq!(config.mode, Mode::ByPredicate);
        let mut node = Node::new(1, 0.0, 0.0);
        node.tags.push(Tag::new("amenity", "bench"));
        let node_filter = config.filters.node.as_ref().expect("node filter");
        assert!(!node_filter.matches(&node));
        node.meta.user = "mapper".into();
        assert!(node_filter.matches(&node));
    }

    #[rstest]
    fn bbox_alone_has_no_filters() {
        let config = Selection {
            bbox: Some(BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
            ..Selection::default()
        }
        .into_config()
        .expect("bbox selected");
        assert!(config.filters.is_empty());
    }
}
