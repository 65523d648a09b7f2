//! Attribute and child-element decoding for OSM XML entities.

use std::str;

use log::debug;
use osmx_core::{EntityKind, Member, MemberKind, Metadata, Node, ReadError, Relation, Tag, Way};
use quick_xml::events::BytesStart;
use quick_xml::events::attributes::Attribute;

use crate::timestamp;

/// Fields gathered from one entity element and its children.
#[derive(Debug, Default)]
pub(crate) struct RawElement {
    id: Option<u64>,
    lat: Option<f64>,
    lon: Option<f64>,
    meta: Metadata,
    tags: Vec<Tag>,
    refs: Vec<u64>,
    members: Vec<Member>,
    defect: Option<String>,
}

impl RawElement {
    /// Read the attributes of the entity element itself.
    pub(crate) fn from_start(start: &BytesStart<'_>) -> Self {
        let mut raw = Self::default();
        for attribute in start.attributes() {
            match attribute {
                Ok(attr) => raw.apply_attribute(&attr),
                Err(err) => raw.flag(format!("bad attribute: {err}")),
            }
        }
        raw
    }

    fn apply_attribute(&mut self, attr: &Attribute<'_>) {
        let Some(value) = attribute_text(attr) else {
            self.flag("undecodable attribute value");
            return;
        };
        match attr.key.as_ref() {
            b"id" => match value.parse::<u64>() {
                Ok(id) if id != 0 => self.id = Some(id),
                _ => self.flag(format!("invalid id {value:?}")),
            },
            b"lat" => self.lat = parse_coordinate(&value),
            b"lon" => self.lon = parse_coordinate(&value),
            b"user" => self.meta.user = value,
            b"uid" => self.meta.uid = value.parse().unwrap_or_default(),
            b"version" => self.meta.version = value.parse().unwrap_or_default(),
            b"changeset" => self.meta.changeset = value.parse().unwrap_or_default(),
            b"timestamp" => {
                self.meta.timestamp = timestamp::parse(&value).unwrap_or_else(|| {
                    debug!("ignoring unparsable timestamp {value:?}");
                    0
                });
            }
            _ => {}
        }
    }

    /// Fold a `tag`, `nd` or `member` child into the entity.
    pub(crate) fn add_child(&mut self, child: &BytesStart<'_>) {
        match child.name().as_ref() {
            b"tag" => {
                let key = find_attribute(child, b"k");
                let value = find_attribute(child, b"v").unwrap_or_default();
                match key {
                    Some(k) if !k.is_empty() => self.tags.push(Tag::new(k, value)),
                    _ => debug!("dropping tag without key"),
                }
            }
            b"nd" => {
                match find_attribute(child, b"ref").and_then(|text| text.parse::<u64>().ok()) {
                    Some(id) if id != 0 => self.refs.push(id),
                    _ => debug!("dropping node reference without a valid ref"),
                }
            }
            b"member" => {
                let kind = find_attribute(child, b"type")
                    .map_or(MemberKind::Unknown, |name| MemberKind::from_name(&name));
                let target = find_attribute(child, b"ref").and_then(|text| text.parse::<u64>().ok());
                let role = find_attribute(child, b"role").unwrap_or_default();
                match target {
                    Some(id) if id != 0 => self.members.push(Member::new(kind, id, role)),
                    _ => debug!("dropping member without a valid ref"),
                }
            }
            _ => {}
        }
    }

    fn flag(&mut self, reason: impl Into<String>) {
        if self.defect.is_none() {
            self.defect = Some(reason.into());
        }
    }

    fn check(&self, kind: EntityKind, position: u64) -> Result<u64, ReadError> {
        if let Some(reason) = &self.defect {
            return Err(ReadError::malformed(kind, position, reason.clone()));
        }
        self.id
            .ok_or_else(|| ReadError::malformed(kind, position, "missing id"))
    }
}

/// An entity that can be assembled from a [`RawElement`].
pub(crate) trait FromXml: Sized {
    /// Element name.
    const TAG: &'static [u8];
    /// Entity kind.
    const KIND: EntityKind;

    /// Validate required fields and build the entity.
    fn from_raw(raw: RawElement, position: u64) -> Result<Self, ReadError>;
}

impl FromXml for Node {
    const TAG: &'static [u8] = b"node";
    const KIND: EntityKind = EntityKind::Node;

    fn from_raw(raw: RawElement, position: u64) -> Result<Self, ReadError> {
        let id = raw.check(Self::KIND, position)?;
        let (Some(lon), Some(lat)) = (raw.lon, raw.lat) else {
            return Err(ReadError::malformed(
                Self::KIND,
                position,
                format!("node {id} lacks valid lat/lon"),
            ));
        };
        let mut node = Self::new(id, lon, lat);
        node.meta = raw.meta;
        node.tags = raw.tags;
        Ok(node)
    }
}

impl FromXml for Way {
    const TAG: &'static [u8] = b"way";
    const KIND: EntityKind = EntityKind::Way;

    fn from_raw(raw: RawElement, position: u64) -> Result<Self, ReadError> {
        let id = raw.check(Self::KIND, position)?;
        let mut way = Self::new(id, raw.refs);
        way.meta = raw.meta;
        way.tags = raw.tags;
        Ok(way)
    }
}

impl FromXml for Relation {
    const TAG: &'static [u8] = b"relation";
    const KIND: EntityKind = EntityKind::Relation;

    fn from_raw(raw: RawElement, position: u64) -> Result<Self, ReadError> {
        let id = raw.check(Self::KIND, position)?;
        let mut relation = Self::new(id, raw.members);
        relation.meta = raw.meta;
        relation.tags = raw.tags;
        Ok(relation)
    }
}

/// Whether `name` is one of the three entity element names.
pub(crate) fn is_entity(name: &[u8]) -> bool {
    matches!(name, b"node" | b"way" | b"relation")
}

fn attribute_text(attr: &Attribute<'_>) -> Option<String> {
    attr.unescape_value().ok().map(|text| text.into_owned())
}

fn find_attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attribute_text(&attr))
}

fn parse_coordinate(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn start(xml: &str) -> BytesStart<'_> {
        let body = xml
            .trim_start_matches('<')
            .trim_end_matches("/>")
            .trim_end_matches('>');
        let name_len = body.find(' ').unwrap_or(body.len());
        BytesStart::from_content(body, name_len)
    }

    #[rstest]
    fn decodes_node_attributes() {
        let raw = RawElement::from_start(&start(
            r#"<node id="5" lat="52.5" lon="13.4" user="a &amp; b" uid="9" version="2" changeset="77" timestamp="2010-01-01T00:00:00Z"/>"#,
        ));
        let node = Node::from_raw(raw, 0).expect("valid node");
        assert_eq!(node.id, 5);
        assert_eq!(node.lat(), 52.5);
        assert_eq!(node.meta.user, "a & b");
        assert_eq!(node.meta.uid, 9);
        assert_eq!(node.meta.changeset, 77);
        assert_eq!(node.meta.timestamp, 1_262_304_000);
    }

    #[rstest]
    #[case(r#"<node lat="1" lon="2"/>"#)]
    #[case(r#"<node id="0" lat="1" lon="2"/>"#)]
    #[case(r#"<node id="-3" lat="1" lon="2"/>"#)]
    #[case(r#"<node id="4" lon="2"/>"#)]
    #[case(r#"<node id="4" lat="north" lon="2"/>"#)]
    fn rejects_incomplete_nodes(#[case] xml: &str) {
        let raw = RawElement::from_start(&start(xml));
        let err = Node::from_raw(raw, 12).expect_err("node is malformed");
        assert!(err.is_recoverable());
    }

    #[rstest]
    fn children_drop_invalid_entries() {
        let mut raw = RawElement::from_start(&start(r#"<way id="8">"#));
        raw.add_child(&start(r#"<nd ref="1"/>"#));
        raw.add_child(&start(r#"<nd ref="0"/>"#));
        raw.add_child(&start(r#"<nd/>"#));
        raw.add_child(&start(r#"<tag v="orphan"/>"#));
        raw.add_child(&start(r#"<tag k="oneway"/>"#));
        let way = Way::from_raw(raw, 0).expect("valid way");
        assert_eq!(way.nodes, vec![1]);
        assert_eq!(way.tags, vec![Tag::new("oneway", "")]);
    }

    #[rstest]
    fn members_default_to_unknown_kind() {
        let mut raw = RawElement::from_start(&start(r#"<relation id="3">"#));
        raw.add_child(&start(r#"<member type="way" ref="10" role="outer"/>"#));
        raw.add_child(&start(r#"<member ref="11"/>"#));
        let relation = Relation::from_raw(raw, 0).expect("valid relation");
        assert_eq!(
            relation.members,
            vec![
                Member::new(MemberKind::Way, 10, "outer"),
                Member::new(MemberKind::Unknown, 11, ""),
            ]
        );
    }
}
