//! Conversion from `osmpbf` elements to model entities.

use std::collections::VecDeque;

use osmpbf::{DenseNode, Info, PrimitiveBlock, RelMemberType};
use osmx_core::{EntityKind, Member, MemberKind, Metadata, Node, ReadError, Relation, Tag, Way};

/// An entity kind that can be pulled out of a primitive block.
pub(super) trait FromPbf: Sized {
    /// Entity kind.
    const KIND: EntityKind;

    /// Append every entity of this kind in `block` to `out`, in block order.
    fn collect(block: &PrimitiveBlock, position: u64, out: &mut VecDeque<Result<Self, ReadError>>);
}

impl FromPbf for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn collect(block: &PrimitiveBlock, position: u64, out: &mut VecDeque<Result<Self, ReadError>>) {
        for group in block.groups() {
            out.extend(group.nodes().map(|node| {
                let id = entity_id(Self::KIND, node.id(), position)?;
                let mut converted = Self::new(id, node.lon(), node.lat());
                converted.meta = info_meta(&node.info());
                converted.tags = tags(node.tags());
                Ok(converted)
            }));
            out.extend(group.dense_nodes().map(|node| dense_node(&node, position)));
        }
    }
}

impl FromPbf for Way {
    const KIND: EntityKind = EntityKind::Way;

    fn collect(block: &PrimitiveBlock, position: u64, out: &mut VecDeque<Result<Self, ReadError>>) {
        for group in block.groups() {
            out.extend(group.ways().map(|way| {
                let id = entity_id(Self::KIND, way.id(), position)?;
                let refs = way
                    .refs()
                    .filter_map(|node| u64::try_from(node).ok().filter(|node| *node != 0))
                    .collect();
                let mut converted = Self::new(id, refs);
                converted.meta = info_meta(&way.info());
                converted.tags = tags(way.tags());
                Ok(converted)
            }));
        }
    }
}

impl FromPbf for Relation {
    const KIND: EntityKind = EntityKind::Relation;

    fn collect(block: &PrimitiveBlock, position: u64, out: &mut VecDeque<Result<Self, ReadError>>) {
        for group in block.groups() {
            out.extend(group.relations().map(|relation| {
                let id = entity_id(Self::KIND, relation.id(), position)?;
                let members = relation
                    .members()
                    .filter_map(|member| {
                        let target = u64::try_from(member.member_id).ok().filter(|id| *id != 0)?;
                        let role = member.role().unwrap_or_default();
                        Some(Member::new(member_kind(member.member_type), target, role))
                    })
                    .collect();
                let mut converted = Self::new(id, members);
                converted.meta = info_meta(&relation.info());
                converted.tags = tags(relation.tags());
                Ok(converted)
            }));
        }
    }
}

fn dense_node(node: &DenseNode<'_>, position: u64) -> Result<Node, ReadError> {
    let id = entity_id(EntityKind::Node, node.id(), position)?;
    let mut converted = Node::new(id, node.lon(), node.lat());
    if let Some(info) = node.info() {
        converted.meta = Metadata {
            user: info.user().map(str::to_owned).unwrap_or_default(),
            uid: u32::try_from(info.uid()).unwrap_or_default(),
            version: u32::try_from(info.version()).unwrap_or_default(),
            changeset: u64::try_from(info.changeset()).unwrap_or_default(),
            timestamp: info.milli_timestamp().div_euclid(1000),
        };
    }
    converted.tags = tags(node.tags());
    Ok(converted)
}

fn entity_id(kind: EntityKind, raw: i64, position: u64) -> Result<u64, ReadError> {
    u64::try_from(raw)
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| ReadError::malformed(kind, position, format!("invalid id {raw}")))
}

fn info_meta(info: &Info<'_>) -> Metadata {
    Metadata {
        user: info
            .user()
            .and_then(Result::ok)
            .map(str::to_owned)
            .unwrap_or_default(),
        uid: info.uid().and_then(|uid| u32::try_from(uid).ok()).unwrap_or_default(),
        version: info
            .version()
            .and_then(|version| u32::try_from(version).ok())
            .unwrap_or_default(),
        changeset: info
            .changeset()
            .and_then(|changeset| u64::try_from(changeset).ok())
            .unwrap_or_default(),
        timestamp: info
            .milli_timestamp()
            .map_or(0, |millis| millis.div_euclid(1000)),
    }
}

fn tags<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<Tag> {
    pairs
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| Tag::new(key, value))
        .collect()
}

const fn member_kind(kind: RelMemberType) -> MemberKind {
    match kind {
        RelMemberType::Node => MemberKind::Node,
        RelMemberType::Way => MemberKind::Way,
        RelMemberType::Relation => MemberKind::Relation,
    }
}
