//! Fixtures shared by the behaviour tests of the workspace crates.

use crate::{Dataset, Member, MemberKind, Metadata, Node, Relation, Tag, Way};

/// A small, closed dataset exercising every field the writers emit.
///
/// Relation 900 groups way 100 and node 3. Way 100 runs over nodes 1, 2
/// and 3; node 4 is unreferenced and tagged with a name and elevation.
#[must_use]
pub fn sample_dataset() -> Dataset {
    let meta = Metadata {
        user: "mapper & co".into(),
        uid: 42,
        version: 3,
        changeset: 7001,
        timestamp: 1_262_304_000,
    };
    let mut way = Way::new(100, vec![1, 2, 3]);
    way.meta = meta.clone();
    way.tags = vec![
        Tag::new("highway", "footway"),
        Tag::new("name", "Riverside <path>"),
    ];
    let mut relation = Relation::new(
        900,
        vec![
            Member::new(MemberKind::Way, 100, "outer"),
            Member::new(MemberKind::Node, 3, ""),
        ],
    );
    relation.meta = meta.clone();
    relation.tags = vec![Tag::new("type", "route")];
    let mut summit = Node::new(4, 13.404_954_1, 52.520_006_6);
    summit.meta = meta;
    summit.tags = vec![
        Tag::new("name", "Summit"),
        Tag::new("ele", "120"),
        Tag::new("url", "https://example.org/summit"),
        Tag::new("natural", "peak"),
    ];
    Dataset {
        nodes: vec![
            Node::new(1, 13.377_704_1, 52.516_274_9),
            Node::new(2, 13.381_000_0, 52.517_000_0),
            Node::new(3, -0.127_758_3, 51.507_350_9),
            summit,
        ],
        ways: vec![way],
        relations: vec![relation],
    }
}

/// References in `dataset` whose target entity is absent.
///
/// Relation members of kind relation or unknown are not checked.
#[must_use]
pub fn dangling_references(dataset: &Dataset) -> Vec<(MemberKind, u64)> {
    let has_node = |id: u64| dataset.nodes.iter().any(|node| node.id == id);
    let has_way = |id: u64| dataset.ways.iter().any(|way| way.id == id);
    let from_ways = dataset
        .ways
        .iter()
        .flat_map(|way| way.nodes.iter().copied())
        .filter(|id| !has_node(*id))
        .map(|id| (MemberKind::Node, id));
    let from_relations = dataset
        .relations
        .iter()
        .flat_map(|relation| relation.members.iter())
        .filter(|member| match member.kind {
            MemberKind::Node => !has_node(member.id),
            MemberKind::Way => !has_way(member.id),
            MemberKind::Relation | MemberKind::Unknown => false,
        })
        .map(|member| (member.kind, member.id));
    from_ways.chain(from_relations).collect()
}
