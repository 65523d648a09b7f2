//! OSM XML (API 0.6) output.

use std::fmt;
use std::io::Write;

use osmx_core::{Dataset, Entity, Metadata, Node, Relation, Tag, Way};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

use super::WriteError;
use crate::timestamp;

const FORMAT: &str = "OSM XML";

/// Streaming OSM XML writer.
///
/// Call [`OsmXmlWriter::header`] once, then the entity writers in node, way,
/// relation order, then [`OsmXmlWriter::footer`] and [`OsmXmlWriter::finish`].
///
/// # Examples
/// ```
/// use osmx_core::Node;
/// use osmx_data::OsmXmlWriter;
///
/// let mut writer = OsmXmlWriter::new(Vec::new());
/// writer.header("demo").unwrap();
/// writer.node(&Node::new(1, 13.4, 52.5)).unwrap();
/// writer.footer().unwrap();
/// let xml = String::from_utf8(writer.finish().unwrap()).unwrap();
/// assert!(xml.contains(r#"<node id="1" lon="13.4000000" lat="52.5000000"/>"#));
/// ```
pub struct OsmXmlWriter<W> {
    xml: Writer<W>,
}

impl<W> fmt::Debug for OsmXmlWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OsmXmlWriter").finish_non_exhaustive()
    }
}

impl<W: Write> OsmXmlWriter<W> {
    /// Wrap an output sink; nested elements are indented by one space.
    pub fn new(out: W) -> Self {
        Self {
            xml: Writer::new_with_indent(out, b' ', 1),
        }
    }

    /// Write the XML declaration and the opening `osm` element.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn header(&mut self, generator: &str) -> Result<(), WriteError> {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut osm = BytesStart::new("osm");
        osm.push_attribute(("version", "0.6"));
        osm.push_attribute(("generator", generator));
        self.emit(Event::Start(osm))
    }

    /// Write one node.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn node(&mut self, node: &Node) -> Result<(), WriteError> {
        let mut start = element(node);
        start.push_attribute(("lon", format!("{:.7}", node.lon()).as_str()));
        start.push_attribute(("lat", format!("{:.7}", node.lat()).as_str()));
        self.entity(node, start, |_| Ok(()))
    }

    /// Write one way with its node references.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn way(&mut self, way: &Way) -> Result<(), WriteError> {
        self.entity(way, element(way), |xml| {
            way.nodes.iter().try_for_each(|id| {
                let mut nd = BytesStart::new("nd");
                nd.push_attribute(("ref", id.to_string().as_str()));
                xml.write_event(Event::Empty(nd))
            })
        })
    }

    /// Write one relation with its members.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn relation(&mut self, relation: &Relation) -> Result<(), WriteError> {
        self.entity(relation, element(relation), |xml| {
            relation.members.iter().try_for_each(|member| {
                let mut start = BytesStart::new("member");
                start.push_attribute(("type", member.kind.as_str()));
                start.push_attribute(("ref", member.id.to_string().as_str()));
                start.push_attribute(("role", member.role.as_str()));
                xml.write_event(Event::Empty(start))
            })
        })
    }

    /// Write every entity of `dataset` between a header and the footer.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn write_dataset(&mut self, dataset: &Dataset, generator: &str) -> Result<(), WriteError> {
        self.header(generator)?;
        dataset.nodes.iter().try_for_each(|node| self.node(node))?;
        dataset.ways.iter().try_for_each(|way| self.way(way))?;
        dataset
            .relations
            .iter()
            .try_for_each(|relation| self.relation(relation))?;
        self.footer()
    }

    /// Close the `osm` element and end the document with a newline.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn footer(&mut self) -> Result<(), WriteError> {
        self.emit(Event::End(BytesEnd::new("osm")))?;
        self.xml
            .get_mut()
            .write_all(b"\n")
            .map_err(WriteError::io(FORMAT))
    }

    /// Flush and return the sink.
    ///
    /// # Errors
    /// Propagates flush failures.
    pub fn finish(self) -> Result<W, WriteError> {
        let mut out = self.xml.into_inner();
        out.flush().map_err(WriteError::io(FORMAT))?;
        Ok(out)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), WriteError> {
        self.xml.write_event(event).map_err(WriteError::xml(FORMAT))
    }

    /// Shared element layout: `start` with metadata, `children` (refs or
    /// members), tags, closing tag. Self-closing when nothing is nested.
    fn entity<E, F>(
        &mut self,
        entity: &E,
        mut start: BytesStart<'_>,
        children: F,
    ) -> Result<(), WriteError>
    where
        E: Entity + Named,
        F: FnOnce(&mut Writer<W>) -> quick_xml::Result<()>,
    {
        push_meta(&mut start, entity.meta());
        if !E::has_children(entity) && entity.tags().is_empty() {
            return self.emit(Event::Empty(start));
        }
        self.emit(Event::Start(start))?;
        children(&mut self.xml).map_err(WriteError::xml(FORMAT))?;
        write_tags(&mut self.xml, entity.tags()).map_err(WriteError::xml(FORMAT))?;
        self.emit(Event::End(BytesEnd::new(E::ELEMENT)))
    }
}

/// Element name and nested-reference check per entity kind.
trait Named {
    const ELEMENT: &'static str;

    fn has_children(&self) -> bool;
}

impl Named for Node {
    const ELEMENT: &'static str = "node";

    fn has_children(&self) -> bool {
        false
    }
}

impl Named for Way {
    const ELEMENT: &'static str = "way";

    fn has_children(&self) -> bool {
        !self.nodes.is_empty()
    }
}

impl Named for Relation {
    const ELEMENT: &'static str = "relation";

    fn has_children(&self) -> bool {
        !self.members.is_empty()
    }
}

/// Opening tag carrying the entity id as its first attribute.
fn element<E: Entity + Named>(entity: &E) -> BytesStart<'static> {
    let mut start = BytesStart::new(E::ELEMENT);
    start.push_attribute(("id", entity.id().to_string().as_str()));
    start
}

fn push_meta(start: &mut BytesStart<'_>, meta: &Metadata) {
    if meta.version != 0 {
        start.push_attribute(("version", meta.version.to_string().as_str()));
    }
    if !meta.user.is_empty() {
        start.push_attribute(("user", meta.user.as_str()));
    }
    if meta.uid != 0 {
        start.push_attribute(("uid", meta.uid.to_string().as_str()));
    }
    if meta.changeset != 0 {
        start.push_attribute(("changeset", meta.changeset.to_string().as_str()));
    }
    if meta.timestamp != 0 {
        if let Some(text) = timestamp::format(meta.timestamp) {
            start.push_attribute(("timestamp", text.as_str()));
        }
    }
}

fn write_tags<W: Write>(xml: &mut Writer<W>, tags: &[Tag]) -> quick_xml::Result<()> {
    tags.iter().try_for_each(|tag| {
        let mut start = BytesStart::new("tag");
        start.push_attribute(("k", tag.key.as_str()));
        start.push_attribute(("v", tag.value.as_str()));
        xml.write_event(Event::Empty(start))
    })
}
