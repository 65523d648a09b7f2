//! GPX 1.1 output.
//!
//! Nodes that no way references become waypoints. Ways become track
//! segments whose points are the way's nodes in order; references to nodes
//! absent from the dataset are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;

use log::{trace, warn};
use osmx_core::{Dataset, Node, Tag, Way};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Result as XmlResult, Writer};

use super::WriteError;

const FORMAT: &str = "GPX";

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// OSM tag keys and the GPX elements they map to, in schema order.
const TAG_ELEMENTS: [(&str, &str); 4] = [
    ("ele", "ele"),
    ("name", "name"),
    ("description", "desc"),
    ("url", "link"),
];

/// GPX writer over any output sink.
pub struct GpxWriter<W> {
    xml: Writer<W>,
}

impl<W> fmt::Debug for GpxWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpxWriter").finish_non_exhaustive()
    }
}

impl<W: Write> GpxWriter<W> {
    /// Wrap an output sink; nested elements are indented by one space.
    pub fn new(out: W) -> Self {
        Self {
            xml: Writer::new_with_indent(out, b' ', 1),
        }
    }

    /// Write `dataset` as waypoints plus a single track.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn write_dataset(&mut self, dataset: &Dataset, creator: &str) -> Result<(), WriteError> {
        self.dataset(dataset, creator).map_err(WriteError::xml(FORMAT))
    }

    /// Write each of `ways` as its own track, resolving points in `dataset`.
    ///
    /// Used for duplicate-way reports, where every way is shown separately.
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn write_way_tracks(
        &mut self,
        dataset: &Dataset,
        ways: &[&Way],
        creator: &str,
    ) -> Result<(), WriteError> {
        self.tracks(dataset, ways, creator).map_err(WriteError::xml(FORMAT))
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

    fn dataset(&mut self, dataset: &Dataset, creator: &str) -> XmlResult<()> {
        let referenced: HashSet<u64> = dataset
            .ways
            .iter()
            .flat_map(|way| way.nodes.iter().copied())
            .collect();
        let lookup = index(dataset);
        self.header(creator)?;
        for node in dataset.nodes.iter().filter(|node| !referenced.contains(&node.id)) {
            trace!("node {} is a waypoint", node.id);
            self.point(node, "wpt")?;
        }
        if !dataset.ways.is_empty() {
            self.xml.write_event(Event::Start(BytesStart::new("trk")))?;
            for way in &dataset.ways {
                self.segment(way, &lookup)?;
            }
            self.xml.write_event(Event::End(BytesEnd::new("trk")))?;
        }
        self.footer()
    }

    fn tracks(&mut self, dataset: &Dataset, ways: &[&Way], creator: &str) -> XmlResult<()> {
        let lookup = index(dataset);
        self.header(creator)?;
        for way in ways {
            self.xml.write_event(Event::Start(BytesStart::new("trk")))?;
            self.segment(way, &lookup)?;
            self.xml.write_event(Event::End(BytesEnd::new("trk")))?;
        }
        self.footer()
    }

    fn header(&mut self, creator: &str) -> XmlResult<()> {
        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut gpx = BytesStart::new("gpx");
        gpx.push_attribute(("version", "1.1"));
        gpx.push_attribute(("creator", creator));
        gpx.push_attribute(("xmlns", GPX_NAMESPACE));
        self.xml.write_event(Event::Start(gpx))
    }

    fn footer(&mut self) -> XmlResult<()> {
        self.xml.write_event(Event::End(BytesEnd::new("gpx")))?;
        self.xml.get_mut().write_all(b"\n")?;
        Ok(())
    }

    /// Comment naming the OSM entity the next element came from.
    fn source_comment(&mut self, kind: &str, id: u64) -> XmlResult<()> {
        let text = format!(" {kind} id=\"{id}\" ");
        self.xml
            .write_event(Event::Comment(BytesText::from_escaped(text)))
    }

    fn segment(&mut self, way: &Way, lookup: &HashMap<u64, &Node>) -> XmlResult<()> {
        self.source_comment("way", way.id)?;
        self.xml.write_event(Event::Start(BytesStart::new("trkseg")))?;
        for id in &way.nodes {
            match lookup.get(id) {
                Some(node) => self.point(node, "trkpt")?,
                None => warn!("way {} references missing node {id}", way.id),
            }
        }
        self.xml.write_event(Event::End(BytesEnd::new("trkseg")))
    }

    fn point(&mut self, node: &Node, element: &str) -> XmlResult<()> {
        self.source_comment("node", node.id)?;
        let mut start = BytesStart::new(element);
        start.push_attribute(("lat", format!("{:.7}", node.lat()).as_str()));
        start.push_attribute(("lon", format!("{:.7}", node.lon()).as_str()));
        let mapped = mapped_tags(&node.tags);
        if mapped.is_empty() {
            return self.xml.write_event(Event::Empty(start));
        }
        self.xml.write_event(Event::Start(start))?;
        for (element_name, value) in mapped {
            if element_name == "link" {
                let mut link = BytesStart::new("link");
                link.push_attribute(("href", value));
                self.xml.write_event(Event::Empty(link))?;
            } else {
                self.xml
                    .write_event(Event::Start(BytesStart::new(element_name)))?;
                self.xml.write_event(Event::Text(BytesText::new(value)))?;
                self.xml.write_event(Event::End(BytesEnd::new(element_name)))?;
            }
        }
        self.xml.write_event(Event::End(BytesEnd::new(element)))
    }
}

fn index(dataset: &Dataset) -> HashMap<u64, &Node> {
    dataset.nodes.iter().map(|node| (node.id, node)).collect()
}

/// GPX child elements for `tags`, ordered as the schema requires.
fn mapped_tags(tags: &[Tag]) -> Vec<(&'static str, &str)> {
    TAG_ELEMENTS
        .iter()
        .flat_map(|(key, element)| {
            tags.iter()
                .filter(move |tag| tag.key == *key)
                .map(move |tag| (*element, tag.value.as_str()))
        })
        .collect()
}
