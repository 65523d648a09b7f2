//! Streaming OSM XML backend.
//!
//! The first stream request scans the document once and records the byte
//! offset of the first `node`, `way` and `relation` element. Each stream then
//! seeks to its offset and decodes entities until it meets an entity element
//! of another kind, the closing `</osm>` or the end of input.

use std::io::{BufRead, Seek, SeekFrom};
use std::marker::PhantomData;

use log::{debug, warn};
use osmx_core::{
    Backend, BackendError, EntityKind, EntityStream, Node, ReadError, Relation, Way,
};
use quick_xml::Reader;
use quick_xml::events::Event;

mod element;

use element::{FromXml, RawElement, is_entity};

/// Byte offsets of the first element of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Sections {
    node: Option<u64>,
    way: Option<u64>,
    relation: Option<u64>,
}

impl Sections {
    const fn offset(&self, kind: EntityKind) -> Option<u64> {
        match kind {
            EntityKind::Node => self.node,
            EntityKind::Way => self.way,
            EntityKind::Relation => self.relation,
        }
    }

    const fn is_complete(&self) -> bool {
        self.node.is_some() && self.way.is_some() && self.relation.is_some()
    }

    fn record(&mut self, name: &[u8], position: u64) {
        let slot = match name {
            b"node" => &mut self.node,
            b"way" => &mut self.way,
            b"relation" => &mut self.relation,
            _ => return,
        };
        slot.get_or_insert(position);
    }
}

/// [`Backend`] over a seekable OSM XML document.
///
/// # Examples
/// ```
/// use std::io::Cursor;
/// use osmx_core::Backend;
/// use osmx_data::XmlBackend;
///
/// let xml = r#"<osm version="0.6"><node id="1" lat="1.0" lon="2.0"/></osm>"#;
/// let mut backend = XmlBackend::new(Cursor::new(xml));
/// let nodes: Vec<_> = backend.nodes().unwrap().collect();
/// assert_eq!(nodes.len(), 1);
/// assert_eq!(backend.ways().unwrap().count(), 0);
/// ```
#[derive(Debug)]
pub struct XmlBackend<R> {
    input: R,
    sections: Option<Sections>,
}

impl<R: BufRead + Seek> XmlBackend<R> {
    /// Wrap a buffered, seekable reader positioned anywhere.
    pub const fn new(input: R) -> Self {
        Self {
            input,
            sections: None,
        }
    }

    fn sections(&mut self, kind: EntityKind) -> Result<Sections, BackendError> {
        if let Some(found) = self.sections {
            return Ok(found);
        }
        let found = self.scan_sections().map_err(|source| BackendError::Section {
            kind,
            source: Box::new(source),
        })?;
        debug!("XML sections: {found:?}");
        self.sections = Some(found);
        Ok(found)
    }

    fn scan_sections(&mut self) -> Result<Sections, quick_xml::Error> {
        self.input.seek(SeekFrom::Start(0))?;
        let mut reader = Reader::from_reader(&mut self.input);
        reader.trim_text(true);
        reader.check_end_names(false);
        let mut sections = Sections::default();
        let mut depth = 0_usize;
        let mut buf = Vec::new();
        loop {
            let position = position_of(&reader, 0);
            buf.clear();
            let event = match reader.read_event_into(&mut buf) {
                Ok(event) => event,
                Err(err) if sections != Sections::default() => {
                    warn!("section scan stopped at byte {position}: {err}");
                    break;
                }
                Err(err) => return Err(err),
            };
            match event {
                Event::Start(start) => {
                    if depth == 1 {
                        sections.record(start.name().as_ref(), position);
                    }
                    depth += 1;
                }
                Event::Empty(empty) if depth == 1 => {
                    sections.record(empty.name().as_ref(), position);
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
            if sections.is_complete() {
                break;
            }
        }
        Ok(sections)
    }

    fn stream<T: FromXml + 'static>(&mut self) -> Result<EntityStream<'_, T>, BackendError> {
        let Some(offset) = self.sections(T::KIND)?.offset(T::KIND) else {
            return Ok(Box::new(std::iter::empty()));
        };
        self.input
            .seek(SeekFrom::Start(offset))
            .map_err(|source| BackendError::Restart {
                kind: T::KIND,
                source,
            })?;
        let mut reader = Reader::from_reader(&mut self.input);
        reader.trim_text(true);
        reader.check_end_names(false);
        Ok(Box::new(XmlStream {
            reader,
            base: offset,
            buf: Vec::new(),
            children: Vec::new(),
            done: false,
            kind: PhantomData::<T>,
        }))
    }
}

impl<R: BufRead + Seek> Backend for XmlBackend<R> {
    fn relations(&mut self) -> Result<EntityStream<'_, Relation>, BackendError> {
        self.stream()
    }

    fn ways(&mut self) -> Result<EntityStream<'_, Way>, BackendError> {
        self.stream()
    }

    fn nodes(&mut self) -> Result<EntityStream<'_, Node>, BackendError> {
        self.stream()
    }
}

fn position_of<R>(reader: &Reader<R>, base: u64) -> u64 {
    base.saturating_add(u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX))
}

fn decode_error(kind: EntityKind, err: quick_xml::Error) -> ReadError {
    ReadError::Decode {
        kind,
        source: Box::new(err),
    }
}

/// Lazy decoder for one section.
struct XmlStream<'a, R, T> {
    reader: Reader<&'a mut R>,
    base: u64,
    buf: Vec<u8>,
    children: Vec<u8>,
    done: bool,
    kind: PhantomData<T>,
}

impl<R: BufRead, T: FromXml> XmlStream<'_, R, T> {
    /// Consume child events up to the entity's closing tag.
    fn read_children(&mut self, raw: &mut RawElement) -> Result<(), quick_xml::Error> {
        let mut depth = 0_usize;
        loop {
            self.children.clear();
            match self.reader.read_event_into(&mut self.children)? {
                Event::Empty(child) if depth == 0 => raw.add_child(&child),
                Event::Start(child) => {
                    if depth == 0 {
                        raw.add_child(&child);
                    }
                    depth += 1;
                }
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => return Ok(()),
                _ => {}
            }
        }
    }

    fn next_entity(&mut self) -> Option<Result<T, ReadError>> {
        loop {
            let position = position_of(&self.reader, self.base);
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => return Some(Err(decode_error(T::KIND, err))),
            };
            let (start, has_children) = match event {
                Event::Start(start) => (start.into_owned(), true),
                Event::Empty(empty) => (empty.into_owned(), false),
                Event::End(_) | Event::Eof => return None,
                _ => continue,
            };
            let name = start.name();
            if name.as_ref() != T::TAG {
                if is_entity(name.as_ref()) {
                    return None;
                }
                if has_children {
                    let end = start.to_end().into_owned();
                    if let Err(err) = self.reader.read_to_end_into(end.name(), &mut self.children) {
                        return Some(Err(decode_error(T::KIND, err)));
                    }
                }
                continue;
            }
            let mut raw = RawElement::from_start(&start);
            if has_children {
                if let Err(err) = self.read_children(&mut raw) {
                    return Some(Err(decode_error(T::KIND, err)));
                }
            }
            return Some(T::from_raw(raw, position));
        }
    }
}

impl<R: BufRead, T: FromXml> Iterator for XmlStream<'_, R, T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_entity();
        self.done = match &item {
            None => true,
            Some(Err(err)) => !err.is_recoverable(),
            Some(Ok(_)) => false,
        };
        item
    }
}
