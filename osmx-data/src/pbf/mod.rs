//! OSM PBF backend built on `osmpbf`'s blob reader.
//!
//! The first pass over the file records the offset of the first data blob
//! holding each entity kind. Later passes seek straight to that blob, which
//! keeps the relation, way and node passes from re-decoding earlier sections.

use std::collections::VecDeque;
use std::io::{self, Read, Seek};
use std::marker::PhantomData;

use log::{debug, trace};
use osmpbf::{BlobDecode, BlobReader, ByteOffset, PrimitiveBlock};
use osmx_core::{Backend, BackendError, EntityKind, EntityStream, Node, ReadError, Relation, Way};

mod convert;

use convert::FromPbf;

/// Offsets of the first blob containing each kind.
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

    fn record(&mut self, block: &PrimitiveBlock, offset: u64) {
        for group in block.groups() {
            if group.nodes().next().is_some() || group.dense_nodes().next().is_some() {
                self.node.get_or_insert(offset);
            }
            if group.ways().next().is_some() {
                self.way.get_or_insert(offset);
            }
            if group.relations().next().is_some() {
                self.relation.get_or_insert(offset);
            }
        }
    }
}

/// [`Backend`] over a seekable OSM PBF file.
pub struct PbfBackend<R: Read + Seek + Send> {
    blobs: BlobReader<R>,
    sections: Option<Sections>,
}

impl<R: Read + Seek + Send> std::fmt::Debug for PbfBackend<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PbfBackend")
            .field("sections", &self.sections)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek + Send> PbfBackend<R> {
    /// Wrap a seekable reader positioned at the start of a PBF file.
    ///
    /// # Errors
    /// Fails when the reader's position cannot be determined.
    pub fn new(input: R) -> Result<Self, osmpbf::Error> {
        Ok(Self {
            blobs: BlobReader::new_seekable(input)?,
            sections: None,
        })
    }

    fn stream<T: FromPbf + 'static>(&mut self) -> Result<EntityStream<'_, T>, BackendError> {
        let start = match self.sections {
            Some(found) => match found.offset(T::KIND) {
                Some(offset) => offset,
                None => return Ok(Box::new(std::iter::empty())),
            },
            None => 0,
        };
        self.blobs
            .seek(ByteOffset(start))
            .map_err(|err| BackendError::Restart {
                kind: T::KIND,
                source: io::Error::other(err),
            })?;
        let scan = self.sections.is_none().then(Sections::default);
        Ok(Box::new(PbfStream {
            blobs: &mut self.blobs,
            sections: &mut self.sections,
            scan,
            pending: VecDeque::new(),
            done: false,
            kind: PhantomData::<T>,
        }))
    }
}

impl<R: Read + Seek + Send> Backend for PbfBackend<R> {
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

/// Blob-at-a-time decoder; entities of one block are buffered in `pending`.
struct PbfStream<'a, R: Read + Seek + Send, T> {
    blobs: &'a mut BlobReader<R>,
    sections: &'a mut Option<Sections>,
    scan: Option<Sections>,
    pending: VecDeque<Result<T, ReadError>>,
    done: bool,
    kind: PhantomData<T>,
}

impl<R: Read + Seek + Send, T: FromPbf> PbfStream<'_, R, T> {
    /// Decode the next data blob into `pending`; `false` at end of file.
    fn fill(&mut self) -> Result<bool, ReadError> {
        let Some(next) = self.blobs.next() else {
            if let Some(found) = self.scan.take() {
                debug!("PBF sections: {found:?}");
                *self.sections = Some(found);
            }
            return Ok(false);
        };
        let blob = next.map_err(|err| decode_error(T::KIND, err))?;
        let offset = blob.offset().map_or(0, |ByteOffset(at)| at);
        match blob.decode().map_err(|err| decode_error(T::KIND, err))? {
            BlobDecode::OsmData(block) => {
                if let Some(scan) = self.scan.as_mut() {
                    scan.record(&block, offset);
                }
                T::collect(&block, offset, &mut self.pending);
            }
            BlobDecode::OsmHeader(_) => trace!("skipping header blob at {offset}"),
            BlobDecode::Unknown(name) => debug!("skipping unknown blob {name:?} at {offset}"),
        }
        Ok(true)
    }
}

impl<R: Read + Seek + Send, T: FromPbf> Iterator for PbfStream<'_, R, T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn decode_error(kind: EntityKind, err: osmpbf::Error) -> ReadError {
    ReadError::Decode {
        kind,
        source: Box::new(err),
    }
}
