//! Opening OSM inputs and detecting their format.

use std::fs::File;
use std::io::{self, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use osmx_core::{Backend, BackendError, EntityStream, Node, Relation, Way};
use thiserror::Error;

use crate::{PbfBackend, XmlBackend};

/// Number of leading bytes inspected when the suffix is inconclusive.
const SNIFF_WINDOW: usize = 63;

/// Input format requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileType {
    /// Detect from the file name, then from the content.
    #[default]
    Unknown,
    /// OSM XML.
    Xml,
    /// OSM PBF.
    Pbf,
}

impl FileType {
    /// Guess the format from the file name suffix.
    #[must_use]
    pub fn from_suffix(path: &Utf8Path) -> Self {
        let name = path.file_name().unwrap_or_default();
        if name.ends_with(".osm.pbf") || name.ends_with(".pbf") {
            Self::Pbf
        } else if name.ends_with(".osm") {
            Self::Xml
        } else {
            Self::Unknown
        }
    }

    /// Guess the format from the first bytes of a file.
    ///
    /// Inputs shorter than the sniff window stay [`FileType::Unknown`].
    #[must_use]
    pub fn from_prefix(prefix: &[u8]) -> Self {
        if prefix.len() < SNIFF_WINDOW {
            return Self::Unknown;
        }
        let text = prefix.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(prefix);
        let start = text.trim_ascii_start();
        if start.starts_with(b"<?xml") || start.starts_with(b"<osm") {
            Self::Xml
        } else {
            Self::Pbf
        }
    }
}

/// Errors raised before any entity is read.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The path names no file.
    #[error("no file name given")]
    NoFileName,
    /// Nothing exists at the path.
    #[error("input file {path} does not exist")]
    NotFound {
        /// Requested path.
        path: Utf8PathBuf,
    },
    /// The path exists but cannot be read more than once.
    #[error("input {path} is not a seekable regular file")]
    NotSeekable {
        /// Requested path.
        path: Utf8PathBuf,
    },
    /// Neither the suffix nor the content identifies the format.
    #[error("cannot determine the format of {path}")]
    UnknownFormat {
        /// Requested path.
        path: Utf8PathBuf,
    },
    /// Opening or probing the file failed.
    #[error("failed to open {path}")]
    Io {
        /// Requested path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// An opened input of either format.
#[derive(Debug)]
pub enum OsmFile {
    /// OSM XML input.
    Xml(XmlBackend<BufReader<File>>),
    /// OSM PBF input.
    Pbf(PbfBackend<BufReader<File>>),
}

impl OsmFile {
    /// Format of the opened file.
    #[must_use]
    pub const fn file_type(&self) -> FileType {
        match self {
            Self::Xml(_) => FileType::Xml,
            Self::Pbf(_) => FileType::Pbf,
        }
    }
}

impl Backend for OsmFile {
    fn relations(&mut self) -> Result<EntityStream<'_, Relation>, BackendError> {
        match self {
            Self::Xml(backend) => backend.relations(),
            Self::Pbf(backend) => backend.relations(),
        }
    }

    fn ways(&mut self) -> Result<EntityStream<'_, Way>, BackendError> {
        match self {
            Self::Xml(backend) => backend.ways(),
            Self::Pbf(backend) => backend.ways(),
        }
    }

    fn nodes(&mut self) -> Result<EntityStream<'_, Node>, BackendError> {
        match self {
            Self::Xml(backend) => backend.nodes(),
            Self::Pbf(backend) => backend.nodes(),
        }
    }
}

/// Open `path` as an OSM input.
///
/// With [`FileType::Unknown`] the format is taken from the suffix
/// (`.osm.pbf` and `.pbf` for PBF, `.osm` for XML) and otherwise sniffed
/// from the first bytes.
///
/// # Errors
/// Returns [`OpenError`] when the path is empty, missing, not a regular
/// file, of undeterminable format, or unreadable.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use osmx_data::{FileType, open};
///
/// # fn main() -> Result<(), osmx_data::OpenError> {
/// let file = open(Utf8Path::new("berlin.osm.pbf"), FileType::Unknown)?;
/// assert_eq!(file.file_type(), FileType::Pbf);
/// # Ok(())
/// # }
/// ```
pub fn open(path: &Utf8Path, file_type: FileType) -> Result<OsmFile, OpenError> {
    if path.file_name().is_none_or(str::is_empty) {
        return Err(OpenError::NoFileName);
    }
    let io_error = |source: io::Error| OpenError::Io {
        path: path.to_path_buf(),
        source,
    };
    let regular = match osmx_fs::is_regular_file(path) {
        Ok(regular) => regular,
        Err(err) if err.kind() == io::ErrorKind::NotFound => false,
        Err(err) => return Err(io_error(err)),
    };
    if !regular {
        let exists = osmx_fs::open_input(path).is_ok();
        return Err(if exists {
            OpenError::NotSeekable {
                path: path.to_path_buf(),
            }
        } else {
            OpenError::NotFound {
                path: path.to_path_buf(),
            }
        });
    }
    let resolved = resolve_type(path, file_type).map_err(io_error)?;
    debug!("opening {path} as {resolved:?}");
    let reader = BufReader::new(osmx_fs::open_input(path).map_err(io_error)?);
    match resolved {
        FileType::Xml => Ok(OsmFile::Xml(XmlBackend::new(reader))),
        FileType::Pbf => PbfBackend::new(reader)
            .map(OsmFile::Pbf)
            .map_err(|err| io_error(io::Error::other(err))),
        FileType::Unknown => Err(OpenError::UnknownFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn resolve_type(path: &Utf8Path, requested: FileType) -> io::Result<FileType> {
    if requested != FileType::Unknown {
        return Ok(requested);
    }
    match FileType::from_suffix(path) {
        FileType::Unknown => {
            osmx_fs::read_prefix(path, SNIFF_WINDOW).map(|prefix| FileType::from_prefix(&prefix))
        }
        known => Ok(known),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("berlin.osm.pbf", FileType::Pbf)]
    #[case("extract.pbf", FileType::Pbf)]
    #[case("dir/map.osm", FileType::Xml)]
    #[case("export.dat", FileType::Unknown)]
    #[case("osm", FileType::Unknown)]
    fn suffix_detection(#[case] path: &str, #[case] expected: FileType) {
        assert_eq!(FileType::from_suffix(Utf8Path::new(path)), expected);
    }

    #[rstest]
    #[case(String::from("<?xml version='1.0' encoding='UTF-8'?>\n<osm version=\"0.6\" generator=\"x\">"), FileType::Xml)]
    #[case(String::from("\n  <osm version=\"0.6\" generator=\"hand written file with padding\">"), FileType::Xml)]
    #[case("\0".repeat(80), FileType::Pbf)]
    #[case(String::from("<osm/>"), FileType::Unknown)]
    fn content_detection(#[case] prefix: String, #[case] expected: FileType) {
        assert_eq!(FileType::from_prefix(prefix.as_bytes()), expected);
    }

    #[rstest]
    fn empty_paths_have_no_file_name() {
        assert!(matches!(open(Utf8Path::new(""), FileType::Unknown), Err(OpenError::NoFileName)));
    }
}
