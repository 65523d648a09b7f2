//! Input and output plumbing shared by the subcommands.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use camino::Utf8Path;
use clap::ValueEnum;
use log::{debug, info};
use osmx_core::{Dataset, ExtractConfig, Extraction, extract};
use osmx_data::{FileType, GpxWriter, OsmXmlWriter, WriteError, open};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Input format override for `--input-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum InputFormat {
    /// OSM XML.
    Xml,
    /// OSM PBF.
    Pbf,
}

impl InputFormat {
    /// Map an optional override onto the reader's file type.
    pub(crate) const fn file_type(format: Option<Self>) -> FileType {
        match format {
            Some(Self::Xml) => FileType::Xml,
            Some(Self::Pbf) => FileType::Pbf,
            None => FileType::Unknown,
        }
    }
}

/// Serialisation for extracted data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    /// OSM XML.
    #[default]
    Xml,
    /// GPX 1.1.
    Gpx,
}

/// Output destination: the caller's stdout handle or a created file.
pub(crate) enum Sink<'a> {
    Stdout(&'a mut dyn Write),
    File(BufWriter<File>),
}

impl<'a> Sink<'a> {
    /// Create `path` (and its parents) or fall back to `stdout`.
    pub(crate) fn open(path: Option<&Utf8Path>, stdout: &'a mut dyn Write) -> Result<Self, CliError> {
        let Some(target) = path else {
            return Ok(Self::Stdout(stdout));
        };
        let file = osmx_fs::create_output(target).map_err(|source| CliError::CreateOutput {
            path: target.to_path_buf(),
            source,
        })?;
        debug!("writing to {target}");
        Ok(Self::File(BufWriter::new(file)))
    }
}

impl Write for Sink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Stdout(out) => out.write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Stdout(out) => out.flush(),
            Self::File(file) => file.flush(),
        }
    }
}

/// Wrap a failure writing plain `format` text to the output.
pub(crate) const fn text_error(format: &'static str, source: io::Error) -> CliError {
    CliError::Write(WriteError::Io { format, source })
}

/// `generator`/`creator` attribute for written documents.
pub(crate) fn generator(tool: &str) -> String {
    format!("{tool} (osmx v{})", env!("CARGO_PKG_VERSION"))
}

/// Serialise `dataset` into `sink` in the requested format.
pub(crate) fn write_dataset(
    sink: Sink<'_>,
    format: OutputFormat,
    dataset: &Dataset,
    tool: &str,
) -> Result<(), CliError> {
    let creator = generator(tool);
    match format {
        OutputFormat::Xml => {
            let mut writer = OsmXmlWriter::new(sink);
            writer.write_dataset(dataset, &creator)?;
            writer.finish()?;
        }
        OutputFormat::Gpx => {
            let mut writer = GpxWriter::new(sink);
            writer.write_dataset(dataset, &creator)?;
            writer.finish()?;
        }
    }
    Ok(())
}

/// Fail early when an input path is missing or not a regular file.
pub(crate) fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match osmx_fs::is_regular_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Open `path` and run one extraction over it.
pub(crate) fn load(
    path: &Utf8Path,
    format: Option<InputFormat>,
    config: ExtractConfig,
) -> Result<Extraction, CliError> {
    let mut file = open(path, InputFormat::file_type(format))?;
    let extraction = extract(&mut file, config).map_err(|source| CliError::Extract {
        path: path.to_path_buf(),
        source,
    })?;
    let report = &extraction.report;
    info!(
        "read {path}: kept {} relations, {} ways, {} nodes ({} malformed records skipped)",
        report.relations.kept,
        report.ways.kept,
        report.nodes.kept,
        report.malformed()
    );
    Ok(extraction)
}
