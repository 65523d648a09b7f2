//! Error types emitted by the osmx CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use osmx_core::{BBoxParseError, ExtractError, TileSizeError};
use osmx_data::{OpenError, WriteError};
use thiserror::Error;

/// Errors emitted by the osmx CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass it on the command line or set {env})")]
    MissingArgument {
        /// Argument name.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A referenced input path does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        /// Argument name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Argument name.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The `--bbox` value is not `west,south,east,north`.
    #[error("invalid bounding box {value:?}: {source}")]
    InvalidBoundingBox {
        /// Text as given.
        value: String,
        /// Parse failure.
        #[source]
        source: BBoxParseError,
    },
    /// The input could not be opened.
    #[error(transparent)]
    Open(#[from] OpenError),
    /// Selection or reading failed during extraction.
    #[error("extraction from {path:?} failed: {source}")]
    Extract {
        /// Input path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: ExtractError,
    },
    /// The duplicate detector could not size its tiles.
    #[error("duplicate detection failed: {0}")]
    Detect(#[from] TileSizeError),
    /// An output file could not be created.
    #[error("failed to create output {path:?}: {source}")]
    CreateOutput {
        /// Output path.
        path: Utf8PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Serialising the output failed.
    #[error(transparent)]
    Write(#[from] WriteError),
}
