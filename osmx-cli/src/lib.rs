//! Command-line interface for osmx extraction tooling.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::LevelFilter;

mod convert;
mod dupes;
mod error;
mod extract;
mod files;

pub use error::CliError;

use convert::{ToGpxArgs, ToOsmArgs, run_to_gpx, run_to_osm};
use dupes::{WaydupesArgs, run_waydupes};
use extract::{ExtractArgs, run_extract};

pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_BBOX: &str = "bbox";
pub(crate) const ARG_RELATION: &str = "relation";
pub(crate) const ARG_WAY: &str = "way";
pub(crate) const ARG_NODE: &str = "node";
pub(crate) const ARG_USER: &str = "user";
pub(crate) const ARG_TAG: &str = "tag";
pub(crate) const ARG_VALUE: &str = "value";
pub(crate) const ARG_INPUT_FORMAT: &str = "input-format";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_OUT: &str = "out";
pub(crate) const ARG_TILE_SIZE: &str = "tile-size";
pub(crate) const ARG_GPX: &str = "gpx";
pub(crate) const ENV_EXTRACT_INPUT: &str = "OSMX_CMDS_EXTRACT_INPUT";
pub(crate) const ENV_WAYDUPES_INPUT: &str = "OSMX_CMDS_WAYDUPES_INPUT";
pub(crate) const ENV_TO_GPX_INPUT: &str = "OSMX_CMDS_TO_GPX_INPUT";
pub(crate) const ENV_TO_OSM_INPUT: &str = "OSMX_CMDS_TO_OSM_INPUT";

/// Run the osmx CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.debug);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    dispatch(cli.command, &mut handle)?;
    handle
        .flush()
        .map_err(|source| files::text_error("stdout", source))
}

fn dispatch(command: Command, stdout: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Extract(args) => run_extract(args, stdout),
        Command::Waydupes(args) => run_waydupes(args, stdout),
        Command::ToGpx(args) => run_to_gpx(args, stdout),
        Command::ToOsm(args) => run_to_osm(args, stdout),
    }
}

/// Install `env_logger`; `--debug` overrides `RUST_LOG`.
fn init_logging(debug: bool) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    if builder.try_init().is_err() {
        log::debug!("logger already installed");
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "osmx",
    about = "Extract, convert and check OpenStreetMap data",
    version
)]
struct Cli {
    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract entities and everything they reference.
    Extract(ExtractArgs),
    /// Find highway ways that duplicate each other.
    Waydupes(WaydupesArgs),
    /// Dump an OSM XML file as GPX.
    ToGpx(ToGpxArgs),
    /// Dump an OSM PBF file as OSM XML.
    ToOsm(ToOsmArgs),
}

#[cfg(test)]
mod tests;
