//! `to-gpx` and `to-osm` commands: dump a whole file in another format.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmx_core::{ExtractConfig, Mode};
use serde::{Deserialize, Serialize};

use crate::files::{InputFormat, OutputFormat, Sink, load, require_existing, write_dataset};
use crate::{ARG_INPUT, ARG_OUT, CliError, ENV_TO_GPX_INPUT, ENV_TO_OSM_INPUT};

/// CLI arguments for the `to-gpx` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read every node and way of an OSM XML file and write them \
                 as GPX: nodes referenced by a way become track points, all \
                 other nodes become waypoints.",
    about = "Convert OSM XML to GPX"
)]
#[ortho_config(prefix = "OSMX")]
pub(crate) struct ToGpxArgs {
    /// OSM XML input file.
    #[arg(value_name = "file")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Write to this file instead of stdout.
    #[arg(long = ARG_OUT, value_name = "path")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
}

/// CLI arguments for the `to-osm` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read every entity of an OSM PBF file and write it back \
                 out as OSM XML.",
    about = "Convert OSM PBF to OSM XML"
)]
#[ortho_config(prefix = "OSMX")]
pub(crate) struct ToOsmArgs {
    /// OSM PBF input file.
    #[arg(value_name = "file")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Write to this file instead of stdout.
    #[arg(long = ARG_OUT, value_name = "path")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
}

/// Resolved conversion: read `input` as `from`, write `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConvertPlan {
    pub(crate) input: Utf8PathBuf,
    pub(crate) from: InputFormat,
    pub(crate) to: OutputFormat,
    pub(crate) out: Option<Utf8PathBuf>,
}

impl ConvertPlan {
    fn new(
        input: Option<Utf8PathBuf>,
        env: &'static str,
        from: InputFormat,
        to: OutputFormat,
        out: Option<Utf8PathBuf>,
    ) -> Result<Self, CliError> {
        let input = input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env,
        })?;
        Ok(Self {
            input,
            from,
            to,
            out,
        })
    }

    const fn tool(&self) -> &'static str {
        match self.to {
            OutputFormat::Xml => "osmx to-osm",
            OutputFormat::Gpx => "osmx to-gpx",
        }
    }
}

impl TryFrom<ToGpxArgs> for ConvertPlan {
    type Error = CliError;

    fn try_from(args: ToGpxArgs) -> Result<Self, Self::Error> {
        Self::new(
            args.input,
            ENV_TO_GPX_INPUT,
            InputFormat::Xml,
            OutputFormat::Gpx,
            args.out,
        )
    }
}

impl TryFrom<ToOsmArgs> for ConvertPlan {
    type Error = CliError;

    fn try_from(args: ToOsmArgs) -> Result<Self, Self::Error> {
        Self::new(
            args.input,
            ENV_TO_OSM_INPUT,
            InputFormat::Pbf,
            OutputFormat::Xml,
            args.out,
        )
    }
}

pub(crate) fn run_to_gpx(args: ToGpxArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    run_convert(ConvertPlan::try_from(merged)?, stdout)
}

pub(crate) fn run_to_osm(args: ToOsmArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    run_convert(ConvertPlan::try_from(merged)?, stdout)
}

fn run_convert(plan: ConvertPlan, stdout: &mut dyn Write) -> Result<(), CliError> {
    require_existing(&plan.input, ARG_INPUT)?;
    execute_convert(&plan, stdout)
}

/// Dump `plan.input` unfiltered into the requested format.
pub(crate) fn execute_convert(plan: &ConvertPlan, stdout: &mut dyn Write) -> Result<(), CliError> {
    let extraction = load(&plan.input, Some(plan.from), ExtractConfig::new(Mode::Dump))?;
    let sink = Sink::open(plan.out.as_deref(), stdout)?;
    write_dataset(sink, plan.to, &extraction.dataset, plan.tool())
}
