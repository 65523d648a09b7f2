//! `waydupes` command: report highway ways that share a segment.

use std::io::Write;
use std::time::Instant;

use camino::Utf8PathBuf;
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmx_core::{
    Criterion, DetectorConfig, DuplicateDetector, DuplicateReport, ExtractConfig, Filters, Mode,
    Predicate,
};
use osmx_data::GpxWriter;
use serde::{Deserialize, Serialize};

use crate::files::{InputFormat, Sink, generator, load, require_existing, text_error};
use crate::{ARG_GPX, ARG_INPUT, ARG_INPUT_FORMAT, ARG_TILE_SIZE, CliError, ENV_WAYDUPES_INPUT};

/// Tag key selecting the ways that are compared.
const WAY_TAG: &str = "highway";

/// CLI arguments for the `waydupes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Load every highway way and its nodes, then report pairs of \
                 ways that run along the same segment in the same or the \
                 opposite direction.",
    about = "Find duplicate highway ways"
)]
#[ortho_config(prefix = "OSMX")]
pub(crate) struct WaydupesArgs {
    /// OSM XML or PBF input file.
    #[arg(value_name = "file")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Tile edge length in degrees; derived from the data when omitted.
    #[arg(long = ARG_TILE_SIZE, value_name = "degrees")]
    #[serde(default)]
    pub(crate) tile_size: Option<f64>,
    /// Override input format detection.
    #[arg(long = ARG_INPUT_FORMAT, value_enum)]
    #[serde(default)]
    pub(crate) input_format: Option<InputFormat>,
    /// Write the duplicate ways to this GPX file.
    #[arg(long = ARG_GPX, value_name = "path")]
    #[serde(default)]
    pub(crate) gpx: Option<Utf8PathBuf>,
}

impl WaydupesArgs {
    pub(crate) fn into_config(self) -> Result<WaydupesPlan, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        WaydupesPlan::try_from(merged)
    }
}

/// Resolved `waydupes` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WaydupesPlan {
    pub(crate) input: Utf8PathBuf,
    pub(crate) input_format: Option<InputFormat>,
    pub(crate) detector: DetectorConfig,
    pub(crate) gpx: Option<Utf8PathBuf>,
}

impl TryFrom<WaydupesArgs> for WaydupesPlan {
    type Error = CliError;

    fn try_from(args: WaydupesArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_WAYDUPES_INPUT,
        })?;
        Ok(Self {
            input,
            input_format: args.input_format,
            detector: DetectorConfig {
                tile_size: args.tile_size,
            },
            gpx: args.gpx,
        })
    }
}

/// Extraction settings: highway ways plus the nodes they reference.
fn highway_config() -> ExtractConfig {
    ExtractConfig::new(Mode::ByPredicate).with_filters(Filters {
        node: Some(Predicate::reject_all()),
        way: Some(Predicate::from_criterion(Criterion::tag(WAY_TAG, None))),
        relation: Some(Predicate::reject_all()),
    })
}

pub(crate) fn run_waydupes(args: WaydupesArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let plan = args.into_config()?;
    require_existing(&plan.input, ARG_INPUT)?;
    let report = execute_waydupes(&plan, stdout)?;
    if report.pairs.is_empty() {
        info!("no duplicate ways found");
    }
    Ok(())
}

/// Run the detector and write the summary (and optional GPX).
pub(crate) fn execute_waydupes(
    plan: &WaydupesPlan,
    stdout: &mut dyn Write,
) -> Result<DuplicateReport, CliError> {
    let started = Instant::now();
    let mut extraction = load(&plan.input, plan.input_format, highway_config())?;
    info!("parsing done after {:.1?}", started.elapsed());
    let report = DuplicateDetector::new(plan.detector).detect(&mut extraction.dataset)?;
    info!(
        "finished searching duplicates after {:.1?}: {} tiles of {:.5} degrees",
        started.elapsed(),
        report.tiles,
        report.tile_size
    );
    info!("found {} duplicate ways", report.distinct_ways());
    for pair in &report.pairs {
        writeln!(stdout, "{}\t{}", pair.first, pair.second)
            .map_err(|source| text_error("text", source))?;
    }
    if let Some(path) = plan.gpx.as_deref() {
        let missing = report.missing_ways(&extraction.dataset);
        if !missing.is_empty() {
            warn!("duplicate ways {missing:?} could not be resolved for GPX output");
        }
        let ways = report.ways(&extraction.dataset);
        let mut writer = GpxWriter::new(Sink::open(Some(path), stdout)?);
        writer.write_way_tracks(&extraction.dataset, &ways, &generator("osmx waydupes"))?;
        writer.finish()?;
        info!("wrote {} ways to {path}", ways.len());
    }
    Ok(report)
}

#[cfg(test)]
pub(crate) fn highway_config_for_test() -> ExtractConfig {
    highway_config()
}
