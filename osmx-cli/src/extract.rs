//! `extract` command: select a closed subset of an OSM file.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osmx_core::{BoundingBox, Selection};
use serde::{Deserialize, Serialize};

use crate::files::{InputFormat, OutputFormat, Sink, load, require_existing, write_dataset};
use crate::{
    ARG_BBOX, ARG_INPUT, ARG_INPUT_FORMAT, ARG_NODE, ARG_OUT, ARG_OUTPUT, ARG_RELATION, ARG_TAG,
    ARG_USER, ARG_VALUE, ARG_WAY, CliError, ENV_EXTRACT_INPUT,
};

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Extract entities from an OSM XML or PBF file together with \
                 everything they reference. A bounding box wins over an id, \
                 an id wins over --user, and --user wins over --tag.",
    about = "Extract a closed subset of an OSM file"
)]
#[ortho_config(prefix = "OSMX")]
pub(crate) struct ExtractArgs {
    /// OSM XML or PBF input file.
    #[arg(value_name = "file")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Keep entities inside `west,south,east,north`.
    #[arg(long = ARG_BBOX, value_name = "W,S,E,N", allow_hyphen_values = true)]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Keep one relation and its members.
    #[arg(long = ARG_RELATION, value_name = "id")]
    #[serde(default)]
    pub(crate) relation: Option<u64>,
    /// Keep one way and its nodes.
    #[arg(long = ARG_WAY, value_name = "id")]
    #[serde(default)]
    pub(crate) way: Option<u64>,
    /// Keep one node.
    #[arg(long = ARG_NODE, value_name = "id")]
    #[serde(default)]
    pub(crate) node: Option<u64>,
    /// Keep entities last edited by this user.
    #[arg(long = ARG_USER, value_name = "name")]
    #[serde(default)]
    pub(crate) user: Option<String>,
    /// Keep entities carrying this tag key.
    #[arg(long = ARG_TAG, value_name = "key")]
    #[serde(default)]
    pub(crate) tag: Option<String>,
    /// Require this value for `--tag`.
    #[arg(long = ARG_VALUE, value_name = "value", requires = ARG_TAG)]
    #[serde(default)]
    pub(crate) value: Option<String>,
    /// Override input format detection.
    #[arg(long = ARG_INPUT_FORMAT, value_enum)]
    #[serde(default)]
    pub(crate) input_format: Option<InputFormat>,
    /// Output format (default: xml).
    #[arg(long = ARG_OUTPUT, value_enum)]
    #[serde(default)]
    pub(crate) output: Option<OutputFormat>,
    /// Write to this file instead of stdout.
    #[arg(long = ARG_OUT, value_name = "path")]
    #[serde(default)]
    pub(crate) out: Option<Utf8PathBuf>,
}

impl ExtractArgs {
    pub(crate) fn into_config(self) -> Result<ExtractPlan, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractPlan::try_from(merged)
    }
}

/// Resolved `extract` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractPlan {
    pub(crate) input: Utf8PathBuf,
    pub(crate) input_format: Option<InputFormat>,
    pub(crate) selection: Selection,
    pub(crate) output: OutputFormat,
    pub(crate) out: Option<Utf8PathBuf>,
}

impl TryFrom<ExtractArgs> for ExtractPlan {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_EXTRACT_INPUT,
        })?;
        let bbox = args.bbox.map(|text| parse_bbox(&text)).transpose()?;
        Ok(Self {
            input,
            input_format: args.input_format,
            selection: Selection {
                bbox,
                relation: args.relation,
                way: args.way,
                node: args.node,
                user: args.user,
                tag: args.tag,
                value: args.value,
                tagged: false,
            },
            output: args.output.unwrap_or_default(),
            out: args.out,
        })
    }
}

fn parse_bbox(text: &str) -> Result<BoundingBox, CliError> {
    text.parse()
        .map_err(|source| CliError::InvalidBoundingBox {
            value: text.to_owned(),
            source,
        })
}

pub(crate) fn run_extract(args: ExtractArgs, stdout: &mut dyn Write) -> Result<(), CliError> {
    let plan = resolve_extract_plan(args)?;
    execute_extract(plan, stdout)
}

fn resolve_extract_plan(args: ExtractArgs) -> Result<ExtractPlan, CliError> {
    let plan = args.into_config()?;
    require_existing(&plan.input, ARG_INPUT)?;
    Ok(plan)
}

pub(crate) fn execute_extract(plan: ExtractPlan, stdout: &mut dyn Write) -> Result<(), CliError> {
    let ExtractPlan {
        input,
        input_format,
        selection,
        output,
        out,
    } = plan;
    let config = selection
        .into_config()
        .map_err(|source| CliError::Extract {
            path: input.clone(),
            source,
        })?;
    let extraction = load(&input, input_format, config)?;
    let sink = Sink::open(out.as_deref(), stdout)?;
    write_dataset(sink, output, &extraction.dataset, "osmx extract")
}

#[cfg(test)]
pub(crate) fn plan_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExtractPlan, CliError> {
    let merged = ExtractArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExtractPlan::try_from(merged)
}
