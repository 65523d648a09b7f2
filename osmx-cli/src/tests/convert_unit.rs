//! Unit tests for the `to-gpx` and `to-osm` commands.

use super::helpers::{Workspace, element_ids, read_utf8, write_utf8};
use super::*;
use crate::convert::{ConvertPlan, ToGpxArgs, ToOsmArgs, execute_convert};
use crate::files::{InputFormat, OutputFormat};
use base64::{Engine as _, engine::general_purpose};
use rstest::{fixture, rstest};

const PBF_FIXTURE: &str = include_str!("../../../osmx-data/tests/fixtures/sample.osm.pbf.b64");

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn write_pbf(workspace: &Workspace) -> camino::Utf8PathBuf {
    let cleaned: String = PBF_FIXTURE
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD
        .decode(cleaned)
        .expect("fixture is valid base64");
    let path = workspace.path("sample.osm.pbf");
    write_utf8(&path, &bytes);
    path
}

#[rstest]
fn to_gpx_reads_xml_and_writes_gpx() {
    let plan = ConvertPlan::try_from(ToGpxArgs {
        input: Some("map.osm".into()),
        out: None,
    })
    .expect("plan should build");
    assert_eq!(plan.from, InputFormat::Xml);
    assert_eq!(plan.to, OutputFormat::Gpx);
}

#[rstest]
fn to_gpx_help_describes_track_points() {
    use clap::CommandFactory;

    let command = ToGpxArgs::command();
    let help = command.get_long_about().expect("long help").to_string();
    assert!(help.contains("nodes referenced by a way become track points"));
}

#[rstest]
fn to_osm_without_input_errors() {
    let err = ConvertPlan::try_from(ToOsmArgs::default()).expect_err("missing input");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_INPUT);
            assert_eq!(env, ENV_TO_OSM_INPUT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn to_gpx_dumps_every_node(workspace: Workspace) {
    let plan = ConvertPlan::try_from(ToGpxArgs {
        input: Some(workspace.sample()),
        out: None,
    })
    .expect("plan should build");
    let mut stdout = Vec::new();
    execute_convert(&plan, &mut stdout).expect("conversion should succeed");
    let gpx = String::from_utf8(stdout).expect("utf-8 output");
    assert!(gpx.contains("creator=\"osmx to-gpx"));
    assert_eq!(gpx.matches("<wpt ").count(), 0);
    assert_eq!(gpx.matches("<trkseg>").count(), 3);
    assert!(gpx.contains("<!-- node id=\"5\" -->\n   <trkpt "));
}

#[rstest]
fn to_osm_converts_pbf_into_xml(workspace: Workspace) {
    let out = workspace.path("converted.osm");
    let plan = ConvertPlan::try_from(ToOsmArgs {
        input: Some(write_pbf(&workspace)),
        out: Some(out.clone()),
    })
    .expect("plan should build");
    execute_convert(&plan, &mut Vec::new()).expect("conversion should succeed");
    let xml = read_utf8(&out);
    assert!(xml.starts_with("<?xml"));
    assert_eq!(element_ids(&xml, "node"), vec![1, 2, 3, 4]);
    assert_eq!(element_ids(&xml, "way"), vec![100]);
    assert_eq!(element_ids(&xml, "relation"), vec![900]);
}
