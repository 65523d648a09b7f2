//! Unit tests for the `waydupes` command.

use super::helpers::{Workspace, read_utf8, write_utf8};
use super::*;
use crate::dupes::{WaydupesArgs, WaydupesPlan, execute_waydupes, highway_config_for_test};
use osmx_core::{DetectorConfig, DuplicatePair, Mode, Tag, TileSizeError, Way};
use rstest::{fixture, rstest};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn plan(workspace: &Workspace, tile_size: Option<f64>) -> WaydupesPlan {
    WaydupesPlan {
        input: workspace.sample(),
        input_format: None,
        detector: DetectorConfig { tile_size },
        gpx: None,
    }
}

#[rstest]
fn converting_without_input_errors() {
    let err = WaydupesPlan::try_from(WaydupesArgs::default()).expect_err("missing input");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_INPUT);
            assert_eq!(env, ENV_WAYDUPES_INPUT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn highway_filter_ignores_other_ways() {
    let config = highway_config_for_test();
    assert_eq!(config.mode, Mode::ByPredicate);
    let way = config.filters.way.expect("way predicate");
    let mut road = Way::new(1, vec![1, 2]);
    road.tags.push(Tag::new("highway", "primary"));
    assert!(way.matches(&road));
    assert!(!way.matches(&Way::new(2, vec![1, 2])));
}

#[rstest]
#[case::fixed(Some(0.5))]
#[case::derived(None)]
fn reports_the_reversed_shared_segment(workspace: Workspace, #[case] tile_size: Option<f64>) {
    let mut stdout = Vec::new();
    let report = execute_waydupes(&plan(&workspace, tile_size), &mut stdout)
        .expect("detection should succeed");
    assert_eq!(
        report.pairs,
        vec![DuplicatePair {
            first: 10,
            second: 11
        }]
    );
    assert_eq!(String::from_utf8(stdout).expect("utf-8"), "10\t11\n");
}

#[rstest]
fn non_positive_tile_size_is_rejected(workspace: Workspace) {
    let err = execute_waydupes(&plan(&workspace, Some(0.0)), &mut Vec::new())
        .expect_err("zero tile size");
    assert!(matches!(err, CliError::Detect(TileSizeError::Invalid { .. })));
}

#[rstest]
fn duplicates_are_written_as_gpx_tracks(workspace: Workspace) {
    let out = workspace.path("dupes.gpx");
    let waydupes = WaydupesPlan {
        gpx: Some(out.clone()),
        ..plan(&workspace, Some(1.0))
    };
    execute_waydupes(&waydupes, &mut Vec::new()).expect("detection should succeed");
    let gpx = read_utf8(&out);
    assert_eq!(gpx.matches("<trk>").count(), 2);
    assert!(gpx.contains("creator=\"osmx waydupes"));
    assert!(!gpx.contains("<wpt"));
}

#[rstest]
fn tiny_tile_size_is_rejected_before_sweeping(workspace: Workspace) {
    let err = execute_waydupes(&plan(&workspace, Some(1e-6)), &mut Vec::new())
        .expect_err("too many tiles");
    assert!(matches!(err, CliError::Detect(TileSizeError::TooSmall { .. })));
}

/// Way 1 shares a segment with both way 2 and way 3.
const SHARED_WAY_OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="fixture">
  <node id="1" lat="52.5000000" lon="13.4000000"/>
  <node id="2" lat="52.5100000" lon="13.4100000"/>
  <node id="3" lat="52.5200000" lon="13.4200000"/>
  <node id="4" lat="52.5300000" lon="13.4300000"/>
  <node id="5" lat="52.5050000" lon="13.4150000"/>
  <node id="6" lat="52.5250000" lon="13.4150000"/>
  <way id="1"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><tag k="highway" v="primary"/></way>
  <way id="2"><nd ref="5"/><nd ref="2"/><nd ref="3"/><tag k="highway" v="service"/></way>
  <way id="3"><nd ref="6"/><nd ref="3"/><nd ref="2"/><tag k="highway" v="track"/></way>
</osm>
"#;

#[rstest]
fn a_way_in_two_pairs_is_written_once_per_pair(workspace: Workspace) {
    let input = workspace.path("shared.osm");
    write_utf8(&input, SHARED_WAY_OSM.as_bytes());
    let out = workspace.path("shared.gpx");
    let waydupes = WaydupesPlan {
        input,
        input_format: None,
        detector: DetectorConfig {
            tile_size: Some(10.0),
        },
        gpx: Some(out.clone()),
    };
    let mut stdout = Vec::new();
    let report = execute_waydupes(&waydupes, &mut stdout).expect("detection should succeed");
    assert_eq!(String::from_utf8(stdout).expect("utf-8"), "1\t2\n1\t3\n");
    assert_eq!(report.distinct_ways(), 3);
    let gpx = read_utf8(&out);
    assert_eq!(gpx.matches("<trk>").count(), 4);
    assert_eq!(gpx.matches("<!-- way id=\"1\" -->").count(), 2);
}
