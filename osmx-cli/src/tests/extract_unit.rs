//! Focused unit tests covering extract CLI configuration and execution.

use super::helpers::{Workspace, element_ids, read_utf8};
use super::*;
use crate::extract::{ExtractArgs, ExtractPlan, execute_extract, plan_from_layers_for_test};
use crate::files::OutputFormat;
use camino::Utf8PathBuf;
use osmx_core::{BBoxParseError, BoundingBox, ExtractError};
use rstest::{fixture, rstest};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn plan_for(workspace: &Workspace, args: ExtractArgs) -> ExtractPlan {
    ExtractPlan::try_from(ExtractArgs {
        input: Some(workspace.sample()),
        ..args
    })
    .expect("plan should build")
}

fn run_to_string(plan: ExtractPlan) -> String {
    let mut stdout = Vec::new();
    execute_extract(plan, &mut stdout).expect("extract should succeed");
    String::from_utf8(stdout).expect("utf-8 output")
}

#[rstest]
fn converting_without_input_errors() {
    let err = ExtractPlan::try_from(ExtractArgs::default()).expect_err("missing input");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_INPUT);
            assert_eq!(env, ENV_EXTRACT_INPUT);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn bbox_text_becomes_a_bounding_box() {
    let plan = ExtractPlan::try_from(ExtractArgs {
        input: Some(Utf8PathBuf::from("map.osm")),
        bbox: Some("-0.5,51.2,0.3,51.7".to_owned()),
        ..ExtractArgs::default()
    })
    .expect("plan should build");
    assert_eq!(
        plan.selection.bbox,
        Some(BoundingBox::new(-0.5, 51.2, 0.3, 51.7))
    );
    assert_eq!(plan.output, OutputFormat::Xml);
}

#[rstest]
#[case("1,2,3", BBoxParseError::WrongArity { found: 3 })]
#[case("1,2,x,4", BBoxParseError::InvalidNumber { value: "x".to_owned() })]
fn malformed_bbox_is_rejected(#[case] text: &str, #[case] expected: BBoxParseError) {
    let err = ExtractPlan::try_from(ExtractArgs {
        input: Some(Utf8PathBuf::from("map.osm")),
        bbox: Some(text.to_owned()),
        ..ExtractArgs::default()
    })
    .expect_err("bbox should be rejected");
    match err {
        CliError::InvalidBoundingBox { value, source } => {
            assert_eq!(value, text);
            assert_eq!(source, expected);
        }
        other => panic!("expected InvalidBoundingBox, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "way": "eleven" }));

    let err = plan_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "input": "from-file.osm",
            "tag": "highway",
            "output": "gpx",
        }),
        None,
    );
    composer.push_environment(json!({
        "input": "from-env.osm",
        "value": "residential",
    }));
    composer.push_cli(json!({ "input": "from-cli.osm" }));

    let plan = plan_from_layers_for_test(composer.layers()).expect("merged plan should build");
    assert_eq!(plan.input, Utf8PathBuf::from("from-cli.osm"));
    assert_eq!(plan.selection.tag.as_deref(), Some("highway"));
    assert_eq!(plan.selection.value.as_deref(), Some("residential"));
    assert_eq!(plan.output, OutputFormat::Gpx);
}

#[rstest]
fn way_selection_keeps_the_way_and_its_nodes(workspace: Workspace) {
    let xml = run_to_string(plan_for(
        &workspace,
        ExtractArgs {
            way: Some(11),
            ..ExtractArgs::default()
        },
    ));
    let mut nodes = element_ids(&xml, "node");
    nodes.sort_unstable();
    assert_eq!(nodes, vec![2, 3, 4]);
    assert_eq!(element_ids(&xml, "way"), vec![11]);
    assert!(element_ids(&xml, "relation").is_empty());
}

#[rstest]
fn relation_selection_follows_members_one_level(workspace: Workspace) {
    let xml = run_to_string(plan_for(
        &workspace,
        ExtractArgs {
            relation: Some(20),
            ..ExtractArgs::default()
        },
    ));
    assert_eq!(element_ids(&xml, "relation"), vec![20]);
    assert_eq!(element_ids(&xml, "way"), vec![12]);
    let mut nodes = element_ids(&xml, "node");
    nodes.sort_unstable();
    assert_eq!(nodes, vec![4, 5]);
}

#[rstest]
fn user_wins_over_tag(workspace: Workspace) {
    let xml = run_to_string(plan_for(
        &workspace,
        ExtractArgs {
            user: Some("surveyor".to_owned()),
            tag: Some("highway".to_owned()),
            ..ExtractArgs::default()
        },
    ));
    assert_eq!(element_ids(&xml, "node"), vec![5]);
    assert!(element_ids(&xml, "way").is_empty());
}

#[rstest]
fn gpx_output_goes_to_the_requested_file(workspace: Workspace) {
    let out = workspace.path("nested/out.gpx");
    let mut stdout = Vec::new();
    let plan = plan_for(
        &workspace,
        ExtractArgs {
            tag: Some("highway".to_owned()),
            output: Some(OutputFormat::Gpx),
            out: Some(out.clone()),
            ..ExtractArgs::default()
        },
    );
    execute_extract(plan, &mut stdout).expect("extract should succeed");
    assert!(stdout.is_empty());
    let gpx = read_utf8(&out);
    assert!(gpx.contains("<gpx version=\"1.1\""));
    assert!(gpx.contains("<!-- way id=\"10\" -->"));
    assert!(gpx.contains("<!-- way id=\"11\" -->"));
}

#[rstest]
fn empty_selection_is_reported(workspace: Workspace) {
    let plan = plan_for(&workspace, ExtractArgs::default());
    let err = execute_extract(plan, &mut Vec::new()).expect_err("nothing selected");
    match err {
        CliError::Extract {
            source: ExtractError::NoSelection,
            ..
        } => {}
        other => panic!("expected NoSelection, found {other:?}"),
    }
}
