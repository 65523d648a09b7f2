//! Behavioural tests for opening, decoding and writing OSM files.

use std::cell::RefCell;
use std::fs;

use camino::Utf8PathBuf;
use osmx_core::test_support::sample_dataset;
use osmx_core::{ExtractConfig, Extraction, Mode, extract};
use osmx_data::{FileType, OpenError, OsmFile, OsmXmlWriter, open};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::{TempDir, TempPath};

mod support;

use support::{decode_fixture, fixtures_dir, scratch_dir, utf8, write_temp};

const MALFORMED_XML: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="hand">
 <node id="1" lat="51.5" lon="-0.12"/>
 <node id="2" lon="-0.13"/>
 <node id="3" lat="51.6" lon="-0.14">
  <tag k="amenity" v="cafe"/>
 </node>
</osm>
"#;

/// State shared by the format scenarios.
#[derive(Default)]
struct FormatsWorld {
    input: RefCell<Option<TempPath>>,
    missing: RefCell<Option<(TempDir, Utf8PathBuf)>>,
    opened: RefCell<Option<Result<OsmFile, OpenError>>>,
    extraction: RefCell<Option<Extraction>>,
}

impl FormatsWorld {
    fn input_path(&self) -> Utf8PathBuf {
        if let Some((_, path)) = self.missing.borrow().as_ref() {
            return path.clone();
        }
        let input = self.input.borrow();
        utf8(input.as_ref().expect("input prepared")).to_path_buf()
    }

    fn dump(&self, path: &camino::Utf8Path) -> Extraction {
        let mut file = open(path, FileType::Unknown).expect("input opens");
        extract(&mut file, ExtractConfig::new(Mode::Dump)).expect("dump succeeds")
    }

    fn open_error(&self) -> OpenError {
        match self.opened.borrow_mut().take() {
            Some(Err(err)) => err,
            Some(Ok(file)) => panic!("expected an open error, opened {:?}", file.file_type()),
            None => panic!("open was not attempted"),
        }
    }
}

#[fixture]
fn world() -> FormatsWorld {
    FormatsWorld::default()
}

#[given("the sample PBF file")]
fn given_sample_pbf(world: &FormatsWorld) {
    world.input.replace(Some(decode_fixture(&fixtures_dir(), "sample")));
}

#[given("the sample PBF file renamed without a suffix")]
fn given_sample_without_suffix(world: &FormatsWorld) {
    let decoded = decode_fixture(&fixtures_dir(), "sample");
    let bytes = fs::read(&decoded).expect("decoded fixture readable");
    world.input.replace(Some(write_temp("sample", "", &bytes)));
}

#[given("an OSM XML file with a node lacking coordinates")]
fn given_malformed_xml(world: &FormatsWorld) {
    world
        .input
        .replace(Some(write_temp("malformed", ".osm", MALFORMED_XML.as_bytes())));
}

#[given("a tiny file without a suffix")]
fn given_tiny_file(world: &FormatsWorld) {
    world.input.replace(Some(write_temp("tiny", "", b"<osm/>")));
}

#[given("a path to a missing file")]
fn given_missing_file(world: &FormatsWorld) {
    let (dir, root) = scratch_dir();
    world.missing.replace(Some((dir, root.join("absent.osm.pbf"))));
}

#[when("I dump it to OSM XML and read the XML back")]
fn when_convert_to_xml(world: &FormatsWorld) {
    let from_pbf = world.dump(&world.input_path());
    assert_eq!(from_pbf.report.malformed(), 1, "negative id is skipped");
    let (_dir, root) = scratch_dir();
    let target = root.join("converted/sample.osm");
    let output = osmx_fs::create_output(&target).expect("output created");
    let mut writer = OsmXmlWriter::new(std::io::BufWriter::new(output));
    writer
        .write_dataset(&from_pbf.dataset, "osmx tests")
        .expect("XML written");
    writer.finish().expect("XML flushed");
    world.extraction.replace(Some(world.dump(&target)));
}

#[when("I dump the file")]
fn when_dump(world: &FormatsWorld) {
    let extraction = world.dump(&world.input_path());
    world.extraction.replace(Some(extraction));
}

#[when("I open it without naming a format")]
fn when_open(world: &FormatsWorld) {
    let result = open(&world.input_path(), FileType::Unknown);
    world.opened.replace(Some(result));
}

#[then("the XML holds the sample entities")]
fn then_sample_entities(world: &FormatsWorld) {
    let extraction = world.extraction.borrow_mut().take().expect("extraction ran");
    assert_eq!(extraction.dataset, sample_dataset());
    assert_eq!(extraction.report.malformed(), 0);
}

#[then("the dump keeps the valid nodes and counts one malformed record")]
fn then_valid_nodes(world: &FormatsWorld) {
    let extraction = world.extraction.borrow_mut().take().expect("extraction ran");
    let ids: Vec<u64> = extraction.dataset.nodes.iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(extraction.report.nodes.malformed, 1);
}

#[then("it opens as PBF")]
fn then_opens_as_pbf(world: &FormatsWorld) {
    match world.opened.borrow_mut().take() {
        Some(Ok(file)) => assert_eq!(file.file_type(), FileType::Pbf),
        other => panic!("expected an opened PBF file, got {other:?}"),
    }
}

#[then("opening fails because the format is unknown")]
fn then_unknown_format(world: &FormatsWorld) {
    let err = world.open_error();
    assert!(matches!(err, OpenError::UnknownFormat { .. }), "got {err:?}");
}

#[then("opening fails because the file does not exist")]
fn then_not_found(world: &FormatsWorld) {
    let err = world.open_error();
    assert!(matches!(err, OpenError::NotFound { .. }), "got {err:?}");
}

#[scenario(path = "tests/features/formats.feature", index = 0)]
fn pbf_to_xml_round_trip(world: FormatsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/formats.feature", index = 1)]
fn malformed_xml_records(world: FormatsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/formats.feature", index = 2)]
fn sniffed_pbf(world: FormatsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/formats.feature", index = 3)]
fn unknown_format(world: FormatsWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/formats.feature", index = 4)]
fn missing_file(world: FormatsWorld) {
    let _ = world;
}
