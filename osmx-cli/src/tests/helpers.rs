//! Small OSM documents and scratch directories for CLI tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

/// Two highway ways sharing the segment 2-3 in opposite directions, a stream
/// hanging off node 4 and a relation holding the stream.
pub(super) const SAMPLE_OSM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="fixture">
  <node id="1" lat="52.5000000" lon="13.4000000"/>
  <node id="2" lat="52.5100000" lon="13.4100000"/>
  <node id="3" lat="52.5200000" lon="13.4200000"/>
  <node id="4" lat="52.5300000" lon="13.4300000"/>
  <node id="5" lat="52.5400000" lon="13.4400000" user="surveyor">
    <tag k="amenity" v="bench"/>
  </node>
  <way id="10">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/>
    <tag k="highway" v="residential"/>
  </way>
  <way id="11">
    <nd ref="3"/><nd ref="2"/><nd ref="4"/>
    <tag k="highway" v="service"/>
  </way>
  <way id="12">
    <nd ref="4"/><nd ref="5"/>
    <tag k="waterway" v="stream"/>
  </way>
  <relation id="20">
    <member type="way" ref="12" role="main_stream"/>
    <tag k="type" v="waterway"/>
  </relation>
</osm>
"#;

/// Scratch directory holding `sample.osm`.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        write_utf8(&root.join("sample.osm"), SAMPLE_OSM.as_bytes());
        Self { _dir: dir, root }
    }

    pub(super) fn sample(&self) -> Utf8PathBuf {
        self.root.join("sample.osm")
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).expect("write fixture file");
}

pub(super) fn read_utf8(path: &Utf8Path) -> String {
    fs::read_to_string(path).expect("read output file")
}

/// Ids of every `<kind id="..">` element in an OSM XML document.
pub(super) fn element_ids(xml: &str, kind: &str) -> Vec<u64> {
    let marker = format!("<{kind} id=\"");
    xml.match_indices(&marker)
        .filter_map(|(at, _)| {
            let rest = xml.get(at + marker.len()..)?;
            let end = rest.find('"')?;
            rest.get(..end)?.parse().ok()
        })
        .collect()
}
