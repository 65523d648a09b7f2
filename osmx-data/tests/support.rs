//! Fixture helpers shared by the data behaviour tests.

use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io::Write};
use tempfile::{Builder, TempDir, TempPath};

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Decode a Base64-encoded fixture into a temporary `.osm.pbf` file.
pub fn decode_fixture(dir: &Utf8Path, stem: &str) -> TempPath {
    let encoded_path = dir.join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path}: {err}");
        });
    write_temp(stem, ".osm.pbf", &decoded)
}

/// Write `contents` to a temporary file with the given suffix.
pub fn write_temp(stem: &str, suffix: &str, contents: &[u8]) -> TempPath {
    let mut tempfile = Builder::new()
        .prefix(stem)
        .suffix(suffix)
        .tempfile()
        .unwrap_or_else(|err| panic!("failed to create temporary file for {stem}: {err}"));
    tempfile
        .write_all(contents)
        .unwrap_or_else(|err| panic!("failed to write temporary file for {stem}: {err}"));
    tempfile
        .flush()
        .unwrap_or_else(|err| panic!("failed to flush temporary file for {stem}: {err}"));
    tempfile.into_temp_path()
}

/// A scratch directory with a UTF-8 path.
pub fn scratch_dir() -> (TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("temporary directory");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp path");
    (dir, root)
}

/// UTF-8 view of a temporary path.
pub fn utf8(path: &TempPath) -> &Utf8Path {
    Utf8Path::from_path(path).expect("UTF-8 temp path")
}
