//! Capability-based file access for OSM inputs and outputs.
//!
//! Every path is resolved by opening its parent directory with ambient
//! authority and then operating on the file name relative to that handle.
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, Read};
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Open the parent directory of `path` and return it with the file name.
///
/// # Errors
/// Fails when `path` has no file name or the parent cannot be opened.
pub fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_owned();
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Open an input file for reading and seeking.
///
/// # Errors
/// Propagates lookup and permission failures.
pub fn open_input(path: &Utf8Path) -> io::Result<File> {
    let (dir, name) = open_parent(path)?;
    dir.open(&name).map(fs_utf8::File::into_std)
}

/// Whether `path` exists and is a regular file.
///
/// # Errors
/// Fails when the parent directory cannot be opened or inspected.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_parent(path)?;
    match dir.metadata(&name) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Read at most `len` bytes from the start of `path`.
///
/// Used to sniff the format of inputs whose name does not reveal it.
///
/// # Errors
/// Propagates open and read failures.
pub fn read_prefix(path: &Utf8Path, len: usize) -> io::Result<Vec<u8>> {
    let file = open_input(path)?;
    let mut prefix = Vec::with_capacity(len);
    file.take(u64::try_from(len).unwrap_or(u64::MAX))
        .read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Create (or truncate) an output file, creating missing parent directories.
///
/// # Errors
/// Propagates directory creation and open failures.
pub fn create_output(path: &Utf8Path) -> io::Result<File> {
    ensure_parent_dir(path)?;
    let (dir, name) = open_parent(path)?;
    dir.create(&name).map(fs_utf8::File::into_std)
}

/// Create the parent directory of `path` if it does not exist.
///
/// # Errors
/// Propagates directory creation failures.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() {
        return Ok(());
    }
    let (base, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    base.create_dir_all(&relative)
}

/// Split `dir` into an opened root (or the current directory for relative
/// paths) and the remainder below it.
fn split_root(dir: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_dir = dir.as_std_path();
    let root = match std_dir.components().next() {
        Some(Component::Prefix(prefix)) => {
            let drive = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;
            Utf8PathBuf::from(drive).join(std::path::MAIN_SEPARATOR.to_string())
        }
        Some(Component::RootDir) => Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string()),
        _ => Utf8PathBuf::from("."),
    };
    let relative = if root.as_str() == "." {
        dir.to_path_buf()
    } else {
        dir.strip_prefix(&root)
            .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
            .to_path_buf()
    };
    let base = fs_utf8::Dir::open_ambient_dir(&root, ambient_authority())?;
    Ok((base, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("temporary directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp path");
        (dir, root)
    }

    #[rstest]
    fn creates_nested_outputs(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let target = root.join("out/nested/extract.osm");
        let mut file = create_output(&target).expect("output created");
        file.write_all(b"<osm/>").expect("write succeeds");
        assert!(is_regular_file(&target).expect("metadata readable"));
    }

    #[rstest]
    fn reads_bounded_prefix(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        let target = root.join("input.osm");
        std::fs::write(&target, "<?xml version='1.0'?><osm/>").expect("fixture written");
        let prefix = read_prefix(&target, 5).expect("prefix read");
        assert_eq!(prefix, b"<?xml");
        let all = read_prefix(&target, 1024).expect("prefix read");
        assert_eq!(all.len(), 27);
    }

    #[rstest]
    fn missing_files_are_not_regular(scratch: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = scratch;
        assert!(!is_regular_file(&root.join("absent.osm.pbf")).expect("parent exists"));
        assert!(open_input(&root.join("absent.osm.pbf")).is_err());
    }
}
