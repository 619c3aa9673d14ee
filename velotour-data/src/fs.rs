//! Capability-scoped file access for dataset and database paths.

use std::io::{self, Read, Write};
use std::path::Component;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};

/// Read `path` to a string through an ambient file handle.
pub fn read_utf8(path: &Utf8Path) -> io::Result<String> {
    let mut file = fs_utf8::File::open_ambient(path, ambient_authority())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Write `contents` to `path`, replacing any existing file.
pub fn write_utf8(path: &Utf8Path, contents: &str) -> io::Result<()> {
    let (dir, name) = open_parent(path)?;
    let mut file = dir.create(name)?;
    file.write_all(contents.as_bytes())?;
    file.flush()
}

/// Whether `path` names an existing regular file.
///
/// # Errors
/// Returns `NotFound` when nothing exists at `path`.
pub fn file_is_file(path: &Utf8Path) -> io::Result<bool> {
    let (dir, name) = open_parent(path)?;
    dir.metadata(name).map(|metadata| metadata.is_file())
}

fn open_parent(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, &str)> {
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("{path} does not name a file")))?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, name))
}

/// Create the parent directory of `path` when it does not exist yet.
///
/// Paths without a parent, or directly under the filesystem root, need no
/// work.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }
    let (root, relative) = split_root(parent)?;
    if relative.as_str().is_empty() {
        return Ok(());
    }
    fs_utf8::Dir::open_ambient_dir(&root, ambient_authority())?.create_dir_all(&relative)
}

/// Split `dir` into a directory cap-std can open ambiently and the relative
/// remainder below it.
fn split_root(dir: &Utf8Path) -> io::Result<(Utf8PathBuf, Utf8PathBuf)> {
    match dir.as_std_path().components().next() {
        Some(Component::RootDir | Component::Prefix(_)) => {
            let mut components = dir.components();
            let mut root = Utf8PathBuf::new();
            for component in components.by_ref() {
                root.push(component);
                if matches!(component, camino::Utf8Component::RootDir) {
                    break;
                }
            }
            Ok((root, components.as_path().to_path_buf()))
        }
        _ => Ok((Utf8PathBuf::from("."), dir.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/var/lib/velotour", "/", "var/lib/velotour")]
    #[case("artifacts/db", ".", "artifacts/db")]
    fn roots_are_split_from_relative_parts(
        #[case] dir: &str,
        #[case] root: &str,
        #[case] relative: &str,
    ) {
        let (actual_root, actual_relative) = split_root(Utf8Path::new(dir)).expect("split");
        assert_eq!(actual_root, Utf8PathBuf::from(root));
        assert_eq!(actual_relative, Utf8PathBuf::from(relative));
    }

    #[rstest]
    fn creates_missing_parents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        let target = base.join("nested/deeper/velotour.db");
        ensure_parent_dir(&target).expect("create parents");
        assert!(base.join("nested/deeper").is_dir());
    }

    #[rstest]
    fn reads_back_written_text() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        let target = base.join("data.json");
        std::fs::write(&target, "{}").expect("write");
        assert_eq!(read_utf8(&target).expect("read"), "{}");
    }

    #[rstest]
    fn written_files_replace_previous_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        let target = base.join("cache.json");
        write_utf8(&target, "[1, 2, 3]").expect("first write");
        write_utf8(&target, "[]").expect("second write");
        assert_eq!(read_utf8(&target).expect("read"), "[]");
    }

    #[rstest]
    fn directories_are_not_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 tempdir");
        std::fs::create_dir(base.join("inner")).expect("mkdir");
        assert!(!file_is_file(&base.join("inner")).expect("inspect"));
        let missing = file_is_file(&base.join("absent.json")).expect_err("missing");
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);
    }
}
