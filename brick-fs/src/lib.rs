//! Capability-based filesystem helpers built on `cap-std` and `camino`.
//!
//! The catalogue provisioner resolves ambient paths through these helpers so
//! every file operation happens relative to an explicitly opened directory.
#![forbid(unsafe_code)]

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use std::io;
use std::path::Component;

/// Open a UTF-8 file path for reading using ambient authority.
pub fn open_utf8_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Resolve the directory containing `path` and return it with the file name.
pub fn open_dir_and_file(path: &Utf8Path) -> io::Result<(fs_utf8::Dir, String)> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other("target should include a file name"))?
        .to_owned();
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Ensure the parent directory for `path` exists, handling absolute paths safely for cap-std.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent == Utf8Path::new("/") {
        return Ok(());
    }

    let (base_dir, relative) = base_dir_and_relative(parent)?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    base_dir.create_dir_all(&relative)?;
    Ok(())
}

/// Return the size in bytes of the regular file at `path`.
///
/// Missing files, or a missing parent directory, yield `Ok(None)`. A path
/// that exists but is not a regular file is reported as an error so callers
/// never mistake a directory for an absent dataset.
pub fn regular_file_len(path: &Utf8Path) -> io::Result<Option<u64>> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    match dir.metadata(name.as_str()) {
        Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
        Ok(_) => Err(io::Error::other(format!("{path} exists but is not a file"))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Remove the file at `path`, treating an already-missing file as success.
pub fn remove_file_if_exists(path: &Utf8Path) -> io::Result<()> {
    let (dir, name) = match open_dir_and_file(path) {
        Ok(found) => found,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    match dir.remove_file(name.as_str()) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Split an absolute or relative parent path into an ambient base directory and a relative suffix.
pub fn base_dir_and_relative(parent: &Utf8Path) -> io::Result<(fs_utf8::Dir, Utf8PathBuf)> {
    let std_parent = parent.as_std_path();

    let (base, relative) = match std_parent.components().next() {
        // Windows absolute path with a drive or UNC prefix.
        Some(Component::Prefix(prefix)) => {
            let prefix_str = prefix
                .as_os_str()
                .to_str()
                .ok_or_else(|| io::Error::other("non-UTF-8 path prefix"))?;

            let base = Utf8PathBuf::from(prefix_str).join(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .or_else(|_| std_parent.strip_prefix(prefix.as_os_str()))
                .map_err(|_| io::Error::other("failed to strip prefix from parent path"))?
                .to_path_buf();
            (base, relative)
        }
        Some(Component::RootDir) => {
            let base = Utf8PathBuf::from(std::path::MAIN_SEPARATOR.to_string());
            let relative = std_parent
                .strip_prefix(base.as_std_path())
                .map_err(|_| io::Error::other("failed to strip root from absolute path"))?
                .to_path_buf();
            (base, relative)
        }
        _ => (Utf8PathBuf::from("."), std_parent.to_path_buf()),
    };

    let dir = fs_utf8::Dir::open_ambient_dir(&base, ambient_authority())?;
    let relative = Utf8PathBuf::from_path_buf(relative)
        .map_err(|_| io::Error::other("non-UTF-8 parent path"))?;

    Ok((dir, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        (dir, root)
    }

    #[rstest]
    fn regular_file_len_reports_missing_files(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let len = regular_file_len(&root.join("absent.db")).expect("inspect path");
        assert_eq!(len, None);
    }

    #[rstest]
    fn regular_file_len_reports_missing_parent(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let len = regular_file_len(&root.join("nested/absent.db")).expect("inspect path");
        assert_eq!(len, None);
    }

    #[rstest]
    fn regular_file_len_reads_size(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let path = root.join("sets.db");
        std::fs::write(&path, [0_u8; 42]).expect("write file");
        assert_eq!(regular_file_len(&path).expect("inspect path"), Some(42));
    }

    #[rstest]
    fn regular_file_len_rejects_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let path = root.join("folder");
        std::fs::create_dir(&path).expect("create dir");
        assert!(regular_file_len(&path).is_err());
    }

    #[rstest]
    fn ensure_parent_dir_creates_nested_directories(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let path = root.join("a/b/c/sets.db");
        ensure_parent_dir(&path).expect("create parents");
        assert!(root.join("a/b/c").is_dir());
    }

    #[rstest]
    fn remove_file_if_exists_is_idempotent(scratch: (TempDir, Utf8PathBuf)) {
        let (_dir, root) = scratch;
        let path = root.join("sets.db");
        std::fs::write(&path, b"x").expect("write file");
        remove_file_if_exists(&path).expect("first removal");
        remove_file_if_exists(&path).expect("second removal");
        assert!(!path.exists());
    }
}
