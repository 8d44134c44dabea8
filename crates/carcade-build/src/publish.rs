//! Atomic publishing through a symlink swap.
//!
//! The stable output path is a symlink to a complete build directory living
//! next to it. Publishing a new build creates a fresh symlink under a
//! temporary name and renames it over the stable path, so readers see either
//! the old build or the new one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Prefix of the hidden per-build directories.
pub const BUILD_DIR_PREFIX: &str = ".build-";

fn parent_dir(stable: &Path) -> &Path {
    stable
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Create a new, uniquely named build directory beside `stable`.
pub(crate) fn create_build_dir(stable: &Path) -> Result<PathBuf, BuildError> {
    let parent = parent_dir(stable);
    fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    let dir = tempfile::Builder::new()
        .prefix(BUILD_DIR_PREFIX)
        .tempdir_in(parent)
        .map_err(|e| BuildError::io(parent, e))?;
    Ok(dir.keep())
}

/// Point `stable` at `build` and delete the previously published build.
pub(crate) fn publish(stable: &Path, build: &Path) -> Result<(), BuildError> {
    let parent = parent_dir(stable);
    let previous = match fs::symlink_metadata(stable) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = fs::read_link(stable).map_err(|e| BuildError::io(stable, e))?;
            Some(parent.join(target))
        }
        Ok(meta) => {
            if meta.is_dir() {
                fs::remove_dir_all(stable).map_err(|e| BuildError::io(stable, e))?;
            } else {
                fs::remove_file(stable).map_err(|e| BuildError::io(stable, e))?;
            }
            None
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(BuildError::io(stable, e)),
    };

    let target = build.file_name().map_or_else(|| build.to_path_buf(), PathBuf::from);
    let swap = parent.join(format!(
        ".{}.swap",
        stable.file_name().map_or_else(|| "output".into(), |n| n.to_string_lossy())
    ));
    remove_link(&swap);
    symlink_dir(&target, &swap).map_err(|source| BuildError::Publish {
        path: swap.clone(),
        source,
    })?;
    replace_link(&swap, stable).map_err(|source| BuildError::Publish {
        path: stable.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %stable.display(), build = %build.display(), "Published build");

    if let Some(previous) = previous
        && !same_dir(&previous, build)
        && previous.is_dir()
    {
        fs::remove_dir_all(&previous).map_err(|e| BuildError::io(&previous, e))?;
    }
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn remove_link(path: &Path) {
    if fs::symlink_metadata(path).is_ok()
        && let Err(e) = remove_symlink(path)
    {
        tracing::debug!(path = %path.display(), error = %e, "Failed to remove stale link");
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_dir(path)
}

#[cfg(unix)]
fn replace_link(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

#[cfg(windows)]
fn replace_link(from: &Path, to: &Path) -> io::Result<()> {
    if fs::symlink_metadata(to).is_ok() {
        remove_symlink(to)?;
    }
    fs::rename(from, to)
}

#[cfg(all(test, unix))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_build(stable: &Path, marker: &str) -> PathBuf {
        let build = create_build_dir(stable).unwrap();
        fs::write(build.join("index.html"), marker).unwrap();
        build
    }

    #[test]
    fn test_build_dir_is_hidden_sibling() {
        let temp = tempfile::tempdir().unwrap();
        let stable = temp.path().join("www");

        let build = create_build_dir(&stable).unwrap();

        assert!(build.is_dir());
        assert_eq!(build.parent(), Some(temp.path()));
        let name = build.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(BUILD_DIR_PREFIX));
    }

    #[test]
    fn test_publish_creates_relative_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let stable = temp.path().join("www");
        let build = make_build(&stable, "one");

        publish(&stable, &build).unwrap();

        let link = fs::read_link(&stable).unwrap();
        assert!(link.is_relative());
        assert_eq!(fs::read_to_string(stable.join("index.html")).unwrap(), "one");
    }

    #[test]
    fn test_publish_replaces_and_deletes_previous() {
        let temp = tempfile::tempdir().unwrap();
        let stable = temp.path().join("www");
        let first = make_build(&stable, "one");
        publish(&stable, &first).unwrap();
        let second = make_build(&stable, "two");

        publish(&stable, &second).unwrap();

        assert_eq!(fs::read_to_string(stable.join("index.html")).unwrap(), "two");
        assert!(!first.exists());
        assert!(second.exists());
    }

    #[test]
    fn test_publish_over_real_directory() {
        let temp = tempfile::tempdir().unwrap();
        let stable = temp.path().join("www");
        fs::create_dir_all(&stable).unwrap();
        fs::write(stable.join("old.html"), "old").unwrap();
        let build = make_build(&stable, "new");

        publish(&stable, &build).unwrap();

        assert!(fs::symlink_metadata(&stable).unwrap().file_type().is_symlink());
        assert!(!stable.join("old.html").exists());
        assert_eq!(fs::read_to_string(stable.join("index.html")).unwrap(), "new");
    }
}
