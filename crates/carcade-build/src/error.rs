//! Error type for builds.

use std::path::{Path, PathBuf};

use carcade_site::SiteError;

/// Error returned by the static site builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Filesystem error in the build or source directories.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Site tree pipeline failure.
    #[error(transparent)]
    Site(#[from] SiteError),
    /// Template loading or rendering failure.
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
    /// Malformed translation catalog.
    #[error("Invalid catalog {}:{line}: {message}", path.display())]
    Catalog {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Asset bundle that could not be assembled.
    #[error("Bundle '{name}': {message}")]
    Bundle { name: String, message: String },
    /// Build target that would delete project sources when cleared.
    #[error("Refusing to build into {}: it contains {}", path.display(), contains.display())]
    UnsafeOutput { path: PathBuf, contains: PathBuf },
    /// The output symlink could not be repointed at a new build.
    #[error("Failed to publish {}: {source}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
