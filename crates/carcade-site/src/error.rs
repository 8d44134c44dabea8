//! Error type for the site pipeline.

use std::path::PathBuf;

/// Error returned by tree construction, rule evaluation and URL resolution.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Filesystem error while reading the content tree.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Ordering directive of an unrecognized shape.
    #[error("Unknown ordering for '{pattern}': {found}")]
    UnknownOrdering {
        /// Rule pattern the directive is attached to.
        pattern: String,
        /// Offending directive, rendered as JSON.
        found: String,
    },
    /// URL resolution requested for a node that does not exist.
    #[error("Unknown path: '{0}'")]
    UnknownPath(String),
    /// Rule pattern that is not a valid glob.
    #[error("Invalid rule pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as written.
        pattern: String,
        /// Parser message.
        message: String,
    },
    /// Pagination rule with a zero page size.
    #[error("Page size for '{0}' must be greater than 0")]
    InvalidPageSize(String),
    /// Content fragment that could not be parsed.
    #[error("Invalid content fragment {}: {message}", path.display())]
    Fragment {
        /// Fragment file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Context assigned twice to the same node.
    #[error("Context already filled for '{0}'")]
    ContextAlreadyFilled(String),
}

impl SiteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
