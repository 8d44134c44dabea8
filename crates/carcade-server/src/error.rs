//! Server error type.

use carcade_build::BuildError;

/// Error returned by the development server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Filesystem watcher could not be started.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
    /// The first build failed and there is nothing to serve.
    #[error("Initial build failed")]
    InitialBuild(#[source] BuildError),
    /// Background build task panicked or was cancelled.
    #[error("Build task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
