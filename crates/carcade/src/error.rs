//! CLI error types.

use carcade_build::BuildError;
use carcade_config::ConfigError;
use carcade_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Site(#[from] carcade_build::SiteError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("{0}")]
    Validation(String),
}
