//! `carcade extract-messages` command implementation.

use std::path::{Path, PathBuf};

use carcade_build::extract::write_messages;
use carcade_config::Config;
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Default catalog template name inside the translations directory.
const MESSAGES_FILE: &str = "messages.po";

/// Arguments for the extract-messages command.
#[derive(Args)]
pub(crate) struct ExtractMessagesArgs {
    /// Output file (default: <translations>/messages.po).
    #[arg(long)]
    to: Option<PathBuf>,
}

impl ExtractMessagesArgs {
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;

        let target = self
            .to
            .unwrap_or_else(|| config.paths_resolved.translations_dir.join(MESSAGES_FILE));
        let count = write_messages(&config.paths_resolved.layouts_dir, &target)?;

        output.success(&format!(
            "Extracted {count} messages to {}",
            target.display()
        ));
        Ok(())
    }
}
