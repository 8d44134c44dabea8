//! `carcade build` command implementation.

use std::path::{Path, PathBuf};

use carcade_build::{BuildConfig, SiteBuilder};
use carcade_config::{CliSettings, Config};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Output directory (overrides config).
    #[arg(long)]
    to: Option<PathBuf>,

    /// Build into a fresh directory and swap it in through a symlink.
    #[arg(long)]
    atomically: bool,
}

impl BuildArgs {
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.to,
            ..CliSettings::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let output_dir = config.paths_resolved.output_dir.clone();

        output.info(&format!(
            "Pages: {}",
            config.paths_resolved.pages_dir.display()
        ));
        output.info(&format!("Output: {}", output_dir.display()));

        let builder = SiteBuilder::new(BuildConfig::from_config(&config)?);
        let report = if self.atomically {
            builder.build_atomically(&output_dir)?
        } else {
            builder.build(&output_dir)?
        };

        output.success(&format!(
            "Built {} pages to {}",
            report.written,
            output_dir.display()
        ));
        Ok(())
    }
}
