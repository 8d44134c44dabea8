//! `carcade runserver` command implementation.

use std::path::Path;

use carcade_build::{BuildConfig, SiteBuilder};
use carcade_config::{CliSettings, Config};
use carcade_server::{ServerConfig, run_server};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the runserver command.
#[derive(Args)]
pub(crate) struct RunserverArgs {
    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl RunserverArgs {
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            ..CliSettings::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let builder = SiteBuilder::new(BuildConfig::from_config(&config)?);

        let server_config = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            project_dir: config.paths_resolved.project_dir.clone(),
            output_dir: config.paths_resolved.output_dir.clone(),
        };

        output.highlight(&format!(
            "Serving on http://{}:{}/",
            server_config.host, server_config.port
        ));
        output.info(&format!(
            "Output: {}",
            server_config.output_dir.display()
        ));
        output.info("Press Ctrl-C to stop.");

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run_server(server_config, builder))?;
        Ok(())
    }
}
