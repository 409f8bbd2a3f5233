use anyhow::Result;
use colored::Colorize;
use tracing::debug;

use crate::{
    app::{load_config, load_config_from, AppState, Config},
    cli::{handle_command, Cli},
};

/// Resolves configuration and runs one CLI command
pub struct Runner {
    cli: Cli,
    config: Config,
}

impl Runner {
    /// Create a runner from CLI args
    ///
    /// Precedence for the service URL: `--api-url`, then the config file(s) and
    /// environment, then the built-in default.
    pub fn new(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            // An explicitly requested file must load
            Some(path) => load_config_from(path)?,
            None => match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!(
                        "{} Failed to load config: {}. Using defaults.",
                        "warning:".yellow(),
                        e
                    );
                    Config::default()
                }
            },
        };

        if let Some(url) = &cli.api_url {
            config.api_url = url.clone();
        }
        debug!("Using analysis service at {}", config.api_url);

        Ok(Self { cli, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the requested command
    pub async fn run(self) -> Result<()> {
        let state = AppState::new(self.config)?;
        handle_command(&state, &self.cli.command, self.cli.output_format).await
    }
}
