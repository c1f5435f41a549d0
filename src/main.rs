//! fleetkeys - SSH host key management for NixOS fleets.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fleetkeys::cli::output;
use fleetkeys::cli::{execute, Cli};
use fleetkeys::core::constants;
use fleetkeys::error::{ConfigError, ConnectivityError, Error, ToolError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("fleetkeys=debug")
        } else {
            EnvFilter::new("fleetkeys=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli.command, &cli.config) {
        let suggestion = match &e {
            Error::Config(ConfigError::NotFound(_)) => {
                Some(format!("create {} or pass --config", constants::CONFIG_FILE))
            }
            Error::Config(ConfigError::UnknownAlias(_)) => Some("run: fleetkeys list".to_string()),
            Error::Tool(ToolError::NotFound { tool, .. }) => {
                Some(format!("install {} or set its path under [tools]", tool))
            }
            Error::Connectivity(ConnectivityError::Unreachable { .. }) => {
                Some("check the hostname, port and your ssh agent".to_string())
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(&hint);
        }
        std::process::exit(1);
    }
}
