//! Command-line interface.

pub mod completions;
pub mod install;
pub mod keys;
pub mod list;
pub mod output;
pub mod prompt;
pub mod sops;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::core::config::Config;
use crate::core::constants;
use crate::core::derive::KeyDeriver;
use crate::core::extract::SecretExtractor;
use crate::core::registry::Registry;
use crate::core::tool::Tool;
use crate::error::Result;

/// fleetkeys - SSH host key management for NixOS fleets.
#[derive(Parser)]
#[command(
    name = "fleetkeys",
    about = "Deployment helper for NixOS fleets: host keys, age keys and SOPS recipients",
    version
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the fleet configuration
    #[arg(
        short,
        long,
        global = true,
        env = constants::CONFIG_ENV,
        default_value = constants::CONFIG_FILE
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// List available targets (configurations and alias names)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update all SOPS files according to .sops.yaml rules
    UpdateSopsFiles,

    /// Decrypt a host private key and print its SSH and age public keys
    PrintKeys {
        /// Target alias
        #[arg(short, long)]
        alias: String,
    },

    /// Install host key(s) on remote hosts and reboot them
    InstallHostKeys {
        /// Target alias (all targets if omitted)
        #[arg(short, long)]
        alias: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Loaded configuration plus the objects every command builds from it.
pub struct Context {
    pub config: Config,
    pub registry: Registry,
}

impl Context {
    pub fn load(path: &Path) -> Result<Self> {
        let config = Config::load(path)?;
        let registry = Registry::from_config(&config);
        Ok(Self { config, registry })
    }

    pub fn extractor(&self) -> SecretExtractor {
        SecretExtractor::new(
            Tool::new("sops", &self.config.tools.sops),
            KeyDeriver::from_tools(&self.config.tools),
        )
    }
}

/// Execute a command.
pub fn execute(command: Command, config: &Path) -> Result<()> {
    use Command::*;

    match command {
        List { json } => list::execute(&Context::load(config)?, json),
        UpdateSopsFiles => sops::execute(&Context::load(config)?),
        PrintKeys { alias } => keys::execute(&Context::load(config)?, &alias),
        InstallHostKeys { alias } => install::execute(&Context::load(config)?, alias.as_deref()),
        Completions { shell } => completions::execute(shell),
    }
}
