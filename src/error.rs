//! Error types.
//!
//! Errors carry enough context (alias, field, tool) to be actionable when
//! printed by `main`; every variant terminates the process with exit code 1.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error(transparent)]
    KeyFile(#[from] KeyFileError),

    /// The operator declined to continue after a failed decryption.
    #[error("aborted: secret '{field}' for '{target}' could not be decrypted")]
    Aborted { field: String, target: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration and target resolution errors. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("unknown alias '{0}'")]
    UnknownAlias(String),

    #[error("duplicate alias '{0}'")]
    DuplicateAlias(String),

    #[error("target '{alias}' has no secrets file configured")]
    MissingSecretsPath { alias: String },

    #[error("no targets configured")]
    NoTargets,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures invoking external command-line tools.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool is not installed in the invoking environment.
    #[error("{tool} not found ({program}): {source}")]
    NotFound {
        tool: &'static str,
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited nonzero.
    #[error("{tool} failed ({status}){}", format_stderr(.stderr))]
    Failed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("{tool} produced invalid output: {reason}")]
    InvalidOutput { tool: &'static str, reason: String },
}

/// Remote host reachability errors.
#[derive(Error, Debug)]
pub enum ConnectivityError {
    #[error("no ssh access to '{alias}' ({host}): {reason}")]
    Unreachable {
        alias: String,
        host: String,
        reason: String,
    },

    #[error("could not confirm ssh access to '{alias}' ({host}) after reboot, gave up after {waited_ms}ms")]
    Unconfirmed {
        alias: String,
        host: String,
        waited_ms: u64,
    },
}

/// Local key material errors. Paths point into the scoped directory.
#[derive(Error, Debug)]
pub enum KeyFileError {
    #[error("failed to create key directory {} for '{alias}': {source}", .path.display())]
    CreateDir {
        alias: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create key file {} for '{alias}': {source}", .path.display())]
    Create {
        alias: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {} for '{alias}': {source}", .path.display())]
    Write {
        alias: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
