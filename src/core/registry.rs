//! Target registry.
//!
//! Maps operator-facing aliases to the hosts they manage. Built once from the
//! loaded [`Config`] and passed by reference to whatever needs resolution.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::error;

use crate::core::config::Config;
use crate::error::{ConfigError, Result};

/// One manageable host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetHost {
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    pub nixosconfig: String,
    /// Resolved secrets file, if this host's key can be provisioned
    pub secrets: Option<PathBuf>,
    /// SOPS field holding the private key
    pub secret_field: String,
    /// Key location relative to the scoped directory
    pub key_path: PathBuf,
}

impl TargetHost {
    /// Secrets file for this host.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSecretsPath` when none is configured.
    pub fn secrets_path(&self) -> Result<&Path> {
        self.secrets.as_deref().ok_or_else(|| {
            ConfigError::MissingSecretsPath {
                alias: self.alias.clone(),
            }
            .into()
        })
    }

    /// `hostname` without a leading `user@`, as it appears in known_hosts.
    pub fn host(&self) -> &str {
        match self.hostname.rsplit_once('@') {
            Some((_, host)) => host,
            None => &self.hostname,
        }
    }

    /// `hostname:port`, for log messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// Ordered set of targets keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    targets: Vec<TargetHost>,
}

impl Registry {
    /// Build from a validated configuration, applying per-target overrides.
    pub fn from_config(config: &Config) -> Self {
        let provision = &config.provision;
        let targets = config
            .targets
            .iter()
            .map(|entry| TargetHost {
                alias: entry.alias.clone(),
                hostname: entry.hostname.clone(),
                port: entry.port,
                nixosconfig: entry.nixosconfig.clone(),
                secrets: entry.secrets.as_deref().map(|p| config.resolve(p)),
                secret_field: entry
                    .secret_field
                    .clone()
                    .unwrap_or_else(|| provision.secret_field.clone()),
                key_path: entry
                    .key_path
                    .clone()
                    .unwrap_or_else(|| provision.key_path.clone()),
            })
            .collect();
        Self { targets }
    }

    /// Build directly from hosts. Aliases must be unique.
    pub fn new(targets: Vec<TargetHost>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for t in &targets {
            if !seen.insert(t.alias.as_str()) {
                return Err(ConfigError::DuplicateAlias(t.alias.clone()).into());
            }
        }
        Ok(Self { targets })
    }

    /// Look up a target by exact alias.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownAlias` if no target has that alias.
    pub fn lookup(&self, alias: &str) -> Result<&TargetHost> {
        self.targets
            .iter()
            .find(|t| t.alias == alias)
            .ok_or_else(|| {
                error!(alias, "unknown alias");
                ConfigError::UnknownAlias(alias.to_string()).into()
            })
    }

    /// All targets in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &TargetHost> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
