//! Configuration file management.
//!
//! Handles reading and validating `fleet.toml`: the target list, external
//! tool locations and provisioning settings.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Fleet configuration stored in `fleet.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// External tool programs (names looked up on `PATH`, or explicit paths)
    #[serde(default)]
    pub tools: Tools,
    /// Host key provisioning settings
    #[serde(default)]
    pub provision: ProvisionSettings,
    /// Managed hosts, in listing order
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
    /// Directory the config was loaded from; relative secrets paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,
}

/// One `[[target]]` entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    pub alias: String,
    pub hostname: String,
    pub port: u16,
    pub nixosconfig: String,
    /// SOPS secrets file holding the host key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<PathBuf>,
    /// Overrides `provision.secret_field` for this host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_field: Option<String>,
    /// Overrides `provision.key_path` for this host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,
}

/// Programs invoked for each external concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub sops: String,
    pub ssh_keygen: String,
    pub ssh_to_age: String,
    pub ssh: String,
    pub scp: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            sops: "sops".to_string(),
            ssh_keygen: "ssh-keygen".to_string(),
            ssh_to_age: "ssh-to-age".to_string(),
            ssh: "ssh".to_string(),
            scp: "scp".to_string(),
        }
    }
}

/// Host-key verification for regular remote operations.
///
/// Disabling verification is deliberately not expressible here; only the
/// bootstrap copy in the provisioner does that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyMode {
    #[default]
    Strict,
    AcceptNew,
}

/// `[provision]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// SOPS field holding the private key
    pub secret_field: String,
    /// Key location relative to the scoped directory
    pub key_path: PathBuf,
    /// Live key directory on the remote host
    pub remote_key_dir: String,
    pub host_key_check: HostKeyMode,
    pub verify_initial_delay_ms: u64,
    pub verify_max_delay_ms: u64,
    pub verify_timeout_ms: u64,
    /// ssh/scp connect timeout, bounds each verification attempt
    pub connect_timeout_secs: u64,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            secret_field: constants::DEFAULT_SECRET_FIELD.to_string(),
            key_path: PathBuf::from(constants::DEFAULT_KEY_PATH),
            remote_key_dir: constants::DEFAULT_REMOTE_KEY_DIR.to_string(),
            host_key_check: HostKeyMode::default(),
            verify_initial_delay_ms: constants::DEFAULT_VERIFY_INITIAL_DELAY_MS,
            verify_max_delay_ms: constants::DEFAULT_VERIFY_MAX_DELAY_MS,
            verify_timeout_ms: constants::DEFAULT_VERIFY_TIMEOUT_MS,
            connect_timeout_secs: constants::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Default configuration path in the current directory.
    pub fn default_path() -> PathBuf {
        PathBuf::from(constants::CONFIG_FILE)
    }

    /// Load and validate configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist,
    /// `ConfigError::Parse` if the TOML is malformed, or a validation error.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()).into());
        }
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let root = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let config = Self::parse(&contents, root)?;

        debug!(targets = config.targets.len(), "config loaded");
        Ok(config)
    }

    /// Parse and validate configuration text; `root` anchors relative paths.
    pub fn parse(contents: &str, root: PathBuf) -> Result<Self> {
        let mut config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.root = root;
        config.validate()?;
        Ok(config)
    }

    /// Resolve a path from the config file against its directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Validate the configuration structure and contents
    ///
    /// Checks:
    /// - At least one target exists
    /// - Aliases are non-empty and unique, hostnames non-empty, ports non-zero
    /// - Key paths are relative and stay inside the scoped directory
    /// - Verification delays are consistent
    pub fn validate(&self) -> Result<()> {
        debug!("validating config");

        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets.into());
        }

        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if target.alias.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "alias",
                    reason: "alias cannot be empty".to_string(),
                }
                .into());
            }
            if !seen.insert(target.alias.as_str()) {
                return Err(ConfigError::DuplicateAlias(target.alias.clone()).into());
            }
            let host = match target.hostname.rsplit_once('@') {
                Some((_, host)) => host,
                None => &target.hostname,
            };
            if host.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "hostname",
                    reason: format!("empty hostname for '{}'", target.alias),
                }
                .into());
            }
            if target.port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "port",
                    reason: format!("port 0 for '{}'", target.alias),
                }
                .into());
            }
            if let Some(field) = &target.secret_field {
                validate_field(field)?;
            }
            if let Some(key_path) = &target.key_path {
                validate_key_path(key_path)?;
            }
        }

        validate_field(&self.provision.secret_field)?;
        validate_key_path(&self.provision.key_path)?;

        if !self.provision.remote_key_dir.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "remote_key_dir",
                reason: format!("must be absolute: {}", self.provision.remote_key_dir),
            }
            .into());
        }

        let p = &self.provision;
        if p.verify_timeout_ms == 0 || p.verify_timeout_ms > constants::MAX_VERIFY_TIMEOUT_MS {
            return Err(ConfigError::InvalidValue {
                field: "verify_timeout_ms",
                reason: format!(
                    "must be between 1 and {}",
                    constants::MAX_VERIFY_TIMEOUT_MS
                ),
            }
            .into());
        }
        if p.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs",
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if p.verify_initial_delay_ms > p.verify_max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "verify_initial_delay_ms",
                reason: "exceeds verify_max_delay_ms".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_field(field: &str) -> Result<()> {
    if field.is_empty() || field.contains(['"', '[', ']']) {
        return Err(ConfigError::InvalidValue {
            field: "secret_field",
            reason: format!("not a plain field name: {:?}", field),
        }
        .into());
    }
    Ok(())
}

fn validate_key_path(path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || path.file_name().is_none() {
        return Err(ConfigError::InvalidValue {
            field: "key_path",
            reason: format!("must be a relative file path: {}", path.display()),
        }
        .into());
    }
    Ok(())
}
