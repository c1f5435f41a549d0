//! Constants used throughout fleetkeys.
//!
//! Centralizes magic strings and default configuration values.

/// Configuration file name (fleet.toml).
pub const CONFIG_FILE: &str = "fleet.toml";

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "FLEETKEYS_CONFIG";

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "FLEETKEYS_LOG";

/// SOPS field holding the host's private key.
pub const DEFAULT_SECRET_FIELD: &str = "ssh_host_ed25519_key";

/// Private key location inside the scoped directory, mirroring the remote layout.
pub const DEFAULT_KEY_PATH: &str = "etc/ssh/ssh_host_ed25519_key";

/// Live SSH key directory on remote hosts.
pub const DEFAULT_REMOTE_KEY_DIR: &str = "/etc/ssh";

/// Remote staging area for copied key material.
pub const REMOTE_STAGING_DIR: &str = "/tmp";

/// Mode of the decrypted private key file (owner read only).
pub const PRIVATE_KEY_MODE: u32 = 0o400;

/// Mode of the derived public key file.
pub const PUBLIC_KEY_MODE: u32 = 0o644;

/// Mode of the scoped key directory.
pub const SCOPE_DIR_MODE: u32 = 0o755;

/// Post-reboot verification defaults (milliseconds).
pub const DEFAULT_VERIFY_INITIAL_DELAY_MS: u64 = 5_000;
pub const DEFAULT_VERIFY_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_VERIFY_TIMEOUT_MS: u64 = 300_000;

/// Upper bound on `verify_timeout_ms` (one day).
pub const MAX_VERIFY_TIMEOUT_MS: u64 = 86_400_000;

/// ssh/scp `ConnectTimeout` (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// File name suffixes (lowercase) that mark SOPS-encrypted JSON files.
pub const SOPS_SUFFIXES: &[&str] = &[".enc.json"];

/// Exact file names that mark SOPS-encrypted YAML files.
pub const SOPS_FILE_NAMES: &[&str] = &["secrets.yaml"];

/// Directories never descended into when searching for SOPS files.
pub const SKIP_DIRS: &[&str] = &[".git", "target", "result"];
