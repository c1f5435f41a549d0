//! Secret extraction.
//!
//! Decrypts one field of a SOPS secrets file straight into a key file that is
//! created owner-read-only, then derives its public key next to it.
//!
//! The extractor never talks to the terminal: when `sops` fails, the caller's
//! decision callback chooses between aborting and continuing without the key.

use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::constants;
use crate::core::derive::KeyDeriver;
use crate::core::registry::TargetHost;
use crate::core::tool::Tool;
use crate::error::{Error, KeyFileError, Result, ToolError};

/// What to do after a failed decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Carry on without the key file populated.
    Continue,
    /// Stop the whole operation.
    Abort,
}

/// Context handed to the decision callback.
#[derive(Debug)]
pub struct DecryptFailure<'a> {
    pub target: &'a TargetHost,
    pub field: &'a str,
    pub error: &'a ToolError,
}

/// Derived public key, written next to the private key.
#[derive(Debug, Clone)]
pub struct PublicKey {
    pub path: PathBuf,
    pub text: String,
}

/// Result of one extraction.
#[derive(Debug, Clone)]
pub struct ExtractedKey {
    pub private_key: PathBuf,
    /// `None` when decryption failed and the operator chose to continue.
    pub public_key: Option<PublicKey>,
}

impl ExtractedKey {
    pub fn is_decrypted(&self) -> bool {
        self.public_key.is_some()
    }
}

/// Extracts a host's private key from its SOPS secrets file.
#[derive(Debug, Clone)]
pub struct SecretExtractor {
    sops: Tool,
    deriver: KeyDeriver,
}

impl SecretExtractor {
    pub fn new(sops: Tool, deriver: KeyDeriver) -> Self {
        Self { sops, deriver }
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    /// Decrypt `target`'s key into `dest` (at `dest/<target.key_path>`).
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingSecretsPath` if the target has no secrets file
    /// - `ToolError::NotFound` if `sops` is not installed
    /// - `Error::Aborted` if decryption fails and `on_failure` returns `Abort`
    /// - any error deriving the public key after a successful decryption
    pub fn extract(
        &self,
        target: &TargetHost,
        dest: &Path,
        on_failure: &mut dyn FnMut(&DecryptFailure<'_>) -> Decision,
    ) -> Result<ExtractedKey> {
        let secrets = target.secrets_path()?;
        self.sops.ensure_available()?;

        let alias = &target.alias;
        fs::create_dir_all(dest)
            .and_then(|_| set_mode(dest, constants::SCOPE_DIR_MODE))
            .map_err(|source| KeyFileError::CreateDir {
                alias: alias.clone(),
                path: dest.to_path_buf(),
                source,
            })?;

        let key_path = dest.join(&target.key_path);
        if let Some(parent) = key_path.parent() {
            fs::create_dir_all(parent).map_err(|source| KeyFileError::CreateDir {
                alias: alias.clone(),
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = create_private(&key_path).map_err(|source| KeyFileError::Create {
            alias: alias.clone(),
            path: key_path.clone(),
            source,
        })?;
        debug!(path = %key_path.display(), "created key file");

        let selector = format!("[\"{}\"]", target.secret_field);
        let args = [
            OsStr::new("--extract"),
            OsStr::new(&selector),
            OsStr::new("--decrypt"),
            secrets.as_os_str(),
        ];
        let status = self.sops.run_into(args, file)?;

        if !status.success() {
            warn!(
                "Failed reading secret '{}' for '{}'",
                target.secret_field, target.nixosconfig
            );
            let error = ToolError::Failed {
                tool: self.sops.name(),
                status: status.to_string(),
                stderr: String::new(),
            };
            let failure = DecryptFailure {
                target,
                field: &target.secret_field,
                error: &error,
            };
            return match on_failure(&failure) {
                Decision::Continue => {
                    info!(alias = %target.alias, "continuing without decrypted key");
                    Ok(ExtractedKey {
                        private_key: key_path,
                        public_key: None,
                    })
                }
                Decision::Abort => Err(Error::Aborted {
                    field: target.secret_field.clone(),
                    target: target.nixosconfig.clone(),
                }),
            };
        }

        let text = self.deriver.public_key(&key_path)?;
        let pub_path = public_key_path(&key_path);
        fs::write(&pub_path, &text)
            .and_then(|_| set_mode(&pub_path, constants::PUBLIC_KEY_MODE))
            .map_err(|source| KeyFileError::Write {
                alias: alias.clone(),
                path: pub_path.clone(),
                source,
            })?;

        Ok(ExtractedKey {
            private_key: key_path,
            public_key: Some(PublicKey {
                path: pub_path,
                text,
            }),
        })
    }
}

/// `<key>.pub`
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut name = private_key.as_os_str().to_os_string();
    name.push(".pub");
    PathBuf::from(name)
}

/// Create a new file whose mode is restricted at open time.
#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(constants::PRIVATE_KEY_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
