//! Public key derivation.
//!
//! SSH public keys come from `ssh-keygen -y`; age recipients from piping the
//! SSH public key through `ssh-to-age`. Nothing is cached.

use std::ffi::OsStr;
use std::path::Path;
use tracing::trace;

use crate::core::config::Tools;
use crate::core::tool::Tool;
use crate::error::{Result, ToolError};

/// Derives public keys from decrypted host key material.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    keygen: Tool,
    to_age: Tool,
}

impl KeyDeriver {
    pub fn new(keygen: Tool, to_age: Tool) -> Self {
        Self { keygen, to_age }
    }

    pub fn from_tools(tools: &Tools) -> Self {
        Self::new(
            Tool::new("ssh-keygen", &tools.ssh_keygen),
            Tool::new("ssh-to-age", &tools.ssh_to_age),
        )
    }

    /// SSH public key (one line, newline-terminated) for a private key file.
    ///
    /// # Errors
    ///
    /// Fails if the key file is absent or malformed.
    pub fn public_key(&self, private_key: &Path) -> Result<String> {
        trace!(path = %private_key.display(), "deriving public key");
        let args = [OsStr::new("-y"), OsStr::new("-f"), private_key.as_os_str()];
        let out = self.keygen.output(args)?;
        non_empty(self.keygen.name(), out)
    }

    /// age recipient for an SSH public key.
    pub fn age_key(&self, public_key: &str) -> Result<String> {
        trace!("deriving age key");
        let out = self
            .to_age
            .output_with_stdin::<[&str; 0], &str>([], public_key)?;
        non_empty(self.to_age.name(), out)
    }
}

fn non_empty(tool: &'static str, out: String) -> Result<String> {
    if out.trim().is_empty() {
        return Err(ToolError::InvalidOutput {
            tool,
            reason: "empty output".to_string(),
        }
        .into());
    }
    Ok(out)
}
