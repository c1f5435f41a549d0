//! Remote shell and copy transport.
//!
//! Commands run over `ssh`, files move over `scp`. Host-key verification is
//! chosen per call so that the one place that disables it stays visible.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::config::{HostKeyMode, Tools};
use crate::core::constants;
use crate::core::registry::TargetHost;
use crate::core::tool::Tool;
use crate::error::{Result, ToolError};

/// ssh exit status when the connection itself failed or was dropped.
pub const SSH_CONNECTION_ERROR: i32 = 255;

/// How a remote call verifies the host's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyCheck {
    /// Only hosts already present in the operator's known_hosts.
    Strict,
    /// Record unknown hosts, refuse changed keys.
    AcceptNew,
    /// Accept only this exact key list (a known_hosts file).
    Pinned(PathBuf),
    /// No verification at all. Only valid while bootstrapping the very
    /// identity that would otherwise be checked.
    Disabled,
}

impl From<HostKeyMode> for HostKeyCheck {
    fn from(mode: HostKeyMode) -> Self {
        match mode {
            HostKeyMode::Strict => Self::Strict,
            HostKeyMode::AcceptNew => Self::AcceptNew,
        }
    }
}

impl HostKeyCheck {
    fn options(&self) -> Vec<OsString> {
        let settings: Vec<OsString> = match self {
            Self::Strict => vec!["StrictHostKeyChecking=yes".into()],
            Self::AcceptNew => vec!["StrictHostKeyChecking=accept-new".into()],
            Self::Pinned(known_hosts) => {
                let mut file = OsString::from("UserKnownHostsFile=");
                file.push(known_hosts.as_os_str());
                vec!["StrictHostKeyChecking=yes".into(), file]
            }
            Self::Disabled => vec![
                "StrictHostKeyChecking=no".into(),
                "UserKnownHostsFile=/dev/null".into(),
            ],
        };
        settings
            .into_iter()
            .flat_map(|s| [OsString::from("-o"), s])
            .collect()
    }
}

/// Outcome of a remote command whose failure the caller wants to inspect.
#[derive(Debug, Clone)]
pub struct RemoteOutput {
    /// Exit code, `None` if killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RemoteOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Operations the provisioner needs from a remote host.
pub trait Remote {
    /// `host:port`, for messages.
    fn address(&self) -> String;

    /// Run a shell command, capture stdout; nonzero exit is an error.
    fn run(&self, command: &str, check: &HostKeyCheck) -> Result<String>;

    /// Run a shell command, returning its outcome regardless of exit code.
    fn probe(&self, command: &str, check: &HostKeyCheck) -> Result<RemoteOutput>;

    /// Recursively copy local `sources` into the remote directory `dest`.
    fn copy(&self, sources: &[PathBuf], dest: &str, check: &HostKeyCheck) -> Result<()>;
}

/// [`Remote`] over the OpenSSH client tools.
#[derive(Debug, Clone)]
pub struct SshRemote {
    ssh: Tool,
    scp: Tool,
    hostname: String,
    port: u16,
    connect_timeout_secs: u64,
}

impl SshRemote {
    pub fn new(ssh: Tool, scp: Tool, hostname: impl Into<String>, port: u16) -> Self {
        Self {
            ssh,
            scp,
            hostname: hostname.into(),
            port,
            connect_timeout_secs: constants::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Options shared by ssh and scp: never prompt, bound the connect phase.
    fn base_options(&self) -> Vec<OsString> {
        vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", self.connect_timeout_secs).into(),
        ]
    }

    pub fn for_target(tools: &Tools, target: &TargetHost) -> Self {
        Self::new(
            Tool::new("ssh", &tools.ssh),
            Tool::new("scp", &tools.scp),
            target.hostname.clone(),
            target.port,
        )
    }

    fn ssh_args(&self, command: &str, check: &HostKeyCheck) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-p".into(), self.port.to_string().into()];
        args.extend(self.base_options());
        args.extend(check.options());
        args.push(self.hostname.clone().into());
        args.push("--".into());
        args.push(command.into());
        args
    }
}

impl Remote for SshRemote {
    fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    fn run(&self, command: &str, check: &HostKeyCheck) -> Result<String> {
        debug!(host = %self.address(), command, "remote run");
        self.ssh.output(self.ssh_args(command, check))
    }

    fn probe(&self, command: &str, check: &HostKeyCheck) -> Result<RemoteOutput> {
        debug!(host = %self.address(), command, "remote probe");
        let (status, stdout, stderr) = self.ssh.probe(self.ssh_args(command, check))?;
        Ok(RemoteOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }

    fn copy(&self, sources: &[PathBuf], dest: &str, check: &HostKeyCheck) -> Result<()> {
        if sources.is_empty() {
            return Err(ToolError::InvalidOutput {
                tool: self.scp.name(),
                reason: "nothing to copy".to_string(),
            }
            .into());
        }

        let mut args = self.base_options();
        args.extend(check.options());
        args.push("-P".into());
        args.push(self.port.to_string().into());
        args.push("-r".into());
        args.extend(sources.iter().map(|s| s.as_os_str().to_os_string()));
        args.push(format!("{}:{}", self.hostname, dest).into());

        debug!(host = %self.address(), dest, files = sources.len(), "remote copy");
        self.scp.output(args).map(|_| ())
    }
}

/// Immediate entries of `dir`, sorted, as copy sources.
pub fn dir_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
