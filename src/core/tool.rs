//! External tool invocation.
//!
//! Every operation in fleetkeys is a thin sequence of calls to `sops`,
//! `ssh-keygen`, `ssh-to-age`, `ssh` and `scp`. Calls block until the tool
//! exits; there are no timeouts beyond what the tools enforce themselves.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, trace};

use crate::error::{Result, ToolError};

/// A named external program.
#[derive(Debug, Clone)]
pub struct Tool {
    name: &'static str,
    program: String,
}

impl Tool {
    /// `name` is used in messages; `program` is resolved on `PATH` (or used
    /// as-is if it contains a path separator).
    pub fn new(name: &'static str, program: impl Into<String>) -> Self {
        Self {
            name,
            program: program.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check the tool is installed.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::NotFound` if the program cannot be resolved.
    pub fn ensure_available(&self) -> Result<PathBuf> {
        which::which(&self.program).map_err(|source| {
            ToolError::NotFound {
                tool: self.name,
                program: self.program.clone(),
                source,
            }
            .into()
        })
    }

    fn command<I, S>(&self, args: I) -> Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.ensure_available()?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        debug!(tool = self.name, args = ?cmd.get_args().collect::<Vec<_>>(), "running");
        Ok(cmd)
    }

    fn spawn_error(&self, source: std::io::Error) -> crate::error::Error {
        ToolError::Spawn {
            tool: self.name,
            source,
        }
        .into()
    }

    fn failed(&self, status: ExitStatus, stderr: &[u8]) -> crate::error::Error {
        ToolError::Failed {
            tool: self.name,
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).to_string(),
        }
        .into()
    }

    /// Run and capture stdout as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Failed` on a nonzero exit.
    pub fn output<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(args)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(self.failed(output.status, &output.stderr));
        }
        self.text(output.stdout)
    }

    /// Run with `input` written to stdin and capture stdout.
    pub fn output_with_stdin<I, S>(&self, args: I, input: &str) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut child = self
            .command(args)?
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| self.spawn_error(e))?;
        }

        let output = child.wait_with_output().map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(self.failed(output.status, &output.stderr));
        }
        self.text(output.stdout)
    }

    /// Run with stdout redirected into `stdout`, returning the exit status
    /// without judging it. Stderr passes through to the operator.
    pub fn run_into<I, S>(&self, args: I, stdout: File) -> Result<ExitStatus>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let status = self
            .command(args)?
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .status()
            .map_err(|e| self.spawn_error(e))?;
        trace!(tool = self.name, %status, "exited");
        Ok(status)
    }

    /// Run with inherited stdio.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::Failed` on a nonzero exit.
    pub fn run<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let status = self
            .command(args)?
            .stdin(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(self.failed(status, &[]));
        }
        Ok(())
    }

    /// Run and return the raw exit status plus captured stdout/stderr.
    pub fn probe<I, S>(&self, args: I) -> Result<(ExitStatus, String, String)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .command(args)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok((
            output.status,
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ))
    }

    fn text(&self, stdout: Vec<u8>) -> Result<String> {
        String::from_utf8(stdout).map_err(|e| {
            ToolError::InvalidOutput {
                tool: self.name,
                reason: format!("UTF-8 error: {}", e),
            }
            .into()
        })
    }
}
