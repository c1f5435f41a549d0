//! Host key provisioning.
//!
//! Installs a decrypted SSH host key on a remote host and reboots it:
//!
//! ```text
//! Idle → ConnectivityChecked → LocalKeyDecrypted → RemoteCopyComplete
//!      → RemoteKeyInstalled → RebootTriggered → PostRebootVerified
//! ```
//!
//! Any failing step aborts the run. Nothing is retried except the
//! post-reboot reachability poll. Once the key has been staged on the remote
//! host, a failure removes the staged copy; nothing else is rolled back.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::core::config::ProvisionSettings;
use crate::core::constants;
use crate::core::extract::{Decision, DecryptFailure, ExtractedKey, SecretExtractor};
use crate::core::registry::TargetHost;
use crate::core::remote::{dir_entries, HostKeyCheck, Remote, SSH_CONNECTION_ERROR};
use crate::error::{ConnectivityError, Result, ToolError};

/// Progress of one provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ConnectivityChecked,
    LocalKeyDecrypted,
    RemoteCopyComplete,
    RemoteKeyInstalled,
    RebootTriggered,
    PostRebootVerified,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ConnectivityChecked => "connectivity checked",
            Self::LocalKeyDecrypted => "local key decrypted",
            Self::RemoteCopyComplete => "remote copy complete",
            Self::RemoteKeyInstalled => "remote key installed",
            Self::RebootTriggered => "reboot triggered",
            Self::PostRebootVerified => "post-reboot verified",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub alias: String,
    pub stage: Stage,
    /// False if the operator continued past a failed decryption.
    pub decrypted: bool,
    /// `nix-info; uname -a` output after the reboot.
    pub remote_info: String,
}

/// Exponential backoff schedule bounded by an overall timeout.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    pub timeout: Duration,
}

impl Backoff {
    pub fn from_settings(settings: &ProvisionSettings) -> Self {
        Self {
            initial: Duration::from_millis(settings.verify_initial_delay_ms),
            max: Duration::from_millis(settings.verify_max_delay_ms),
            timeout: Duration::from_millis(settings.verify_timeout_ms),
        }
    }

    /// Wait before each attempt: `initial`, doubling up to `max`, never
    /// below 1ms. Unbounded; [`poll`] applies the timeout.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let floor = Duration::from_millis(1);
        let max = self.max.max(floor);
        let first = self.initial.max(floor).min(max);
        std::iter::successors(Some(first), move |d| Some(d.saturating_mul(2).min(max)))
    }
}

/// Sleep per `backoff`, then try; stop at the first success or once
/// `backoff.timeout` has elapsed.
///
/// Elapsed time is the larger of wall-clock time and total sleep, so slow
/// attempts count against the deadline. Sleeps are clamped to the time left;
/// an attempt already running when the deadline passes is not interrupted.
/// On timeout the elapsed time is returned.
pub fn poll<T>(
    backoff: &Backoff,
    sleep: fn(Duration),
    mut attempt: impl FnMut(usize) -> Option<T>,
) -> std::result::Result<T, Duration> {
    let start = Instant::now();
    let mut slept = Duration::ZERO;

    for (n, delay) in backoff.delays().enumerate() {
        let remaining = backoff.timeout.saturating_sub(start.elapsed().max(slept));
        if remaining.is_zero() {
            break;
        }
        let delay = delay.min(remaining);
        sleep(delay);
        slept += delay;
        if let Some(value) = attempt(n + 1) {
            return Ok(value);
        }
    }
    Err(start.elapsed().max(slept))
}

/// Drives one target through the provisioning stages.
pub struct Provisioner<'a, R: Remote> {
    remote: &'a R,
    extractor: &'a SecretExtractor,
    settings: &'a ProvisionSettings,
    sleep: fn(Duration),
}

impl<'a, R: Remote> Provisioner<'a, R> {
    pub fn new(
        remote: &'a R,
        extractor: &'a SecretExtractor,
        settings: &'a ProvisionSettings,
    ) -> Self {
        Self {
            remote,
            extractor,
            settings,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the blocking sleep used between verification attempts.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Install `target`'s host key and reboot it.
    ///
    /// `on_failure` decides whether to continue after a failed decryption.
    pub fn install_host_key(
        &self,
        target: &TargetHost,
        on_failure: &mut dyn FnMut(&DecryptFailure<'_>) -> Decision,
    ) -> Result<ProvisionReport> {
        let mut stage = Stage::Idle;
        let result = self.run(target, on_failure, &mut stage);
        if let Err(e) = &result {
            error!(alias = %target.alias, stage = %stage, "provisioning aborted: {}", e);
        }
        result
    }

    fn run(
        &self,
        target: &TargetHost,
        on_failure: &mut dyn FnMut(&DecryptFailure<'_>) -> Decision,
        stage: &mut Stage,
    ) -> Result<ProvisionReport> {
        let check = HostKeyCheck::from(self.settings.host_key_check);

        let user = self.remote.run("whoami", &check).map_err(|e| {
            error!("No ssh access to the remote host");
            ConnectivityError::Unreachable {
                alias: target.alias.clone(),
                host: self.remote.address(),
                reason: e.to_string(),
            }
        })?;
        debug!(user = user.trim(), "connected");
        self.advance(stage, Stage::ConnectivityChecked);

        let scope = tempfile::Builder::new().prefix("fleetkeys-").tempdir()?;
        let key = self.extractor.extract(target, scope.path(), on_failure)?;
        info!("Host key on local tmp:");
        log_tree(scope.path());
        self.advance(stage, Stage::LocalKeyDecrypted);

        let scope_name = scope
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "fleetkeys".to_string());
        let remote_scope = format!("{}/{}", constants::REMOTE_STAGING_DIR, scope_name);

        self.remote
            .run(&format!("mkdir -p {}", sh_quote(&remote_scope)), &check)?;
        if let Err(e) = self.stage_and_install(target, scope, &remote_scope, &check, stage) {
            self.discard_remote_scope(&remote_scope, &check);
            return Err(e);
        }

        let reboot = self.remote.probe("sudo reboot now", &check)?;
        if !reboot.success() && reboot.code != Some(SSH_CONNECTION_ERROR) {
            return Err(ToolError::Failed {
                tool: "ssh",
                status: match reboot.code {
                    Some(code) => format!("exit status: {}", code),
                    None => "terminated by signal".to_string(),
                },
                stderr: reboot.stderr,
            }
            .into());
        }
        self.advance(stage, Stage::RebootTriggered);

        let remote_info = self.verify(target, &key, &check)?;
        info!("Remote {}", remote_info);
        self.advance(stage, Stage::PostRebootVerified);

        Ok(ProvisionReport {
            alias: target.alias.clone(),
            stage: *stage,
            decrypted: key.is_decrypted(),
            remote_info,
        })
    }

    /// Copy the scoped directory to `remote_scope` and move the key into place.
    fn stage_and_install(
        &self,
        target: &TargetHost,
        scope: TempDir,
        remote_scope: &str,
        check: &HostKeyCheck,
        stage: &mut Stage,
    ) -> Result<()> {
        let sources = dir_entries(scope.path())?;
        // The host's identity is what this run replaces, so there is nothing
        // trustworthy to verify it against yet.
        self.remote
            .copy(&sources, remote_scope, &HostKeyCheck::Disabled)?;
        drop(scope);
        let listing = self
            .remote
            .run(&format!("find {}", sh_quote(remote_scope)), check)?;
        info!("Copied to remote:\n{}", listing.trim_end());
        self.advance(stage, Stage::RemoteCopyComplete);

        info!("Overwrite ssh host key:");
        let staged_key = format!("{}/{}", remote_scope, target.key_path.to_string_lossy());
        self.remote.run(
            &format!(
                "sudo mv {}* {}/",
                sh_quote(&staged_key),
                sh_quote(&self.settings.remote_key_dir)
            ),
            check,
        )?;
        self.remote
            .run(&format!("sudo rm -fr {}", sh_quote(remote_scope)), check)?;
        self.advance(stage, Stage::RemoteKeyInstalled);
        Ok(())
    }

    /// Best-effort removal of a staged key after a failed install.
    fn discard_remote_scope(&self, remote_scope: &str, check: &HostKeyCheck) {
        warn!("Removing staged key from {}", remote_scope);
        // Without sudo: it may be what failed, and the login user owns the copy.
        let command = format!("rm -fr {}", sh_quote(remote_scope));
        if let Err(e) = self.remote.run(&command, check) {
            warn!("failed to remove {}: {}", remote_scope, e);
        }
    }

    /// Poll the rebooted host. When the new public key is known, only that
    /// key is accepted.
    fn verify(&self, target: &TargetHost, key: &ExtractedKey, check: &HostKeyCheck) -> Result<String> {
        let pin_dir = tempfile::Builder::new().prefix("fleetkeys-kh-").tempdir()?;
        let verify_check = match &key.public_key {
            Some(public) => {
                let path = pin_dir.path().join("known_hosts");
                std::fs::write(&path, known_hosts_line(target, &public.text))?;
                HostKeyCheck::Pinned(path)
            }
            None => check.clone(),
        };

        let backoff = Backoff::from_settings(self.settings);
        let found = poll(&backoff, self.sleep, |n| {
            match self.remote.run("nix-info; uname -a", &verify_check) {
                Ok(out) => Some(out.trim().to_string()),
                Err(e) => {
                    debug!(attempt = n, "host not reachable yet: {}", e);
                    None
                }
            }
        });

        found.map_err(|waited| {
            error!("No ssh access to the remote host");
            ConnectivityError::Unconfirmed {
                alias: target.alias.clone(),
                host: self.remote.address(),
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            }
            .into()
        })
    }

    fn advance(&self, stage: &mut Stage, next: Stage) {
        debug!(from = %stage, to = %next, "stage");
        *stage = next;
    }
}

/// known_hosts entry pinning `public_key` (`type base64 [comment]`) to the target.
fn known_hosts_line(target: &TargetHost, public_key: &str) -> String {
    let host = if target.port == 22 {
        target.host().to_string()
    } else {
        format!("[{}]:{}", target.host(), target.port)
    };
    let key: Vec<&str> = public_key.split_whitespace().take(2).collect();
    format!("{} {}\n", host, key.join(" "))
}

fn log_tree(dir: &Path) {
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().flatten() {
        info!("{}", entry.path().display());
    }
}

/// Single-quote for a POSIX shell.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
