//! Install-host-keys command.
//!
//! Provisions one target, or every target in configuration order. Each
//! target runs to completion before the next starts; the first failure
//! stops the run.

use tracing::info;

use crate::cli::{output, prompt, Context};
use crate::core::provision::Provisioner;
use crate::core::registry::TargetHost;
use crate::core::remote::SshRemote;
use crate::error::Result;

/// Install host keys for `alias`, or for all targets when `None`.
pub fn execute(ctx: &Context, alias: Option<&str>) -> Result<()> {
    let targets: Vec<&TargetHost> = match alias {
        Some(alias) => vec![ctx.registry.lookup(alias)?],
        None => ctx.registry.iter().collect(),
    };

    let extractor = ctx.extractor();
    for target in targets {
        info!(alias = %target.alias, host = %target.address(), "installing host key");
        let remote = SshRemote::for_target(&ctx.config.tools, target)
            .with_connect_timeout(ctx.config.provision.connect_timeout_secs);
        let report = Provisioner::new(&remote, &extractor, &ctx.config.provision)
            .install_host_key(target, &mut prompt::confirm_continue)?;

        if report.decrypted {
            output::success(&format!(
                "installed host key for {}",
                output::alias(&report.alias)
            ));
            output::kv("host", target.address());
            if let Some(system) = report.remote_info.lines().next() {
                output::kv("system", system);
            }
        } else {
            output::warn(&format!(
                "{} rebooted without a decrypted host key",
                output::alias(&report.alias)
            ));
        }
    }
    Ok(())
}
