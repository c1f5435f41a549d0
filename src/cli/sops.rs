//! Update-sops-files command.
//!
//! Re-encrypts every SOPS file in the repository for the current `.sops.yaml`
//! recipients.

use crate::cli::{output, Context};
use crate::core::sops;
use crate::core::tool::Tool;
use crate::error::Result;

/// Run `sops updatekeys` across the repository holding the config.
pub fn execute(ctx: &Context) -> Result<()> {
    let tool = Tool::new("sops", &ctx.config.tools.sops);
    let summary = sops::update_keys(&ctx.config.root, &tool)?;

    if summary.updated.is_empty() {
        output::dimmed("no sops files found");
    } else {
        output::success(&format!("updated {} sops files", summary.updated.len()));
    }
    Ok(())
}
