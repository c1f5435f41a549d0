//! Print-keys command.
//!
//! Decrypts a host's private key into a scoped temporary directory and prints
//! the SSH public key and age key derived from it.

use tracing::info;

use crate::cli::{output, prompt, Context};
use crate::error::Result;

/// Print SSH and age public keys for `alias`.
pub fn execute(ctx: &Context, alias: &str) -> Result<()> {
    let target = ctx.registry.lookup(alias)?;
    let extractor = ctx.extractor();

    let scope = tempfile::Builder::new().prefix("fleetkeys-").tempdir()?;
    let key = extractor.extract(target, scope.path(), &mut prompt::confirm_continue)?;
    info!(alias, decrypted = key.is_decrypted(), "extracted host key");

    // Derived again from the file so a key left empty by a declined-but-continued
    // decryption fails here with ssh-keygen's own error.
    let public_key = extractor.deriver().public_key(&key.private_key)?;
    let age_key = extractor.deriver().age_key(&public_key)?;

    output::data("###### Public keys ######");
    output::data(public_key.trim_end());
    output::blank();
    output::data("###### Age keys ######");
    output::data(age_key.trim_end());
    Ok(())
}
