//! `authvault remove` — delete a saved secret.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::validate::normalize_label;
use crate::vault::VaultService;

/// Execute the `remove` command.
pub async fn execute(cli: &Cli, service: &VaultService, label: &str) -> Result<()> {
    let new_default = service.remove(&cli.user, label).await?;

    output::success(&format!("Removed label '{}'", normalize_label(label)));
    match new_default {
        Some(default) => output::info(&format!("Default label is now '{default}'")),
        None => output::info("No default label set."),
    }

    Ok(())
}
