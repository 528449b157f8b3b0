//! `authvault set-default` — choose the label `code` uses when none is given.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::VaultService;

/// Execute the `set-default` command.
pub async fn execute(cli: &Cli, service: &VaultService, label: &str) -> Result<()> {
    let label = service.set_default(&cli.user, label).await?;
    output::success(&format!("Default label set to '{label}'"));
    Ok(())
}
