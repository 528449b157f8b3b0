//! `authvault list` — display saved labels in a table.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::VaultService;

/// Execute the `list` command.
pub async fn execute(cli: &Cli, service: &VaultService) -> Result<()> {
    let listing = service.list(&cli.user).await?;

    if !listing.labels.is_empty() {
        output::info(&format!("{} saved label(s)", listing.labels.len()));
    }
    output::print_labels_table(&listing);

    Ok(())
}
