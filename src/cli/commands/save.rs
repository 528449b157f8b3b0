//! `authvault save` — store a Base32 secret under a label.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::VaultService;

/// Execute the `save` command.
pub async fn execute(cli: &Cli, service: &VaultService, label: &str, secret: &str) -> Result<()> {
    output::warning("Secret provided on command line — it may appear in shell history.");

    let outcome = service.save(&cli.user, label, secret).await?;

    let verb = if outcome.replaced { "Updated" } else { "Saved" };
    let suffix = if outcome.encrypted { " (encrypted)" } else { "" };
    output::success(&format!("{verb} secret '{}'{suffix}", outcome.label));

    if outcome.is_default {
        output::tip(&format!(
            "`{}` is your default label — run `authvault code` to get a code.",
            outcome.label
        ));
    } else {
        output::tip(&format!("Run `authvault code {}` to get a code.", outcome.label));
    }

    Ok(())
}
