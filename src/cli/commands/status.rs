//! `authvault status` — show label count, default and storage details.

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::VaultService;

/// Execute the `status` command.
pub async fn execute(cli: &Cli, service: &VaultService) -> Result<()> {
    let status = service.status(&cli.user).await?;

    output::info(&format!("Labels saved: {}", status.label_count));
    match &status.default_label {
        Some(label) => output::info(&format!("Default label: {label}")),
        None => output::info("Default label: none"),
    }
    output::info(&format!(
        "Encryption: {}",
        if status.encryption_enabled { "ON" } else { "OFF" }
    ));
    output::info(&format!("Storage: {}", status.storage_mode));

    if !status.encryption_enabled {
        output::tip("Set SECRET_ENCRYPTION_KEY_BASE64 (64 random bytes) to encrypt secrets at rest.");
    }

    Ok(())
}
