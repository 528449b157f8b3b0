//! `authvault code` — print the current TOTP code.

use crate::cli::Cli;
use crate::errors::Result;
use crate::vault::VaultService;

/// Execute the `code` command.
///
/// The bare code goes to stdout so it can be piped; its source goes to
/// stderr.
pub async fn execute(
    cli: &Cli,
    service: &VaultService,
    label: Option<&str>,
    secret: Option<&str>,
) -> Result<()> {
    let generated = service.code(&cli.user, label, secret).await?;

    println!("{}", generated.code);
    eprintln!("source: {}, valid ~30s", generated.source);

    Ok(())
}
