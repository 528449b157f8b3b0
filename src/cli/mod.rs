//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use clap::Parser;

/// AuthVault CLI: per-user TOTP secret vault.
#[derive(Parser)]
#[command(
    name = "authvault",
    about = "Per-user TOTP secret vault with encrypted storage",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// User whose vault to operate on
    #[arg(short, long, env = "AUTHVAULT_USER", global = true, default_value = "local")]
    pub user: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Save a Base32 secret under a label
    Save {
        /// Name for this secret, e.g. gmail, github, aws
        label: String,
        /// Base32 secret from the authenticator setup screen
        secret: String,
    },

    /// List saved labels
    List,

    /// Remove a saved secret
    Remove {
        /// Label to remove
        label: String,
    },

    /// Mark a label as the default for `code`
    SetDefault {
        /// Label to mark as default
        label: String,
    },

    /// Print the current 6-digit code
    Code {
        /// Saved label (uses the default label if omitted)
        label: Option<String>,

        /// One-off Base32 secret; nothing is stored
        #[arg(long)]
        secret: Option<String>,
    },

    /// Show vault status
    Status,
}
