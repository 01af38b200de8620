//! `mailpilot token` -- bearer-token management.

use anyhow::bail;
use chrono::Duration;
use clap::{Args, Subcommand};

use mailpilot_core::HmacAuthVerifier;

/// Arguments for `mailpilot token`.
#[derive(Args)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenAction {
    /// Mint a bearer token for an identity.
    Issue {
        /// Identity (mailbox address) the token is issued for.
        #[arg(long)]
        identity: String,

        /// Token lifetime in hours.
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,

        /// Config file path (overrides auto-discovery).
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Run a token subcommand.
pub fn run(args: TokenArgs) -> anyhow::Result<()> {
    match args.action {
        TokenAction::Issue {
            identity,
            ttl_hours,
            config,
        } => {
            let config = super::load_config(config.as_deref())?;
            if config.auth.token_secret.is_empty() {
                bail!("auth.token_secret is not configured");
            }
            let verifier = HmacAuthVerifier::new(&config.auth.token_secret);
            let token = verifier.mint(&identity, Duration::hours(ttl_hours));
            println!("{token}");
            Ok(())
        }
    }
}
