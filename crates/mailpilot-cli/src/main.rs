//! `mailpilot` -- CLI binary for the mailpilot email assistant backend.
//!
//! Subcommands:
//!
//! - `mailpilot serve` -- run the HTTP server (push endpoint, SSE
//!   streams, mailbox and chat routes).
//! - `mailpilot status` -- show resolved configuration and diagnostics.
//! - `mailpilot token issue` -- mint a bearer token for an identity.

use clap::{Parser, Subcommand};

mod commands;

/// mailpilot email assistant CLI.
#[derive(Parser)]
#[command(name = "mailpilot", about = "mailpilot email assistant CLI", version)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve(commands::serve::ServeArgs),

    /// Show configuration status.
    Status(commands::status::StatusArgs),

    /// Manage bearer tokens.
    Token(commands::token::TokenArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args).await,
        Commands::Status(args) => commands::status::run(args),
        Commands::Token(args) => commands::token::run(args),
    }
}
