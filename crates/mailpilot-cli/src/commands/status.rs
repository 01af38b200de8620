//! `mailpilot status` -- show resolved configuration.

use clap::Args;

use mailpilot_types::config::discover_config_path;

/// Arguments for `mailpilot status`.
#[derive(Args)]
pub struct StatusArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Print configuration diagnostics.
pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let source = match &args.config {
        Some(path) => path.clone(),
        None => discover_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults, no config file found)".into()),
    };
    let config = super::load_config(args.config.as_deref())?;

    println!("mailpilot status");
    println!("  config:        {source}");
    println!(
        "  server:        {}:{}",
        config.server.host, config.server.port
    );
    println!(
        "  gmail client:  {}",
        if config.gmail.client_id.is_empty() {
            "not configured"
        } else {
            "configured"
        }
    );
    println!(
        "  pubsub topic:  {}",
        if config.gmail.pubsub_topic.is_empty() {
            "not configured"
        } else {
            &config.gmail.pubsub_topic
        }
    );
    println!("  accounts:      {}", config.gmail.accounts.len());
    println!(
        "  llm:           {} via {} ({})",
        config.llm.model,
        config.llm.base_url,
        if std::env::var(&config.llm.api_key_env).is_ok() {
            "key present"
        } else {
            "key missing"
        }
    );
    println!(
        "  auth secret:   {}",
        if config.auth.token_secret.is_empty() {
            "not configured"
        } else {
            "configured"
        }
    );
    Ok(())
}
