//! `mailpilot serve` -- run the HTTP server.

use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mailpilot_core::{
    EventHub, HmacAuthVerifier, IdentityStore, MemoryIdentityStore, Reconciler, WatchRegistrar,
};
use mailpilot_gmail::{GmailClient, MailboxProvider};
use mailpilot_llm::{ChatProvider, OpenAiCompatProvider};
use mailpilot_server::{build_router, ApiState};
use mailpilot_types::identity::{IdentityRecord, MailCredentials};
use mailpilot_types::secret::SecretString;

/// Arguments for `mailpilot serve`.
#[derive(Args)]
pub struct ServeArgs {
    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,

    /// Bind address (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config).
    #[arg(long)]
    pub port: Option<u16>,
}

/// Run the server until a shutdown signal arrives.
pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store: Arc<MemoryIdentityStore> = Arc::new(MemoryIdentityStore::new());
    for account in &config.gmail.accounts {
        store
            .upsert(IdentityRecord::new(
                &account.email,
                MailCredentials {
                    access_token: SecretString::default(),
                    refresh_token: account.refresh_token.clone(),
                },
            ))
            .await;
    }
    info!(accounts = config.gmail.accounts.len(), "identity store seeded");

    let store: Arc<dyn IdentityStore> = store;
    let mailbox: Arc<dyn MailboxProvider> = Arc::new(GmailClient::new(&config.gmail));
    let chat: Arc<dyn ChatProvider> = Arc::new(OpenAiCompatProvider::new(config.llm.clone()));

    let state = ApiState {
        hub: Arc::new(EventHub::new()),
        store: store.clone(),
        mailbox: mailbox.clone(),
        chat,
        auth: Arc::new(HmacAuthVerifier::new(&config.auth.token_secret)),
        registrar: Arc::new(WatchRegistrar::new(
            store.clone(),
            mailbox.clone(),
            config.gmail.pubsub_topic.clone(),
        )),
        reconciler: Arc::new(Reconciler::new(store, mailbox)),
        chat_model: config.llm.model.clone(),
    };

    let router = build_router(state, &config.server.cors_origins);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "mailpilot server listening");

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
        signal_token.cancel();
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}
