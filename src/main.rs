//! Mentor Chat - conversational client for a remote answering service
//!
//! A terminal front end over a session state machine that asks, teaches
//! and gives feedback to the answering service, and keeps a per-user
//! conversation history in SQLite.

mod auth;
mod config;
mod console;
mod db;
mod gateway;
mod locale;
mod runtime;
mod state_machine;

use config::AppConfig;
use console::TerminalPrompt;
use db::Database;
use gateway::{HttpGateway, LoggingGateway};
use runtime::DatabaseHistory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentor_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let gateway = LoggingGateway::new(HttpGateway::new(
        &config.gateway_url,
        config.request_timeout,
    )?);
    tracing::info!(
        gateway = %config.gateway_url,
        signed_in = config.identity.is_some(),
        "Starting session"
    );

    let handle = runtime::spawn_session(
        gateway,
        DatabaseHistory::new(db),
        TerminalPrompt,
        config.reveal_delay,
    );

    console::run(handle, config.identity).await?;
    Ok(())
}
