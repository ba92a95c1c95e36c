use std::sync::Arc;

use anyhow::Context;
use qa_relay::config::Config;
use qa_relay::line::LineClient;
use qa_relay::media::{ImgurClient, MediaHost};
use qa_relay::notion::{NotionClient, QuestionStore};
use qa_relay::relay::Relay;
use qa_relay::server;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    info!(
        bind = %config.bind_addr,
        database = %config.notion_database_id,
        reply_match = ?config.reply_match,
        image_policy = ?config.image_policy,
        "Starting qa-relay"
    );

    let store = Arc::new(NotionClient::new(
        config.notion_token.clone(),
        config.notion_database_id.clone(),
        config.fields.clone(),
    ));

    // Fail fast when the configured field map doesn't match the database.
    store
        .validate_schema()
        .await
        .context("Notion schema validation failed")?;
    info!("Notion schema validated");

    let messenger = Arc::new(LineClient::new(config.line_token.clone()));
    let media = config
        .imgur_client_id
        .clone()
        .map(|client_id| Arc::new(ImgurClient::new(client_id)) as Arc<dyn MediaHost>);

    let relay = Arc::new(Relay::new(
        messenger,
        store,
        media,
        config.reply_match,
        config.image_policy,
    ));
    let app = server::router(relay);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Webhook server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
