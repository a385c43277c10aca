//! Contacts API server

use contacts_api::{build_app, connect_stores, mailer_from_config, ApiError, AppConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "contacts_api=info,tower_http=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!("Server failed: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ApiError> {
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    tokio::fs::create_dir_all(&config.avatars_dir).await?;
    tokio::fs::create_dir_all(&config.temp_dir).await?;

    let (users, contacts) = connect_stores(&config).await?;
    let mailer = mailer_from_config(&config)?;
    let app = build_app(&config, users, contacts, mailer)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
