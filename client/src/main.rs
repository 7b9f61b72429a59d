use clap::Parser;
use client::cli::{self, Cli};
use client::storage::{FileStore, KeyValueStore};
use client::{ApiClient, AppState, Config, SessionManager};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so env-backed flags can come from .env
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;

    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("API: {}", config.api_url);
    tracing::debug!("Session store: {}", config.session_path.display());
    tracing::debug!("Verdict policy: {:?}", config.verdict_policy);

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.session_path));
    let session = Arc::new(SessionManager::new(store));
    if let Err(e) = session.restore().await {
        tracing::warn!("Could not restore session: {}", e);
    }

    let api = ApiClient::from_config(&config)?;
    let state = AppState::new(api, session, config.verdict_policy);

    if let Err(e) = cli::run(cli.command, &state, &config).await {
        tracing::error!("{}", e);
        eprintln!("{}", cli::failure_message(&e));
        std::process::exit(1);
    }

    Ok(())
}
