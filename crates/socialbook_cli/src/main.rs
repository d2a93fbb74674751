//! `socialbook` command-line front end over the core store.
//!
//! # Responsibility
//! - Resolve configuration (file, environment, flags) and open the backend.
//! - Run one command against a hydrated store, then shut it down cleanly.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use log::warn;
use socialbook_core::{init_logging, AppConfig, SocialStore, StorageBackend, StoreOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)?;
    config.apply_env()?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(user) = cli.user.clone() {
        config.user = Some(user);
    }
    if let Some(log_dir) = config.log_dir.clone() {
        init_logging(&config.log_level, &log_dir)?;
    }

    let opened = StorageBackend::from_config(&config)?;
    let store = SocialStore::with_options(
        opened.adapter,
        opened.prefs,
        StoreOptions::from_config(&config),
    );
    if let Err(err) = store.hydrate().await {
        // Refuse to run commands that would overwrite unread data.
        warn!("event=cli_hydrate module=core status=error error_code={}", err.code());
        store.shutdown().await;
        return Err(err.into());
    }

    let result = commands::run(&store, &config, &cli.config, cli.command).await;
    store.shutdown().await;
    result
}
