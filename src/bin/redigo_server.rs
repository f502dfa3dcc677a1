//! Thin entry point: parses configuration, initializes tracing, builds the
//! key store, and hands off to [`redigo::server::run`].

use clap::Parser as _;
use redigo::{config::ServerConfig, server, Cli, SimpleStore};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match ServerConfig::load(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("redigo-server: {err}");
            return std::process::ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let store: Box<dyn redigo::KeyStore> = Box::new(SimpleStore::new());

    match server::run(config, store).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}
