use dotenv::dotenv;
use tokio::sync::oneshot;

mod analytics;
mod channels;
mod commands;
mod config;
mod db;
mod logging;
mod render;
mod store;

use analytics::Analytics;
use channels::ProfilerHandler;
use commands::CommandContext;
use config::Config;
use store::ProfileStore;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log_level, config.log_dir.as_deref());

    log::info!("Opening profile store at {}", config.database_url);
    let store = ProfileStore::open(&config.database_url);

    // Commands wait on readiness themselves; this only reports a failed load early
    let watcher = store.clone();
    tokio::spawn(async move {
        if let Err(e) = watcher.ready().await {
            log::error!("Profile store unavailable, commands will fail: {}", e);
        }
    });

    let analytics = Analytics::from_config(config.analytics.as_ref());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown requested");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                log::warn!("Could not listen for shutdown signal: {}", e);
                // Keep the sender alive; dropping it would read as a shutdown request
                let _keep = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    let handler = ProfilerHandler::new(
        CommandContext {
            store,
            prefix: config.prefix.clone(),
        },
        analytics,
        config.delete_delay,
    );

    log::info!("Starting Profiler with prefix [{}]", config.prefix);
    channels::start_discord_listener(
        config.discord_bot_token.clone(),
        config.reconnect.clone(),
        handler,
        shutdown_rx,
    )
    .await;
}
