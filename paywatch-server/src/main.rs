//! paywatch server
//!
//! Watches per-store view-only wallets for incoming payments and notifies
//! stores through signed webhooks and customers through a live status socket.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{ConfigLoader, get_database_url};
use paywatch_core::framework::DatabaseProcessor;
use paywatch_core::processors::{
    LiveStatusHub, Notifier, StoreWalletRegistry, WatcherDeps, WebhookSender,
    webhook_delivery_channel,
};
use paywatch_core::wallet::{WalletGateway, check_daemon_network};
use server::{build_router, run_server};
use shutdown::spawn_config_reload_handler;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// paywatch - per-store crypto payment watcher
#[derive(Parser, Debug)]
#[command(name = "paywatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./paywatch-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting paywatch-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config, args.listen));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // The daemon must run on the configured network before any wallet opens
    check_daemon_network(&loaded_config.wallet)
        .await
        .map_err(|e| {
            tracing::error!("Wallet daemon check failed: {}", e);
            e
        })?;

    let shared_config = loaded_config.shared();

    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Watcher wiring
    let wallets = WalletGateway::new(&loaded_config.wallet)?;
    let live = LiveStatusHub::new();
    let (webhook_tx, webhook_rx) = webhook_delivery_channel();
    let deps = WatcherDeps {
        store: Arc::new(DatabaseProcessor::new(db_pool.clone())),
        notifier: Notifier::new(webhook_tx, live.clone()),
        policy: Arc::clone(&shared_config.policy),
        config: loaded_config.watcher,
    };
    let registry = Arc::new(StoreWalletRegistry::new(Arc::new(wallets), deps));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let webhook_sender = WebhookSender::new(webhook_rx, shutdown_rx, &loaded_config.webhook);
    let webhook_task = tokio::spawn(webhook_sender.run());

    // Nothing from a previous run is being watched any more
    let report = registry.reconcile_pending_payments().await?;
    tracing::info!(
        rows_updated = report.rows_updated,
        "Startup reconciliation finished"
    );

    let state = AppState::new(Arc::clone(&registry), live, shared_config);

    // Spawn config reload handler (listens for SIGHUP)
    let shutdown_notify = spawn_config_reload_handler(state.clone(), config_loader);

    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", loaded_config.listen);
    let result = run_server(router, loaded_config.listen).await;

    shutdown_notify.notify_one();

    // Settle everything still pending before the watchers go away
    match registry.reconcile_pending_payments().await {
        Ok(report) => tracing::info!(
            wallets_stopped = report.wallets_stopped,
            payments_notified = report.payments_notified,
            rows_updated = report.rows_updated,
            "Shutdown reconciliation finished"
        ),
        Err(e) => tracing::error!("Shutdown reconciliation failed: {}", e),
    }

    // Flush queued webhooks
    let _ = shutdown_tx.send(true);
    if let Err(e) = webhook_task.await {
        tracing::error!("Webhook sender task failed: {}", e);
    }

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
