// Tracked Accounts - Main Entry Point
//
// Loads configuration, wires the identity resolver, entitlement client and
// account store into the service, and serves the HTTP interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use tracked_accounts::accounts::AccountService;
use tracked_accounts::config::{Config, StoreBackend, StoreConfig};
use tracked_accounts::entitlement::HttpEntitlementClient;
use tracked_accounts::identity::UserProfileResolver;
use tracked_accounts::store::{AccountStore, InMemoryAccountStore, SqliteAccountStore};
use tracked_accounts::web::{self, AppState};
use tracked_accounts::{metrics, telemetry};

/// Tracked Accounts: plan-capped account registry
#[derive(Parser, Debug)]
#[command(name = "tracked-accounts")]
#[command(author = "Tracked Accounts Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Quota-enforced tracked account registry", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Configuration file (defaults to the XDG config directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load and validate the configuration, then print it
    CheckConfig {
        /// Configuration file (defaults to the XDG config directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Serve { config } => {
            let config = load_config(config.as_ref())?;
            telemetry::init_tracing(&config.logging, args.verbose)?;
            serve(config).await?;
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config.as_ref())?;
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("Configuration OK");
            println!("{}", rendered);
        }
    }

    Ok(())
}

fn open_store(config: &StoreConfig) -> Result<Arc<dyn AccountStore>> {
    let store: Arc<dyn AccountStore> = match config.backend {
        StoreBackend::Sqlite => Arc::new(
            SqliteAccountStore::open(&config.sqlite_path)
                .with_context(|| format!("Failed to open SQLite store {}", config.sqlite_path))?,
        ),
        StoreBackend::Memory => Arc::new(InMemoryAccountStore::new()),
    };
    Ok(store)
}

async fn serve(config: Config) -> Result<()> {
    info!("Tracked Accounts v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        metrics::init().context("Failed to initialize metrics")?;
    }

    let issuer = config.issuer()?;
    let timeout = config.request_timeout();

    let store = open_store(&config.store)?;
    let identity = UserProfileResolver::new(&issuer, timeout)
        .context("Failed to build identity resolver")?;
    let entitlements = HttpEntitlementClient::new(issuer.clone(), timeout)
        .context("Failed to build entitlement client")?;

    info!(
        issuer = %issuer,
        store = store.name(),
        enforcement = %config.quota.enforcement,
        feature_key = %config.entitlements.feature_key,
        "Service configured"
    );

    let service = AccountService::new(Arc::new(identity), Arc::new(entitlements), store)
        .with_enforcement(config.quota.enforcement)
        .with_feature_key(config.entitlements.feature_key.clone());

    let state = AppState::new(Arc::new(service), &config.identity.session_cookie)
        .with_metrics(config.metrics.enabled);

    web::serve(config.bind_addr()?, web::router(state)).await
}
