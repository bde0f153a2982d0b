//! Granary - self-hosted file CDN

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use granary::{Args, FileStore, GranaryError, HttpServer, Registry, SettingsStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("granary={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let registry = Arc::new(Registry::new());

    // A missing catalog file is first-run state: create an empty one so
    // later saves and inspections have a file to work with. Any other
    // load failure leaves the catalog empty and the server running.
    match registry.load_domains(&args.domains_config).await {
        Ok(count) => {
            info!(count, path = %args.domains_config.display(), "Loaded domain catalog")
        }
        Err(GranaryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %args.domains_config.display(), "Domain catalog not found, creating empty file");
            if let Err(e) = registry.save_domains(&args.domains_config).await {
                warn!(error = %e, "Failed to create empty domain catalog");
            }
        }
        Err(e) => warn!(error = %e, "Failed to load domain catalog"),
    }

    match registry.load_categories(&args.categories_config).await {
        Ok(count) => {
            info!(count, path = %args.categories_config.display(), "Loaded category catalog")
        }
        Err(GranaryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %args.categories_config.display(), "Category catalog not found, creating empty file");
            if let Err(e) = registry.save_categories(&args.categories_config).await {
                warn!(error = %e, "Failed to create empty category catalog");
            }
        }
        Err(e) => warn!(error = %e, "Failed to load category catalog"),
    }

    let file_store = Arc::new(FileStore::new(&args.storage_path).await?);
    let settings = Arc::new(SettingsStore::new(&args.settings_path).await?);

    let domain_count = registry.list_domains().await.len();
    let category_count = registry.list_categories().await.len();
    let binding_count = settings.list_channels().await.len();

    info!("======================================");
    info!("  Granary - self-hosted file CDN");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Storage: {}", args.storage_path.display());
    info!("Domains: {}", domain_count);
    info!("Categories: {}", category_count);
    info!("Channel bindings: {}", binding_count);
    info!("======================================");

    let server = Arc::new(HttpServer::new(
        Arc::clone(&registry),
        Arc::clone(&file_store),
        args.listen,
    ));

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    info!("Shutdown complete");
    Ok(())
}
