//! Bondrisk server entry point.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bondrisk_engine::RiskServiceBuilder;
use bondrisk_ext_file::{CsvCurveSource, InMemoryCacheBackend};
use bondrisk_server::{Server, ServerConfig};
use bondrisk_traits::{CurveSource, IdentityStore, PortfolioStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,bondrisk=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Bondrisk Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/bondrisk.toml".to_string());

    let server_config = if std::path::Path::new(&config_path).exists() {
        info!("Loading configuration from {}", config_path);
        ServerConfig::from_file(&config_path)?
    } else {
        info!("Using default configuration");
        ServerConfig::default()
    };

    // Create storage
    let (identity, portfolios): (Arc<dyn IdentityStore>, Arc<dyn PortfolioStore>) =
        match &server_config.storage_path {
            Some(path) => {
                info!("Opening redb storage at {}", path);
                let stores = bondrisk_ext_redb::create_redb_stores(path)
                    .with_context(|| format!("opening {path}"))?;
                (
                    stores.identity as Arc<dyn IdentityStore>,
                    stores.portfolios as Arc<dyn PortfolioStore>,
                )
            }
            None => {
                info!("Using in-memory storage");
                let stores = bondrisk_ext_file::create_in_memory_stores();
                (
                    stores.identity as Arc<dyn IdentityStore>,
                    stores.portfolios as Arc<dyn PortfolioStore>,
                )
            }
        };

    // Initial curve
    let curve_source: Option<Arc<dyn CurveSource>> = server_config.curve_file.as_ref().map(|file| {
        Arc::new(CsvCurveSource::new(file, server_config.curve_name.clone())) as Arc<dyn CurveSource>
    });
    let curve = match &curve_source {
        Some(source) => source
            .latest_curve()
            .await
            .context("loading initial curve")?,
        None => server_config.initial_curve(Utc::now().date_naive())?,
    };
    info!(curve = curve.name(), points = curve.len(), "initial curve loaded");

    // Build service
    let service = RiskServiceBuilder::new()
        .with_config(server_config.engine.clone())
        .with_identity(identity)
        .with_portfolios(portfolios)
        .with_cache_backend(Arc::new(InMemoryCacheBackend::new()))
        .with_curve(curve)
        .build()?;

    // Start server, refreshing the curve in the background
    let mut server = Server::new(server_config, Arc::new(service));
    if let Some(source) = curve_source {
        server = server.with_curve_source(source);
    }
    server.start().await?;

    Ok(())
}
