/*
localnews - server main.rs
This binary loads configuration, wires the place resolver and the search provider, and
starts the Rocket HTTP server.
*/

use anyhow::{Context, Result};
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use localnews::geocoding::{NominatimResolver, PlaceResolver};
use localnews::llm::create_search_provider;
use localnews::news::NewsService;
use localnews::query::QueryOptions;
use localnews::server::launch_rocket;

#[derive(Parser, Debug)]
#[command(name = "localnews", about = "Local news search API by geolocation")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = load_config(args.config).await?;

    let resolver: Arc<dyn PlaceResolver> = Arc::new(
        NominatimResolver::new(&config.geocoding).context("failed to initialize place resolver")?,
    );
    let provider = match create_search_provider(&config.search) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to initialize search provider: {:#}", e);
            return Err(e);
        }
    };
    info!("Search provider initialized: {}", provider.model());

    let news = Arc::new(NewsService::new(resolver, provider, QueryOptions::from_config(&config.search)));

    launch_rocket(&config, news).await?;
    info!("Shutdown complete");
    Ok(())
}

/// Resolve config paths: `config.default.toml` as the base, then `--config` or `config.toml`.
async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    .inspect_err(|e| error!(%e, "failed to load configuration"))?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}
