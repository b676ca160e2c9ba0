//! One-shot local news search from the command line. Prints the response envelope as JSON.

use anyhow::Context;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use localnews::geocoding::NominatimResolver;
use localnews::llm::create_search_provider;
use localnews::models::LocationRequest;
use localnews::news::NewsService;
use localnews::query::QueryOptions;

#[derive(Parser, Debug)]
#[command(name = "search_news", about = "Run a single local news search and print the result")]
struct Args {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Search radius in kilometers
    #[arg(long, default_value_t = 10.0)]
    radius: f64,

    #[arg(long)]
    max_results: Option<i64>,

    /// 24h, 48h or 7d
    #[arg(long)]
    time_range: Option<String>,

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

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    let resolver = NominatimResolver::new(&config.geocoding)?;
    let provider = create_search_provider(&config.search)?;
    let news = NewsService::new(Arc::new(resolver), provider, QueryOptions::from_config(&config.search));

    let request = LocationRequest {
        latitude: args.lat,
        longitude: args.lon,
        radius: args.radius,
        max_results: args.max_results,
        time_range: args.time_range,
    };

    let response = news.search(&request).await?;
    let json = serde_json::to_string_pretty(&response).context("failed to serialize response")?;
    println!("{}", json);
    Ok(())
}
