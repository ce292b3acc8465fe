//! ronin-cache - cached lookups against search, events, and weather APIs
//!
//! Prints each payload as JSON on stdout. When no data is available it
//! prints `null` and exits with status 1. Logs go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use ronin_cache::cache::{BackendMode, CacheFacade};
use ronin_cache::cli::{CacheCommand, Cli, Command};
use ronin_cache::data::{
    default_http_client, CachedFetcher, EventsClient, EventsQuery, SearchClient, SearchRequest,
    WeatherClient,
};
use ronin_cache::settings::Settings;

/// Runs one subcommand and returns the value to print
async fn run(
    command: Command,
    settings: &Settings,
    fetcher: &CachedFetcher,
    http: &reqwest::Client,
) -> Option<Value> {
    match command {
        Command::Weather { lat, lon, days } => {
            WeatherClient::new(fetcher.clone(), settings.openweather_api_key.clone())
                .with_client(http.clone())
                .with_base_url(&settings.weather_base_url)
                .forecast(lat, lon, days)
                .await
        }
        Command::Events {
            location,
            start,
            end,
            categories,
        } => {
            let query = EventsQuery::new(location, start, end).with_categories(categories);
            EventsClient::new(fetcher.clone(), settings.predicthq_access_token.clone())
                .with_client(http.clone())
                .with_base_url(&settings.events_base_url)
                .events(&query)
                .await
        }
        Command::Search {
            query,
            max_results,
            include_domains,
            exclude_domains,
        } => {
            let request = SearchRequest::new(query)
                .with_max_results(max_results)
                .including(include_domains)
                .excluding(exclude_domains);
            SearchClient::new(fetcher.clone(), settings.tavily_api_key.clone())
                .with_client(http.clone())
                .with_base_url(&settings.search_base_url)
                .search(&request)
                .await
        }
        Command::Cache(command) => run_cache(command, fetcher.cache()).await,
    }
}

async fn run_cache(command: CacheCommand, cache: &CacheFacade) -> Option<Value> {
    match command {
        CacheCommand::Get { key } => cache.get::<Value>(&key).await,
        CacheCommand::Set { key, value, ttl } => {
            let stored = cache
                .set(&key, &value, std::time::Duration::from_secs(ttl))
                .await;
            stored.then_some(Value::Bool(true))
        }
        CacheCommand::Delete { key } => cache.delete(&key).await.then_some(Value::Bool(true)),
        CacheCommand::Status => {
            let mode = match cache.ensure_initialized().await {
                BackendMode::Remote => "remote",
                BackendMode::Local => "local",
                BackendMode::Uninitialized => "uninitialized",
            };
            Some(serde_json::json!({ "backend": mode }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let cache = Arc::new(CacheFacade::new(settings.cache_config()));
    let fetcher = CachedFetcher::new(Arc::clone(&cache));
    let http = default_http_client();

    let result = run(cli.command, &settings, &fetcher, &http).await;
    cache.close();

    match result {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("null");
            Ok(ExitCode::FAILURE)
        }
    }
}
